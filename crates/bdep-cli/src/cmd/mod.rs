//! Command implementations

pub mod build;
pub mod completions;
pub mod full;
pub mod output;

use anyhow::{Context as _, Result};
use bdep_core::universe::{InMemoryUniverse, UniverseSnapshot};
use bdep_core::{EngineConfig, paths};
use std::path::Path;

/// What every resolving command needs: a universe and the engine settings.
#[derive(Debug)]
pub struct Context {
    pub universe: InMemoryUniverse,
    pub config: EngineConfig,
}

impl Context {
    /// Load the configuration, then the snapshot it applies to.
    pub async fn load(universe: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let config = match config {
            Some(path) => EngineConfig::load(path).await?,
            None => EngineConfig::load_or_default().await?,
        };

        let path = match universe {
            Some(path) => path.to_path_buf(),
            None => paths::universe_path()
                .context("Could not determine home directory; pass --universe")?,
        };
        let snapshot = UniverseSnapshot::load(&path)
            .await
            .with_context(|| format!("Failed to load universe from {}", path.display()))?;
        let universe = InMemoryUniverse::new(snapshot, config.skip_debuginfo)
            .with_context(|| format!("Invalid universe snapshot {}", path.display()))?;

        tracing::debug!("Loaded universe from {}", path.display());
        Ok(Self { universe, config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdep_core::universe::UniverseBuilder;
    use std::io::Write;

    #[tokio::test]
    async fn loads_snapshot_and_config() {
        let snapshot = UniverseBuilder::new("p11")
            .package("bash", &["gcc"])
            .package("gcc", &[])
            .snapshot();
        let mut universe = tempfile::NamedTempFile::new().unwrap();
        write!(universe, "{}", serde_json::to_string(&snapshot).unwrap()).unwrap();
        let mut config = tempfile::NamedTempFile::new().unwrap();
        writeln!(config, "max_depth = 3").unwrap();

        let ctx = Context::load(Some(universe.path()), Some(config.path()))
            .await
            .unwrap();
        assert_eq!(ctx.config.max_depth, 3);
        assert_eq!(ctx.universe.branches().collect::<Vec<_>>(), ["p11"]);
    }

    #[tokio::test]
    async fn missing_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Context::load(Some(&dir.path().join("nope.json")), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load universe"));
    }
}
