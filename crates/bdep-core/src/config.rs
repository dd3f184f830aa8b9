//! Engine configuration.
//!
//! Loaded from `config.toml` in the bdep home directory. Every field has a
//! default, so an empty or missing file yields a working configuration.
//!
//! ```toml
//! max_depth = 5
//! accessor_timeout_secs = 120
//! fallback_archs = ["noarch", "x86_64"]
//!
//! [default_archs]
//! sisyphus_riscv64 = ["noarch", "riscv64"]
//! ```

use crate::error::ValidationError;
use bdep_schema::{Arch, DependencyType, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`EngineConfig`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables shared by every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted `depth` for depth-bounded expansion.
    pub max_depth: u32,
    /// Per-call deadline for accessor round trips when the caller sets none.
    pub accessor_timeout_secs: u64,
    /// Architectures used for a branch when the caller names none.
    pub default_archs: BTreeMap<String, Vec<Arch>>,
    /// Architectures used for branches missing from `default_archs`.
    pub fallback_archs: Vec<Arch>,
    /// Hide `*-debuginfo` binaries from the in-memory universe.
    pub skip_debuginfo: bool,
    /// Concurrent ACL lookups while decorating results.
    pub acl_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let e2k = vec![Arch::Noarch, Arch::E2k, Arch::E2kv4, Arch::E2kv5, Arch::E2kv6];
        let default_archs = BTreeMap::from([
            ("sisyphus_riscv64".to_string(), vec![Arch::Noarch, Arch::Riscv64]),
            ("sisyphus_mipsel".to_string(), vec![Arch::Noarch, Arch::Mipsel]),
            ("p9_mipsel".to_string(), vec![Arch::Noarch, Arch::Mipsel]),
            ("sisyphus_e2k".to_string(), e2k.clone()),
            ("p10_e2k".to_string(), e2k.clone()),
            ("p9_e2k".to_string(), e2k),
            (
                "sisyphus_loongarch64".to_string(),
                vec![Arch::Noarch, Arch::Loongarch64],
            ),
        ]);

        Self {
            max_depth: 5,
            accessor_timeout_secs: 120,
            default_archs,
            fallback_archs: vec![Arch::Noarch, Arch::X86_64],
            skip_debuginfo: true,
            acl_concurrency: 8,
        }
    }
}

impl EngineConfig {
    /// Asynchronously load and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is not valid TOML.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `config.toml` from the bdep home directory, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub async fn load_or_default() -> Result<Self, ConfigError> {
        match crate::paths::config_path() {
            Some(path) if path.exists() => Self::load(&path).await,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Per-call accessor deadline.
    pub fn accessor_timeout(&self) -> Duration {
        Duration::from_secs(self.accessor_timeout_secs)
    }

    /// Check a requested depth against `1..=max_depth`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DepthOutOfRange`] when outside the range.
    pub fn check_depth(&self, depth: u32) -> Result<(), ValidationError> {
        if depth < 1 || depth > self.max_depth {
            return Err(ValidationError::DepthOutOfRange {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Architectures for `branch` when the caller gives none.
    pub fn archs_for(&self, branch: &str) -> &[Arch] {
        self.default_archs
            .get(branch)
            .map_or(self.fallback_archs.as_slice(), Vec::as_slice)
    }

    /// Turn caller-supplied scope parameters into a [`Scope`].
    ///
    /// The branch is lower-cased, architecture names are parsed, an empty
    /// list falls back to the branch defaults and `noarch` is always added.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownArch`] for names that do not parse
    /// and [`ValidationError::SourceArch`] for `src`.
    pub fn resolve_scope(
        &self,
        branch: &str,
        archs: &[String],
        package_type: DependencyType,
    ) -> Result<Scope, ValidationError> {
        let branch = branch.trim().to_lowercase();
        if branch.is_empty() {
            return Err(ValidationError::UnknownBranch(branch));
        }

        let mut parsed = Vec::with_capacity(archs.len());
        for name in archs {
            let arch: Arch = name
                .parse()
                .map_err(|_| ValidationError::UnknownArch(name.clone()))?;
            if !arch.is_binary() {
                return Err(ValidationError::SourceArch(name.clone()));
            }
            parsed.push(arch);
        }

        if parsed.is_empty() {
            parsed.extend_from_slice(self.archs_for(&branch));
        }

        Ok(Scope::new(branch, parsed, package_type))
    }
}
