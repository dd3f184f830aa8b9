//! Resolution scope: which branch, which architectures, which package kinds.

use crate::arch::Arch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which side of a source package contributes requirements.
///
/// `Source` follows the source package's own build requirements, `Binary`
/// follows the requirements of the binaries it builds, `Both` follows both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Build requirements of source packages.
    Source,
    /// Run-time requirements of binary packages.
    Binary,
    /// Both of the above (default).
    #[default]
    Both,
}

impl DependencyType {
    /// Whether source packages contribute requirements.
    pub fn includes_source(self) -> bool {
        matches!(self, Self::Source | Self::Both)
    }

    /// Whether binary packages contribute requirements.
    pub fn includes_binary(self) -> bool {
        matches!(self, Self::Binary | Self::Both)
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Binary => "binary",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" | "src" => Ok(Self::Source),
            "binary" | "bin" => Ok(Self::Binary),
            "both" => Ok(Self::Both),
            _ => Err(format!("Unknown dependency type: {s}")),
        }
    }
}

/// An immutable view of the package universe for one resolution.
///
/// The architecture set always contains [`Arch::Noarch`] and never
/// [`Arch::Src`]; source packages are visible regardless of architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    branch: String,
    archs: BTreeSet<Arch>,
    package_type: DependencyType,
}

impl Scope {
    /// Build a scope. `noarch` is added when missing; `src` is dropped.
    pub fn new(
        branch: impl Into<String>,
        archs: impl IntoIterator<Item = Arch>,
        package_type: DependencyType,
    ) -> Self {
        let mut archs: BTreeSet<Arch> = archs.into_iter().filter(Arch::is_binary).collect();
        archs.insert(Arch::Noarch);
        Self {
            branch: branch.into(),
            archs,
            package_type,
        }
    }

    /// Branch (package set) name.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Binary architectures visible in this scope.
    pub fn archs(&self) -> &BTreeSet<Arch> {
        &self.archs
    }

    /// Which package kinds contribute requirements.
    pub fn package_type(&self) -> DependencyType {
        self.package_type
    }

    /// Whether a package built for `arch` is visible in this scope.
    pub fn admits(&self, arch: Arch) -> bool {
        arch == Arch::Src || self.archs.contains(&arch)
    }

    /// Same branch and architectures, following `package_type` instead.
    #[must_use]
    pub fn with_package_type(&self, package_type: DependencyType) -> Self {
        Self {
            branch: self.branch.clone(),
            archs: self.archs.clone(),
            package_type,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let archs: Vec<&str> = self.archs.iter().map(Arch::as_str).collect();
        write!(
            f,
            "{} [{}] ({})",
            self.branch,
            archs.join(","),
            self.package_type
        )
    }
}
