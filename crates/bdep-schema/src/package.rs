use crate::arch::Arch;
use crate::types::{DependencyName, PackageHash, PackageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single package build as recorded in the repository.
///
/// Source and binary packages share this record. A binary points back at the
/// source it was built from through `source_rpm`, which holds the source
/// archive's filename; for a source package the field is its own filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Repository-wide identity.
    pub hash: PackageHash,
    /// Package name (e.g. `glibc-core`).
    pub name: PackageName,
    /// Upstream version.
    pub version: String,
    /// Distribution release (e.g. `alt1`).
    pub release: String,
    /// RPM epoch.
    #[serde(default)]
    pub epoch: u32,
    /// RPM serial.
    #[serde(default)]
    pub serial: u32,
    /// Build architecture; [`Arch::Src`] for source packages.
    pub arch: Arch,
    /// Whether this is a source package.
    pub is_source: bool,
    /// Filename of the source archive (`name-version-release.src.rpm`).
    pub source_rpm: String,
    /// When the package was built.
    pub build_time: DateTime<Utc>,
}

impl Package {
    /// `[epoch:]version-release` as shown to users.
    pub fn evr(&self) -> String {
        if self.epoch == 0 {
            format!("{}-{}", self.version, self.release)
        } else {
            format!("{}:{}-{}", self.epoch, self.version, self.release)
        }
    }

    /// Whether a binary with this name carries debug symbols only.
    pub fn is_debuginfo(&self) -> bool {
        !self.is_source && self.name.ends_with("-debuginfo")
    }
}

/// Kind of a dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// The subject needs something providing `name`.
    Require,
    /// The subject satisfies requirements on `name`.
    Provide,
    /// The subject cannot be installed alongside `name`.
    Conflict,
    /// The subject replaces `name`.
    Obsolete,
}

impl DependencyKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::Provide => "provide",
            Self::Conflict => "conflict",
            Self::Obsolete => "obsolete",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One dependency fact: `subject` requires/provides/conflicts with/obsoletes
/// `name`, optionally constrained by version.
///
/// Version constraints are carried for display only. The engine computes
/// reachability over names and never solves versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The package the relation belongs to.
    pub subject: PackageHash,
    /// Dependency name.
    pub name: DependencyName,
    /// Version constraint text, empty when unversioned.
    #[serde(default)]
    pub version: String,
    /// RPM sense flag bits.
    #[serde(default)]
    pub flags: u32,
    /// Relation kind.
    pub kind: DependencyKind,
}
