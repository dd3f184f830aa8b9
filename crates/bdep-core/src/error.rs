//! Error taxonomy for a resolution.
//!
//! Three outcomes are kept apart: caller mistakes ([`ValidationError`]),
//! infrastructure trouble in the universe accessor ([`UniverseError`] and
//! timeouts), and the empty result, which is not an error at all.

use bdep_schema::PackageName;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`UniverseAccessor`](crate::universe::UniverseAccessor)
/// or [`AclAnnotator`](crate::universe::AclAnnotator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UniverseError {
    /// The branch is not known to the accessor.
    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    /// The architecture has no packages in the branch.
    #[error("Architecture {arch} is not available in branch {branch}")]
    UnknownArch {
        /// Branch that was queried.
        branch: String,
        /// Offending architecture.
        arch: String,
    },

    /// The backing store could not be reached.
    #[error("Universe unavailable: {0}")]
    Unavailable(String),

    /// The backing store returned data that breaks the accessor contract.
    #[error("Malformed universe data: {0}")]
    Malformed(String),
}

/// Caller-fixable problems, reported before any graph work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No seed packages were given.
    #[error("At least one package is required")]
    NoSeeds,

    /// The branch is not known.
    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    /// An architecture name could not be parsed or is absent from the branch.
    #[error("Unknown architecture: {0}")]
    UnknownArch(String),

    /// `src` was passed where binary architectures are expected.
    #[error("Source pseudo-architecture '{0}' is not allowed in an architecture list")]
    SourceArch(String),

    /// Requested depth is outside `1..=max`.
    #[error("Dependency depth should be in range (1...{max}), got {depth}")]
    DepthOutOfRange {
        /// Requested depth.
        depth: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Both `filter_by_package` and `filter_by_source` were supplied.
    #[error("Parameters 'filter_by_source' and 'filter_by_package' can't be used together")]
    ConflictingRequirementFilters,

    /// The leaf package is not part of the resolved closure.
    #[error("Package {leaf} is not in the dependency closure")]
    LeafNotInClosure {
        /// Requested leaf.
        leaf: PackageName,
    },
}

/// Error returned by the resolver entry points.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The request itself is invalid.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The universe accessor failed.
    #[error("Universe accessor failed: {0}")]
    Universe(#[source] UniverseError),

    /// An accessor call did not finish before the deadline.
    #[error("Universe accessor timed out after {0:?}")]
    Timeout(Duration),
}

impl ResolveError {
    /// Whether the caller can fix the request and retry.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the failure came from the data plane rather than the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Universe(_) | Self::Timeout(_))
    }
}

impl From<UniverseError> for ResolveError {
    fn from(err: UniverseError) -> Self {
        match err {
            UniverseError::UnknownBranch(branch) => {
                Self::Validation(ValidationError::UnknownBranch(branch))
            }
            UniverseError::UnknownArch { arch, .. } => {
                Self::Validation(ValidationError::UnknownArch(arch))
            }
            other => Self::Universe(other),
        }
    }
}

/// Result alias for resolver operations.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_errors_from_accessor_are_validation() {
        let err = ResolveError::from(UniverseError::UnknownBranch("p42".into()));
        assert!(err.is_validation());
        assert!(!err.is_infrastructure());

        let err = ResolveError::from(UniverseError::UnknownArch {
            branch: "p11".into(),
            arch: "mipsel".into(),
        });
        assert!(matches!(
            err,
            ResolveError::Validation(ValidationError::UnknownArch(ref a)) if a == "mipsel"
        ));
    }

    #[test]
    fn data_plane_errors_are_infrastructure() {
        let err = ResolveError::from(UniverseError::Unavailable("connection refused".into()));
        assert!(err.is_infrastructure());
        assert!(ResolveError::Timeout(Duration::from_secs(1)).is_infrastructure());
    }

    #[test]
    fn depth_message_names_the_range() {
        let err = ValidationError::DepthOutOfRange { depth: 9, max: 5 };
        assert_eq!(
            err.to_string(),
            "Dependency depth should be in range (1...5), got 9"
        );
    }
}
