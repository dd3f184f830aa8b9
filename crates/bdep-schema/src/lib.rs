//! Shared data model for the bdep build-dependency engine.
//!
//! A distribution's package universe is a set of source packages, each
//! producing binary packages for one or more architectures, connected by
//! `require`/`provide`/`conflict`/`obsolete` relations. Everything here is
//! plain data: immutable once loaded and owned by a single resolution.

/// Architecture names.
pub mod arch;
/// Package records and dependency facts.
pub mod package;
pub mod scope;
/// Name newtypes.
pub mod types;

// Re-exports
pub use arch::*;
pub use package::{DependencyEdge, DependencyKind, Package};
pub use scope::{DependencyType, Scope};
pub use types::*;
