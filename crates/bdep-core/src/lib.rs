//! Build-dependency closure and ordering engine.
//!
//! Given seed packages and a branch/architecture scope, the engine computes
//! what must exist to build them, groups dependency cycles, orders the
//! result so requirements come first, and offers filtered views of it.
//! Package facts come from a [`UniverseAccessor`].
//!
//! ```no_run
//! use bdep_core::{BuildClosureRequest, EngineConfig, Resolver};
//! use bdep_core::universe::UniverseBuilder;
//!
//! # async fn run() -> bdep_core::Result<()> {
//! let universe = UniverseBuilder::new("sisyphus")
//!     .package("python3", &["gcc"])
//!     .package("gcc", &[])
//!     .build();
//! let config = EngineConfig::default();
//!
//! let mut request = BuildClosureRequest::new(["python3"], "sisyphus");
//! request.depth = 2;
//! let result = Resolver::new(&universe, &config)
//!     .resolve_build_closure(&request)
//!     .await?;
//! assert_eq!(result.names(), ["gcc"]);
//! # Ok(())
//! # }
//! ```

pub mod closure;
pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
/// Locations of the bdep home directory and its files.
pub mod paths;
mod reachability;
pub mod resolver;
mod session;
pub mod universe;

pub use closure::Closure;
pub use config::{ConfigError, EngineConfig};
pub use error::{ResolveError, Result, UniverseError, ValidationError};
pub use filter::{FilterRequest, Filters, RequirementFilter};
pub use graph::{DependencyGraph, SortedGraph};
pub use resolver::{
    BuildClosureRequest, FullClosureRequest, ResolutionResult, ResolvedPackage, Resolver,
    ScopeRequest,
};
pub use universe::{AclAnnotator, InMemoryUniverse, NameKind, PackageInfo, UniverseAccessor};
