//! The data-plane boundary of the engine.
//!
//! The engine never touches storage directly. Everything it knows about the
//! package universe comes through [`UniverseAccessor`], whose calls are
//! batched (sets in, maps out) so one expansion level costs one round trip
//! per operation regardless of how many packages are on the frontier.

use crate::error::UniverseError;
use async_trait::async_trait;
use bdep_schema::{Arch, DependencyName, Package, PackageName, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod memory;

pub use memory::{BranchSnapshot, InMemoryUniverse, UniverseBuilder, UniverseSnapshot};

/// Requirements keyed by the name they were requested for.
pub type RequirementMap = BTreeMap<PackageName, BTreeSet<DependencyName>>;

/// Providers keyed by the dependency name they satisfy.
pub type ProviderMap = BTreeMap<DependencyName, BTreeSet<PackageName>>;

/// How [`UniverseAccessor::requirements_of`] reads the names it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// A source package: its own build requirements and those of the
    /// binaries built from it.
    Source,
    /// Binaries carrying exactly this name.
    Binary,
    /// Either of the above, for caller-supplied names of unknown kind.
    Any,
}

impl NameKind {
    /// Whether names are looked up as source packages.
    pub fn covers_source(self) -> bool {
        matches!(self, Self::Source | Self::Any)
    }

    /// Whether names are looked up as binaries.
    pub fn covers_binary(self) -> bool {
        matches!(self, Self::Binary | Self::Any)
    }
}

/// Metadata for one resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// The package record (the source package when describing sources).
    pub package: Package,
    /// Architectures of the binaries behind this name within the scope.
    pub archs: BTreeSet<Arch>,
}

/// Read-only, scope-bound access to package and dependency facts.
///
/// Implementations must present a stable snapshot for the duration of one
/// resolution; the engine's termination guarantees rely on it.
#[async_trait]
pub trait UniverseAccessor: Send + Sync {
    /// Verify that the branch exists and every scope architecture is known.
    ///
    /// Returning [`UniverseError::UnknownBranch`] or
    /// [`UniverseError::UnknownArch`] aborts a resolution as a validation
    /// error before any graph work.
    ///
    /// # Errors
    ///
    /// Returns the scope problem, or any failure reaching the data.
    async fn check_scope(&self, scope: &Scope) -> Result<(), UniverseError>;

    /// `require` edges for the named packages, read as `kind` says.
    ///
    /// Source requirements count when the scope includes sources, binary
    /// requirements when it includes binaries. Only binaries of scope
    /// architectures count.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError`] if the data cannot be read.
    async fn requirements_of(
        &self,
        names: &BTreeSet<PackageName>,
        kind: NameKind,
        scope: &Scope,
    ) -> Result<RequirementMap, UniverseError>;

    /// Packages satisfying each dependency name within the scope.
    ///
    /// Providers are binary packages; with `wants_source` they are reported
    /// as the source packages that built them. Names with no provider are
    /// absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError`] if the data cannot be read.
    async fn providers_of(
        &self,
        dependencies: &BTreeSet<DependencyName>,
        scope: &Scope,
        wants_source: bool,
    ) -> Result<ProviderMap, UniverseError>;

    /// Binary package names built from the given sources within the scope.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError`] if the data cannot be read.
    async fn binaries_of(
        &self,
        sources: &BTreeSet<PackageName>,
        scope: &Scope,
    ) -> Result<BTreeSet<PackageName>, UniverseError>;

    /// Output metadata for each name, looked up as a source package when
    /// `as_source` is set and as a binary otherwise. Unknown names are
    /// absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError`] if the data cannot be read.
    async fn describe(
        &self,
        names: &BTreeSet<PackageName>,
        scope: &Scope,
        as_source: bool,
    ) -> Result<BTreeMap<PackageName, PackageInfo>, UniverseError>;
}

/// Access control lists used to decorate results.
#[async_trait]
pub trait AclAnnotator: Send + Sync {
    /// Members allowed to build `name` in `branch`. Empty when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError`] if the ACL store cannot be read.
    async fn acl_of(&self, name: &PackageName, branch: &str) -> Result<Vec<String>, UniverseError>;
}

#[async_trait]
impl<T: UniverseAccessor + ?Sized> UniverseAccessor for std::sync::Arc<T> {
    async fn check_scope(&self, scope: &Scope) -> Result<(), UniverseError> {
        (**self).check_scope(scope).await
    }

    async fn requirements_of(
        &self,
        names: &BTreeSet<PackageName>,
        kind: NameKind,
        scope: &Scope,
    ) -> Result<RequirementMap, UniverseError> {
        (**self).requirements_of(names, kind, scope).await
    }

    async fn providers_of(
        &self,
        dependencies: &BTreeSet<DependencyName>,
        scope: &Scope,
        wants_source: bool,
    ) -> Result<ProviderMap, UniverseError> {
        (**self).providers_of(dependencies, scope, wants_source).await
    }

    async fn binaries_of(
        &self,
        sources: &BTreeSet<PackageName>,
        scope: &Scope,
    ) -> Result<BTreeSet<PackageName>, UniverseError> {
        (**self).binaries_of(sources, scope).await
    }

    async fn describe(
        &self,
        names: &BTreeSet<PackageName>,
        scope: &Scope,
        as_source: bool,
    ) -> Result<BTreeMap<PackageName, PackageInfo>, UniverseError> {
        (**self).describe(names, scope, as_source).await
    }
}

/// Flatten a [`ProviderMap`] into the set of providing packages.
pub fn all_providers(map: &ProviderMap) -> BTreeSet<PackageName> {
    map.values().flatten().cloned().collect()
}

/// Flatten a [`RequirementMap`] into the set of required names.
pub fn all_requirements(map: &RequirementMap) -> BTreeSet<DependencyName> {
    map.values().flatten().cloned().collect()
}
