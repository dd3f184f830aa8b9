//! One resolution's view of the universe: a fixed scope plus a deadline.

use crate::error::{ResolveError, Result, UniverseError};
use crate::universe::{
    AclAnnotator, NameKind, PackageInfo, ProviderMap, RequirementMap, UniverseAccessor,
};
use bdep_schema::{DependencyName, PackageName, Scope};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// When accessor calls must give up.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    /// Every call gets the same allowance.
    PerCall(Duration),
    /// All calls share one budget ending at a fixed instant.
    At {
        /// End of the budget.
        at: Instant,
        /// The whole budget, for reporting.
        budget: Duration,
    },
}

impl Deadline {
    /// A caller-supplied budget for the whole resolution, or the per-call
    /// default.
    pub(crate) fn new(budget: Option<Duration>, per_call: Duration) -> Self {
        match budget {
            Some(budget) => Self::At {
                at: Instant::now() + budget,
                budget,
            },
            None => Self::PerCall(per_call),
        }
    }

    fn limit(self) -> Duration {
        match self {
            Self::PerCall(d) | Self::At { budget: d, .. } => d,
        }
    }
}

/// Scope-bound accessor calls with deadline handling and logging.
///
/// Empty inputs short-circuit without a round trip.
#[derive(Clone, Copy)]
pub(crate) struct Session<'a> {
    universe: &'a dyn UniverseAccessor,
    scope: &'a Scope,
    deadline: Deadline,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scope", &self.scope)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        universe: &'a dyn UniverseAccessor,
        scope: &'a Scope,
        deadline: Deadline,
    ) -> Self {
        Self {
            universe,
            scope,
            deadline,
        }
    }

    pub(crate) fn scope(&self) -> &'a Scope {
        self.scope
    }

    /// Same accessor and deadline over another scope.
    pub(crate) fn with_scope<'b>(&self, scope: &'b Scope) -> Session<'b>
    where
        'a: 'b,
    {
        Session {
            universe: self.universe,
            scope,
            deadline: self.deadline,
        }
    }

    async fn call<T, F>(&self, op: &'static str, fut: F) -> std::result::Result<T, CallError>
    where
        F: Future<Output = std::result::Result<T, UniverseError>>,
    {
        let started = Instant::now();
        let outcome = match self.deadline {
            Deadline::PerCall(limit) => tokio::time::timeout(limit, fut).await,
            Deadline::At { at, .. } => tokio::time::timeout_at(at, fut).await,
        };
        match outcome {
            Ok(result) => {
                tracing::debug!("{} in {} took {:?}", op, self.scope, started.elapsed());
                result.map_err(CallError::Universe)
            }
            Err(_) => {
                tracing::warn!("{} in {} timed out", op, self.scope);
                Err(CallError::Timeout(self.deadline.limit()))
            }
        }
    }

    /// Reject an unknown branch or architecture before any graph work.
    pub(crate) async fn check_scope(&self) -> Result<()> {
        self.call("check_scope", self.universe.check_scope(self.scope))
            .await
            .map_err(CallError::into_scope_error)
    }

    pub(crate) async fn requirements_of(
        &self,
        names: &BTreeSet<PackageName>,
        kind: NameKind,
    ) -> Result<RequirementMap> {
        if names.is_empty() {
            return Ok(RequirementMap::new());
        }
        tracing::trace!("requirements_of {} names ({:?})", names.len(), kind);
        Ok(self
            .call(
                "requirements_of",
                self.universe.requirements_of(names, kind, self.scope),
            )
            .await?)
    }

    pub(crate) async fn providers_of(
        &self,
        dependencies: &BTreeSet<DependencyName>,
        wants_source: bool,
    ) -> Result<ProviderMap> {
        if dependencies.is_empty() {
            return Ok(ProviderMap::new());
        }
        tracing::trace!("providers_of {} names", dependencies.len());
        Ok(self
            .call(
                "providers_of",
                self.universe
                    .providers_of(dependencies, self.scope, wants_source),
            )
            .await?)
    }

    pub(crate) async fn binaries_of(
        &self,
        sources: &BTreeSet<PackageName>,
    ) -> Result<BTreeSet<PackageName>> {
        if sources.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .call("binaries_of", self.universe.binaries_of(sources, self.scope))
            .await?)
    }

    pub(crate) async fn describe(
        &self,
        names: &BTreeSet<PackageName>,
        as_source: bool,
    ) -> Result<BTreeMap<PackageName, PackageInfo>> {
        if names.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(self
            .call(
                "describe",
                self.universe.describe(names, self.scope, as_source),
            )
            .await?)
    }

    pub(crate) async fn acl_of(
        &self,
        annotator: &dyn AclAnnotator,
        name: &PackageName,
    ) -> Result<Vec<String>> {
        Ok(self
            .call("acl_of", annotator.acl_of(name, self.scope.branch()))
            .await?)
    }
}

/// Failure of a single accessor call.
#[derive(Debug)]
enum CallError {
    Universe(UniverseError),
    Timeout(Duration),
}

impl CallError {
    /// The scope check is the one place where accessor errors are the
    /// caller's fault.
    fn into_scope_error(self) -> ResolveError {
        match self {
            Self::Universe(err) => ResolveError::from(err),
            Self::Timeout(limit) => ResolveError::Timeout(limit),
        }
    }
}

impl From<CallError> for ResolveError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Universe(err) => ResolveError::Universe(err),
            CallError::Timeout(limit) => ResolveError::Timeout(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::UniverseBuilder;
    use async_trait::async_trait;
    use bdep_schema::{Arch, DependencyType};

    struct Stalled;

    #[async_trait]
    impl UniverseAccessor for Stalled {
        async fn check_scope(&self, _: &Scope) -> std::result::Result<(), UniverseError> {
            Ok(())
        }

        async fn requirements_of(
            &self,
            _: &BTreeSet<PackageName>,
            _: NameKind,
            _: &Scope,
        ) -> std::result::Result<RequirementMap, UniverseError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RequirementMap::new())
        }

        async fn providers_of(
            &self,
            _: &BTreeSet<DependencyName>,
            _: &Scope,
            _: bool,
        ) -> std::result::Result<ProviderMap, UniverseError> {
            Err(UniverseError::UnknownBranch("gone".into()))
        }

        async fn binaries_of(
            &self,
            _: &BTreeSet<PackageName>,
            _: &Scope,
        ) -> std::result::Result<BTreeSet<PackageName>, UniverseError> {
            Ok(BTreeSet::new())
        }

        async fn describe(
            &self,
            _: &BTreeSet<PackageName>,
            _: &Scope,
            _: bool,
        ) -> std::result::Result<BTreeMap<PackageName, PackageInfo>, UniverseError> {
            Ok(BTreeMap::new())
        }
    }

    fn names(items: &[&str]) -> BTreeSet<PackageName> {
        items.iter().map(|s| PackageName::new(s)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let session = Session::new(
            &Stalled,
            &scope,
            Deadline::new(Some(Duration::from_secs(5)), Duration::from_secs(120)),
        );
        let err = session.requirements_of(&names(&["a"]), NameKind::Source).await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn empty_inputs_skip_the_accessor() {
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let session = Session::new(&Stalled, &scope, Deadline::PerCall(Duration::from_millis(1)));
        assert!(session.requirements_of(&BTreeSet::new(), NameKind::Any).await.unwrap().is_empty());
        assert!(session.providers_of(&BTreeSet::new(), true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mid_resolution_errors_stay_infrastructure() {
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let session = Session::new(&Stalled, &scope, Deadline::PerCall(Duration::from_secs(1)));
        let deps = [DependencyName::new("x")].into_iter().collect();
        let err = session.providers_of(&deps, true).await.unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn scope_check_errors_are_validation() {
        let universe = UniverseBuilder::new("p11").package("a", &[]).build();
        let scope = Scope::new("p10", [Arch::X86_64], DependencyType::Both);
        let session = Session::new(&universe, &scope, Deadline::PerCall(Duration::from_secs(1)));
        assert!(session.check_scope().await.unwrap_err().is_validation());
    }
}
