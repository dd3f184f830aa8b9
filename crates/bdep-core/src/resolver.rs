//! Resolution entry points.
//!
//! Both entry points run the same pipeline:
//!
//! 1. validate the request (no accessor calls yet),
//! 2. check the scope with the accessor,
//! 3. expand the closure (depth-bounded or to a fixed point),
//! 4. build the dependency graph, collapse cycles and sort,
//! 5. apply the enabled filters,
//! 6. describe the surviving packages and decorate them with ACLs.
//!
//! Seeds take part in the graph but are not emitted.

use crate::closure::{self, Closure};
use crate::config::EngineConfig;
use crate::error::{ResolveError, Result, UniverseError, ValidationError};
use crate::filter::{self, FilterRequest, Filters};
use crate::graph::{DependencyGraph, SortedGraph};
use crate::reachability;
use crate::session::{Deadline, Session};
use crate::universe::{AclAnnotator, NameKind, UniverseAccessor};
use bdep_schema::{Arch, DependencyType, PackageName, Scope};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Caller-supplied scope parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeRequest {
    /// Branch name, matched case-insensitively.
    pub branch: String,
    /// Architecture names; empty means the branch defaults.
    pub archs: Vec<String>,
    /// Which package kinds contribute requirements.
    pub dependency_type: DependencyType,
}

/// Parameters of [`Resolver::resolve_build_closure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildClosureRequest {
    /// Source packages to build.
    pub seeds: Vec<String>,
    /// Where to look.
    pub scope: ScopeRequest,
    /// Number of levels, the seeds being level 1.
    pub depth: u32,
    /// Run to depth 3 and keep only the third-level sources that provide
    /// build requirements of second-level sources; `depth` is ignored.
    pub half_step: bool,
    /// Time budget for the whole resolution.
    pub deadline: Option<Duration>,
    /// Views applied after sorting.
    pub filters: FilterRequest,
}

impl BuildClosureRequest {
    /// A depth-1 request over the branch defaults.
    pub fn new<S: Into<String>>(seeds: impl IntoIterator<Item = S>, branch: &str) -> Self {
        Self {
            seeds: seeds.into_iter().map(Into::into).collect(),
            scope: ScopeRequest {
                branch: branch.to_string(),
                ..ScopeRequest::default()
            },
            depth: 1,
            half_step: false,
            deadline: None,
            filters: FilterRequest::default(),
        }
    }
}

/// Parameters of [`Resolver::resolve_full_closure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullClosureRequest {
    /// Source or binary packages to start from.
    pub seeds: Vec<String>,
    /// Where to look.
    pub scope: ScopeRequest,
    /// Time budget for the whole resolution.
    pub deadline: Option<Duration>,
    /// Views applied after sorting.
    pub filters: FilterRequest,
}

impl FullClosureRequest {
    /// A request over the branch defaults.
    pub fn new<S: Into<String>>(seeds: impl IntoIterator<Item = S>, branch: &str) -> Self {
        Self {
            seeds: seeds.into_iter().map(Into::into).collect(),
            scope: ScopeRequest {
                branch: branch.to_string(),
                ..ScopeRequest::default()
            },
            deadline: None,
            filters: FilterRequest::default(),
        }
    }
}

/// One package in a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// Package name.
    pub name: PackageName,
    /// Upstream version.
    pub version: String,
    /// Distribution release.
    pub release: String,
    /// RPM epoch.
    pub epoch: u32,
    /// RPM serial.
    pub serial: u32,
    /// Source archive filename.
    pub source_rpm: String,
    /// Branch the package was resolved in.
    pub branch: String,
    /// Architectures of its binaries within the scope.
    pub archs: BTreeSet<Arch>,
    /// When it was built.
    pub build_time: DateTime<Utc>,
    /// Other packages in the same dependency cycle.
    pub cycle: Vec<PackageName>,
    /// Direct requirements within the closure.
    pub requires: Vec<PackageName>,
    /// ACL members, when an annotator is configured.
    pub acl: Vec<String>,
    /// Level at which the package was first reached; seeds are level 1.
    pub depth: u32,
}

/// Ordered output of a resolution, requirements first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Branch the result was computed for.
    pub branch: String,
    /// Packages in build order.
    pub packages: Vec<ResolvedPackage>,
}

impl ResolutionResult {
    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing was resolved. Not an error.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Package names in order.
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    /// The record for `name`.
    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

/// Entry points of the engine.
///
/// A resolver holds no per-request state; any number of resolutions may
/// run through one instance concurrently.
pub struct Resolver<'a> {
    universe: &'a dyn UniverseAccessor,
    config: &'a EngineConfig,
    acl: Option<&'a dyn AclAnnotator>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", self.config)
            .field("acl", &self.acl.is_some())
            .finish_non_exhaustive()
    }
}

/// A validated request, ready to run.
struct Prepared {
    seeds: BTreeSet<PackageName>,
    scope: Scope,
    filters: Filters,
    deadline: Deadline,
}

impl<'a> Resolver<'a> {
    /// A resolver reading from `universe`.
    pub fn new(universe: &'a dyn UniverseAccessor, config: &'a EngineConfig) -> Self {
        Self {
            universe,
            config,
            acl: None,
        }
    }

    /// Decorate results with ACLs from `annotator`.
    pub fn with_acl(mut self, annotator: &'a dyn AclAnnotator) -> Self {
        self.acl = Some(annotator);
        self
    }

    fn prepare(
        &self,
        seeds: &[String],
        scope: &ScopeRequest,
        filters: &FilterRequest,
        deadline: Option<Duration>,
    ) -> std::result::Result<Prepared, ValidationError> {
        let seeds: BTreeSet<PackageName> = seeds
            .iter()
            .map(|s| s.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(PackageName::new)
            .collect();
        if seeds.is_empty() {
            return Err(ValidationError::NoSeeds);
        }
        let filters = filters.validate()?;
        let scope =
            self.config
                .resolve_scope(&scope.branch, &scope.archs, scope.dependency_type)?;

        Ok(Prepared {
            seeds,
            scope,
            filters,
            deadline: Deadline::new(deadline, self.config.accessor_timeout()),
        })
    }

    /// Depth-bounded build closure of source packages.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Validation`] for a bad request, an unknown
    /// scope or a leaf outside the closure, and [`ResolveError::Universe`] or
    /// [`ResolveError::Timeout`] when the accessor fails.
    pub async fn resolve_build_closure(
        &self,
        request: &BuildClosureRequest,
    ) -> Result<ResolutionResult> {
        self.config.check_depth(request.depth)?;
        let prepared = self.prepare(
            &request.seeds,
            &request.scope,
            &request.filters,
            request.deadline,
        )?;
        tracing::info!(
            "Resolving build closure of {} package(s) in {}, {}",
            prepared.seeds.len(),
            prepared.scope,
            if request.half_step {
                "half-step".to_string()
            } else {
                format!("depth {}", request.depth)
            }
        );

        let session = Session::new(self.universe, &prepared.scope, prepared.deadline);
        session.check_scope().await?;

        let closure = closure::expand(
            &session,
            prepared.seeds.clone(),
            request.depth,
            request.half_step,
        )
        .await?;
        self.finish(&session, closure, &prepared.filters, true).await
    }

    /// Everything transitively required by the seeds, however deep.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve_build_closure`], minus the depth check.
    pub async fn resolve_full_closure(
        &self,
        request: &FullClosureRequest,
    ) -> Result<ResolutionResult> {
        let prepared = self.prepare(
            &request.seeds,
            &request.scope,
            &request.filters,
            request.deadline,
        )?;
        tracing::info!(
            "Resolving full closure of {} package(s) in {}",
            prepared.seeds.len(),
            prepared.scope
        );

        let session = Session::new(self.universe, &prepared.scope, prepared.deadline);
        session.check_scope().await?;

        let closure = reachability::expand(&session, prepared.seeds.clone()).await?;
        self.finish(&session, closure, &prepared.filters, false).await
    }

    async fn finish(
        &self,
        session: &Session<'_>,
        mut closure: Closure,
        filters: &Filters,
        as_source: bool,
    ) -> Result<ResolutionResult> {
        let kind = if as_source {
            NameKind::Source
        } else {
            NameKind::Binary
        };
        closure.complete_edges(session, kind, as_source).await?;
        let graph = DependencyGraph::from_closure(&closure);
        let sorted = graph.sort();

        let emitted: BTreeSet<PackageName> = closure.discovered();
        let kept = Self::apply_filters(session, &graph, &sorted, &emitted, filters, kind)
            .await?;

        let order: Vec<&PackageName> = sorted
            .order()
            .iter()
            .filter(|name| kept.contains(*name))
            .collect();
        let mut described = session.describe(&kept, as_source).await?;

        let mut packages = Vec::with_capacity(order.len());
        for name in order {
            let info = described.remove(name).ok_or_else(|| {
                ResolveError::Universe(UniverseError::Malformed(format!(
                    "no package record for {name}"
                )))
            })?;
            let package = info.package;
            packages.push(ResolvedPackage {
                name: name.clone(),
                version: package.version,
                release: package.release,
                epoch: package.epoch,
                serial: package.serial,
                source_rpm: package.source_rpm,
                branch: session.scope().branch().to_string(),
                archs: info.archs,
                build_time: package.build_time,
                cycle: sorted.cycle_members(name).to_vec(),
                requires: graph.requires(name),
                acl: Vec::new(),
                depth: closure.level_of(name).unwrap_or_default(),
            });
        }

        if let Some(annotator) = self.acl {
            self.annotate(session, annotator, &mut packages).await?;
        }

        tracing::info!(
            "Resolved {} package(s) ({} in closure, {} cycle group(s))",
            packages.len(),
            closure.len(),
            sorted.groups().iter().filter(|g| g.len() > 1).count()
        );
        Ok(ResolutionResult {
            branch: session.scope().branch().to_string(),
            packages,
        })
    }

    async fn apply_filters(
        session: &Session<'_>,
        graph: &DependencyGraph,
        sorted: &SortedGraph,
        emitted: &BTreeSet<PackageName>,
        filters: &Filters,
        kind: NameKind,
    ) -> Result<BTreeSet<PackageName>> {
        let mut kept = emitted.clone();

        if let Some(leaf) = &filters.leaf {
            let scope = filter::leaf_scope(graph, sorted, leaf)?;
            kept.retain(|name| scope.contains(name));
        }
        if filters.finite_package {
            let finite = filter::finite_packages(graph, emitted);
            kept.retain(|name| finite.contains(name));
        }
        if let Some(requirement) = &filters.requirement {
            let matches =
                filter::requirement_matches(session, requirement, emitted, kind).await?;
            kept.retain(|name| matches.contains(name));
        }

        if filters.is_active() {
            tracing::debug!("Filters kept {} of {} packages", kept.len(), emitted.len());
        }
        Ok(kept)
    }

    async fn annotate(
        &self,
        session: &Session<'_>,
        annotator: &dyn AclAnnotator,
        packages: &mut [ResolvedPackage],
    ) -> Result<()> {
        let acls: Vec<Vec<String>> = futures::stream::iter(packages.iter())
            .map(|package| session.acl_of(annotator, &package.name))
            .buffered(self.config.acl_concurrency.max(1))
            .try_collect()
            .await?;

        for (package, acl) in packages.iter_mut().zip(acls) {
            package.acl = acl;
        }
        Ok(())
    }
}
