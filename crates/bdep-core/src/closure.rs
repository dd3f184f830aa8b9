//! Depth-bounded expansion of build requirements.
//!
//! Level 1 is the seed set. Each further level asks the accessor for the
//! requirements of the previous level's new packages and maps them back to
//! the source packages providing them, so depth `D` performs `D - 1`
//! expansions and stops early once a level discovers nothing new.
//!
//! Half-step resolutions always run to level 3 and keep only those level 3
//! sources that provide a build requirement of a level 2 source package
//! itself, dropping the ones reached through binary requirements alone.

use crate::error::Result;
use crate::session::Session;
use crate::universe::{NameKind, ProviderMap, RequirementMap, all_providers, all_requirements};
use bdep_schema::{DependencyName, DependencyType, PackageName};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Packages discovered by one resolution, with the facts fetched on the way.
///
/// Membership only grows. Requirement and provider answers are kept so the
/// graph builder does not have to ask for them twice.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    seeds: BTreeSet<PackageName>,
    levels: HashMap<PackageName, u32>,
    requirements: RequirementMap,
    expanded: HashSet<PackageName>,
    providers: ProviderMap,
    queried: HashSet<DependencyName>,
}

impl Closure {
    /// A closure holding only the seeds, at level 1.
    pub fn from_seeds(seeds: BTreeSet<PackageName>) -> Self {
        let levels = seeds.iter().map(|s| (s.clone(), 1)).collect();
        Self {
            seeds,
            levels,
            ..Self::default()
        }
    }

    /// The seed packages.
    pub fn seeds(&self) -> &BTreeSet<PackageName> {
        &self.seeds
    }

    /// Whether `name` was a seed.
    pub fn is_seed(&self, name: &str) -> bool {
        self.seeds.contains(name)
    }

    /// Whether `name` is in the closure.
    pub fn contains(&self, name: &str) -> bool {
        self.levels.contains_key(name)
    }

    /// Level at which `name` was first discovered; seeds are level 1.
    pub fn level_of(&self, name: &str) -> Option<u32> {
        self.levels.get(name).copied()
    }

    /// All members, seeds included, in name order.
    pub fn members(&self) -> BTreeSet<PackageName> {
        self.levels.keys().cloned().collect()
    }

    /// Members that were not seeds, in name order.
    pub fn discovered(&self) -> BTreeSet<PackageName> {
        self.levels
            .keys()
            .filter(|name| !self.seeds.contains(*name))
            .cloned()
            .collect()
    }

    /// Number of members, seeds included.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the closure has no members at all.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Requirements recorded for `name`, if it was expanded.
    pub fn requirements(&self, name: &str) -> Option<&BTreeSet<DependencyName>> {
        self.requirements.get(name)
    }

    /// Providers recorded for `dependency`.
    pub fn providers(&self, dependency: &str) -> Option<&BTreeSet<PackageName>> {
        self.providers.get(dependency)
    }

    /// Add `candidates` at `level`, returning the ones that were new.
    pub(crate) fn absorb(
        &mut self,
        candidates: impl IntoIterator<Item = PackageName>,
        level: u32,
    ) -> BTreeSet<PackageName> {
        let mut fresh = BTreeSet::new();
        for name in candidates {
            if !self.levels.contains_key(&name) {
                self.levels.insert(name.clone(), level);
                fresh.insert(name);
            }
        }
        fresh
    }

    fn record_requirements(&mut self, asked: &BTreeSet<PackageName>, answer: RequirementMap) {
        self.expanded.extend(asked.iter().cloned());
        self.requirements.extend(answer);
    }

    fn record_providers(&mut self, asked: &BTreeSet<DependencyName>, answer: &ProviderMap) {
        self.queried.extend(asked.iter().cloned());
        for (dep, providers) in answer {
            self.providers
                .entry(dep.clone())
                .or_default()
                .extend(providers.iter().cloned());
        }
    }

    /// Requirements of `frontier` read as `kind`, and every package
    /// providing them. Nothing is added to the membership.
    pub(crate) async fn discover(
        &mut self,
        session: &Session<'_>,
        frontier: &BTreeSet<PackageName>,
        kind: NameKind,
        wants_source: bool,
    ) -> Result<BTreeSet<PackageName>> {
        let requirements = session.requirements_of(frontier, kind).await?;
        let deps = all_requirements(&requirements);
        self.record_requirements(frontier, requirements);

        let providers = session.providers_of(&deps, wants_source).await?;
        self.record_providers(&deps, &providers);
        Ok(all_providers(&providers))
    }

    /// One expansion: the providers found by [`Self::discover`] that were
    /// not seen before, added at `level` and returned.
    pub(crate) async fn step(
        &mut self,
        session: &Session<'_>,
        frontier: &BTreeSet<PackageName>,
        kind: NameKind,
        wants_source: bool,
        level: u32,
    ) -> Result<BTreeSet<PackageName>> {
        let candidates = self.discover(session, frontier, kind, wants_source).await?;
        Ok(self.absorb(candidates, level))
    }

    /// Fetch the facts still missing for the members that were never
    /// expanded, so every member's edges are known.
    pub(crate) async fn complete_edges(
        &mut self,
        session: &Session<'_>,
        kind: NameKind,
        wants_source: bool,
    ) -> Result<()> {
        let pending: BTreeSet<PackageName> = self
            .levels
            .keys()
            .filter(|name| !self.expanded.contains(*name))
            .cloned()
            .collect();
        let requirements = session.requirements_of(&pending, kind).await?;
        self.record_requirements(&pending, requirements);

        let unknown: BTreeSet<DependencyName> = all_requirements(&self.requirements)
            .into_iter()
            .filter(|dep| !self.queried.contains(dep))
            .collect();
        let providers = session.providers_of(&unknown, wants_source).await?;
        self.record_providers(&unknown, &providers);
        Ok(())
    }
}

/// Depth of every half-step resolution, whatever depth was asked for.
const HALF_STEP_DEPTH: u32 = 3;

/// Expand `seeds` for `depth` levels through source build requirements.
///
/// With `half_step` the depth is [`HALF_STEP_DEPTH`] and the last level is
/// pruned as described in the module docs.
pub(crate) async fn expand(
    session: &Session<'_>,
    seeds: BTreeSet<PackageName>,
    depth: u32,
    half_step: bool,
) -> Result<Closure> {
    let depth = if half_step { HALF_STEP_DEPTH } else { depth };
    let mut closure = Closure::from_seeds(seeds);
    let mut frontier = closure.seeds().clone();

    for level in 2..=depth {
        if frontier.is_empty() {
            tracing::debug!("Closure stable before level {}", level);
            break;
        }
        let mut candidates = closure
            .discover(session, &frontier, NameKind::Source, true)
            .await?;
        if half_step && level == depth {
            let wanted = build_requirement_providers(session, &frontier).await?;
            let found = candidates.len();
            candidates.retain(|name| wanted.contains(name));
            tracing::debug!("Half level keeps {} of {} candidates", candidates.len(), found);
        }
        frontier = closure.absorb(candidates, level);
        tracing::debug!("Level {}: {} new packages", level, frontier.len());
    }

    Ok(closure)
}

/// Sources providing a build requirement of the `frontier` source packages
/// themselves, whatever the scope's dependency type.
async fn build_requirement_providers(
    session: &Session<'_>,
    frontier: &BTreeSet<PackageName>,
) -> Result<BTreeSet<PackageName>> {
    let scope = session.scope().with_package_type(DependencyType::Source);
    let sources = session.with_scope(&scope);
    let requirements = sources.requirements_of(frontier, NameKind::Source).await?;
    let providers = sources
        .providers_of(&all_requirements(&requirements), true)
        .await?;
    Ok(all_providers(&providers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Deadline;
    use crate::universe::UniverseBuilder;
    use bdep_schema::{Arch, Scope};
    use std::time::Duration;

    fn names(items: &[&str]) -> BTreeSet<PackageName> {
        items.iter().map(|s| PackageName::new(s)).collect()
    }

    fn chain() -> crate::universe::InMemoryUniverse {
        UniverseBuilder::new("sisyphus")
            .package("a", &["b"])
            .package("b", &["c"])
            .package("c", &[])
            .build()
    }

    async fn run(depth: u32, half_step: bool, kind: DependencyType) -> Closure {
        let universe = chain();
        let scope = Scope::new("sisyphus", [Arch::X86_64], kind);
        let session = Session::new(&universe, &scope, Deadline::PerCall(Duration::from_secs(5)));
        expand(&session, names(&["a"]), depth, half_step)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn depth_counts_the_seed_level() {
        assert_eq!(run(1, false, DependencyType::Both).await.discovered(), names(&[]));
        assert_eq!(run(2, false, DependencyType::Both).await.discovered(), names(&["b"]));
        assert_eq!(
            run(3, false, DependencyType::Both).await.discovered(),
            names(&["b", "c"])
        );
    }

    #[tokio::test]
    async fn levels_record_discovery() {
        let closure = run(3, false, DependencyType::Both).await;
        assert_eq!(closure.level_of("a"), Some(1));
        assert_eq!(closure.level_of("b"), Some(2));
        assert_eq!(closure.level_of("c"), Some(3));
        assert!(closure.is_seed("a"));
    }

    /// `b` needs `c` to build and `d` to run; `c` itself needs `e` to build.
    fn layered() -> crate::universe::InMemoryUniverse {
        UniverseBuilder::new("sisyphus")
            .package("a", &["b"])
            .source("b", &["c"])
            .binary("b", "b", Arch::X86_64, &["d"], &[])
            .package("c", &["e"])
            .package("d", &[])
            .package("e", &[])
            .build()
    }

    async fn run_layered(depth: u32, half_step: bool, kind: DependencyType) -> Closure {
        let universe = layered();
        let scope = Scope::new("sisyphus", [Arch::X86_64], kind);
        let session = Session::new(&universe, &scope, Deadline::PerCall(Duration::from_secs(5)));
        expand(&session, names(&["a"]), depth, half_step)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn half_step_prunes_the_third_level() {
        let full = run_layered(3, false, DependencyType::Both).await;
        assert_eq!(full.discovered(), names(&["b", "c", "d"]));

        let half = run_layered(3, true, DependencyType::Both).await;
        assert_eq!(half.discovered(), names(&["b", "c"]));
        assert_eq!(half.level_of("c"), Some(3));
        assert!(!half.contains("d"));
    }

    #[tokio::test]
    async fn half_step_ignores_the_requested_depth() {
        for depth in [1, 2, 6] {
            let closure = run_layered(depth, true, DependencyType::Both).await;
            assert_eq!(closure.discovered(), names(&["b", "c"]), "depth {depth}");
        }
        assert!(run_layered(6, false, DependencyType::Both).await.contains("e"));
    }

    #[tokio::test]
    async fn half_step_on_a_plain_chain_matches_depth_three() {
        let half = run(1, true, DependencyType::Both).await;
        assert_eq!(half.discovered(), run(3, false, DependencyType::Both).await.discovered());
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let universe = UniverseBuilder::new("sisyphus")
            .package("a", &["b"])
            .package("b", &["a"])
            .build();
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let session = Session::new(&universe, &scope, Deadline::PerCall(Duration::from_secs(5)));
        let closure = expand(&session, names(&["a"]), 5, false).await.unwrap();
        assert_eq!(closure.members(), names(&["a", "b"]));
    }
}
