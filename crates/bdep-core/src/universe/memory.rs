//! In-memory universe backed by a serialized snapshot.
//!
//! Used by the CLI (snapshots exported to JSON) and by tests, where
//! [`UniverseBuilder`] assembles small universes by hand.

use super::{
    AclAnnotator, NameKind, PackageInfo, ProviderMap, RequirementMap, UniverseAccessor,
};
use crate::error::UniverseError;
use async_trait::async_trait;
use bdep_schema::{
    Arch, DependencyEdge, DependencyKind, DependencyName, Package, PackageHash, PackageName, Scope,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Serialized form of a package universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseSnapshot {
    /// One entry per branch.
    pub branches: Vec<BranchSnapshot>,
}

/// All packages and facts of one branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchSnapshot {
    /// Branch name.
    pub name: String,
    /// Binary architectures the branch is built for. Empty accepts any.
    #[serde(default)]
    pub archs: Vec<Arch>,
    /// Source and binary packages.
    pub packages: Vec<Package>,
    /// Dependency facts, linked to packages by hash.
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    /// ACL members per source package.
    #[serde(default)]
    pub acl: BTreeMap<PackageName, Vec<String>>,
}

impl UniverseSnapshot {
    /// Asynchronously load a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError::Unavailable`] if the file cannot be read and
    /// [`UniverseError::Malformed`] if it is not a valid snapshot.
    pub async fn load(path: &Path) -> Result<Self, UniverseError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UniverseError::Unavailable(format!("{}: {e}", path.display())))?;

        serde_json::from_str(&content)
            .map_err(|e| UniverseError::Malformed(format!("{}: {e}", path.display())))
    }
}

/// Indexed view of one branch.
#[derive(Debug, Default)]
struct BranchIndex {
    declared_archs: BTreeSet<Arch>,
    packages: Vec<Package>,
    by_name: HashMap<PackageName, Vec<usize>>,
    /// Source package name for each binary (by package index).
    source_name: HashMap<usize, PackageName>,
    binaries_by_source: HashMap<PackageName, Vec<usize>>,
    requires: HashMap<PackageHash, BTreeSet<DependencyName>>,
    /// Binaries providing each name, own names included.
    provides: HashMap<DependencyName, Vec<usize>>,
    acl: BTreeMap<PackageName, Vec<String>>,
}

impl BranchIndex {
    fn build(snapshot: BranchSnapshot, skip_debuginfo: bool) -> Result<Self, UniverseError> {
        let mut index = Self {
            declared_archs: snapshot.archs.into_iter().collect(),
            acl: snapshot.acl,
            ..Self::default()
        };

        let mut seen = BTreeSet::new();
        for package in snapshot.packages {
            if !seen.insert(package.hash) {
                return Err(UniverseError::Malformed(format!(
                    "duplicate package hash {} in branch {}",
                    package.hash, snapshot.name
                )));
            }
            if skip_debuginfo && package.is_debuginfo() {
                continue;
            }
            index.packages.push(package);
        }

        let sources_by_rpm: HashMap<&str, &PackageName> = index
            .packages
            .iter()
            .filter(|p| p.is_source)
            .map(|p| (p.source_rpm.as_str(), &p.name))
            .collect();

        let mut by_hash = HashMap::new();
        let mut source_name = HashMap::new();
        for (i, package) in index.packages.iter().enumerate() {
            index
                .by_name
                .entry(package.name.clone())
                .or_insert_with(Vec::new)
                .push(i);
            by_hash.insert(package.hash, i);

            if package.is_source {
                continue;
            }
            index
                .provides
                .entry(DependencyName::from(&package.name))
                .or_insert_with(Vec::new)
                .push(i);
            match sources_by_rpm.get(package.source_rpm.as_str()) {
                Some(&src) => {
                    source_name.insert(i, src.clone());
                }
                None => tracing::trace!(
                    "Binary {} has no source {} in branch",
                    package.name,
                    package.source_rpm
                ),
            }
        }
        for (&i, src) in &source_name {
            index
                .binaries_by_source
                .entry(src.clone())
                .or_insert_with(Vec::new)
                .push(i);
        }
        index.source_name = source_name;

        for edge in snapshot.dependencies {
            let Some(&i) = by_hash.get(&edge.subject) else {
                // Facts for skipped (debuginfo) or unknown packages.
                continue;
            };
            match edge.kind {
                DependencyKind::Require => {
                    index.requires.entry(edge.subject).or_default().insert(edge.name);
                }
                DependencyKind::Provide if !index.packages[i].is_source => {
                    let providers = index.provides.entry(edge.name).or_default();
                    if !providers.contains(&i) {
                        providers.push(i);
                    }
                }
                _ => {}
            }
        }

        Ok(index)
    }

    fn requires_of(&self, i: usize) -> impl Iterator<Item = &DependencyName> {
        self.requires
            .get(&self.packages[i].hash)
            .into_iter()
            .flatten()
    }

    fn named(&self, name: &PackageName) -> impl Iterator<Item = usize> + '_ {
        self.by_name.get(name).into_iter().flatten().copied()
    }

    fn built_from(&self, source: &PackageName, scope: &Scope) -> impl Iterator<Item = usize> + '_ {
        let admitted: Vec<usize> = self
            .binaries_by_source
            .get(source)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&i| scope.admits(self.packages[i].arch))
            .collect();
        admitted.into_iter()
    }

    /// The newest build among `candidates`, ties broken by hash.
    fn newest(&self, candidates: impl Iterator<Item = usize>) -> Option<&Package> {
        candidates
            .map(|i| &self.packages[i])
            .max_by_key(|p| (p.build_time, p.hash))
    }
}

/// A [`UniverseAccessor`] over an in-memory snapshot.
#[derive(Debug, Default)]
pub struct InMemoryUniverse {
    branches: BTreeMap<String, BranchIndex>,
}

impl InMemoryUniverse {
    /// Index a snapshot. `*-debuginfo` binaries are dropped when
    /// `skip_debuginfo` is set.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError::Malformed`] if a branch repeats a package hash.
    pub fn new(snapshot: UniverseSnapshot, skip_debuginfo: bool) -> Result<Self, UniverseError> {
        let mut branches = BTreeMap::new();
        for branch in snapshot.branches {
            let name = branch.name.to_lowercase();
            let index = BranchIndex::build(branch, skip_debuginfo)?;
            tracing::debug!(
                "Indexed branch {} ({} packages)",
                name,
                index.packages.len()
            );
            branches.insert(name, index);
        }
        Ok(Self { branches })
    }

    /// Names of the indexed branches.
    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    fn branch(&self, name: &str) -> Result<&BranchIndex, UniverseError> {
        self.branches
            .get(name)
            .ok_or_else(|| UniverseError::UnknownBranch(name.to_string()))
    }
}

#[async_trait]
impl UniverseAccessor for InMemoryUniverse {
    async fn check_scope(&self, scope: &Scope) -> Result<(), UniverseError> {
        let branch = self.branch(scope.branch())?;
        if branch.declared_archs.is_empty() {
            return Ok(());
        }
        for arch in scope.archs() {
            if *arch != Arch::Noarch && !branch.declared_archs.contains(arch) {
                return Err(UniverseError::UnknownArch {
                    branch: scope.branch().to_string(),
                    arch: arch.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn requirements_of(
        &self,
        names: &BTreeSet<PackageName>,
        kind: NameKind,
        scope: &Scope,
    ) -> Result<RequirementMap, UniverseError> {
        let branch = self.branch(scope.branch())?;
        let kinds = scope.package_type();
        let mut result = RequirementMap::new();

        for name in names {
            let mut deps = BTreeSet::new();
            for i in branch.named(name) {
                let package = &branch.packages[i];
                let wanted = if package.is_source {
                    kind.covers_source() && kinds.includes_source()
                } else {
                    kind.covers_binary() && kinds.includes_binary() && scope.admits(package.arch)
                };
                if wanted {
                    deps.extend(branch.requires_of(i).cloned());
                }
            }
            if kind.covers_source() && kinds.includes_binary() {
                for i in branch.built_from(name, scope) {
                    deps.extend(branch.requires_of(i).cloned());
                }
            }
            if !deps.is_empty() {
                result.insert(name.clone(), deps);
            }
        }

        Ok(result)
    }

    async fn providers_of(
        &self,
        dependencies: &BTreeSet<DependencyName>,
        scope: &Scope,
        wants_source: bool,
    ) -> Result<ProviderMap, UniverseError> {
        let branch = self.branch(scope.branch())?;
        let mut result = ProviderMap::new();

        for dep in dependencies {
            let mut providers = BTreeSet::new();
            for &i in branch.provides.get(dep).into_iter().flatten() {
                let package = &branch.packages[i];
                if !scope.admits(package.arch) {
                    continue;
                }
                if wants_source {
                    if let Some(src) = branch.source_name.get(&i) {
                        providers.insert(src.clone());
                    }
                } else {
                    providers.insert(package.name.clone());
                }
            }
            if !providers.is_empty() {
                result.insert(dep.clone(), providers);
            }
        }

        Ok(result)
    }

    async fn binaries_of(
        &self,
        sources: &BTreeSet<PackageName>,
        scope: &Scope,
    ) -> Result<BTreeSet<PackageName>, UniverseError> {
        let branch = self.branch(scope.branch())?;
        Ok(sources
            .iter()
            .flat_map(|src| branch.built_from(src, scope))
            .map(|i| branch.packages[i].name.clone())
            .collect())
    }

    async fn describe(
        &self,
        names: &BTreeSet<PackageName>,
        scope: &Scope,
        as_source: bool,
    ) -> Result<BTreeMap<PackageName, PackageInfo>, UniverseError> {
        let branch = self.branch(scope.branch())?;
        let mut result = BTreeMap::new();

        for name in names {
            let info = if as_source {
                let sources = branch.named(name).filter(|&i| branch.packages[i].is_source);
                branch.newest(sources).map(|package| PackageInfo {
                    package: package.clone(),
                    archs: branch
                        .built_from(name, scope)
                        .map(|i| branch.packages[i].arch)
                        .collect(),
                })
            } else {
                let binaries: Vec<usize> = branch
                    .named(name)
                    .filter(|&i| {
                        let p = &branch.packages[i];
                        !p.is_source && scope.admits(p.arch)
                    })
                    .collect();
                branch
                    .newest(binaries.iter().copied())
                    .map(|package| PackageInfo {
                        package: package.clone(),
                        archs: binaries.iter().map(|&i| branch.packages[i].arch).collect(),
                    })
            };
            if let Some(info) = info {
                result.insert(name.clone(), info);
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl AclAnnotator for InMemoryUniverse {
    async fn acl_of(&self, name: &PackageName, branch: &str) -> Result<Vec<String>, UniverseError> {
        Ok(self
            .branch(branch)?
            .acl
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Assembles small universes by hand.
///
/// ```
/// use bdep_core::universe::UniverseBuilder;
///
/// let universe = UniverseBuilder::new("sisyphus")
///     .package("gcc", &["glibc-devel"])
///     .package("glibc-devel", &[])
///     .build();
/// assert_eq!(universe.branches().count(), 1);
/// ```
#[derive(Debug)]
pub struct UniverseBuilder {
    branches: Vec<BranchSnapshot>,
    next_hash: u64,
}

impl UniverseBuilder {
    /// Start a universe whose first branch is `branch`.
    pub fn new(branch: &str) -> Self {
        Self {
            branches: vec![BranchSnapshot {
                name: branch.to_string(),
                ..BranchSnapshot::default()
            }],
            next_hash: 1,
        }
    }

    /// Start another branch; later calls add to it.
    pub fn branch(mut self, name: &str) -> Self {
        self.branches.push(BranchSnapshot {
            name: name.to_string(),
            ..BranchSnapshot::default()
        });
        self
    }

    /// Declare the binary architectures of the current branch.
    pub fn archs(mut self, archs: &[Arch]) -> Self {
        self.current().archs = archs.to_vec();
        self
    }

    /// A source package with the given build requirements.
    pub fn source(mut self, name: &str, build_requires: &[&str]) -> Self {
        let hash = self.hash();
        let package = Self::record(hash, name, Arch::Src, true, Self::srpm(name));
        self.push(package, build_requires, &[]);
        self
    }

    /// A binary built from `source` for `arch`.
    pub fn binary(
        mut self,
        source: &str,
        name: &str,
        arch: Arch,
        requires: &[&str],
        provides: &[&str],
    ) -> Self {
        let hash = self.hash();
        let package = Self::record(hash, name, arch, false, Self::srpm(source));
        self.push(package, requires, provides);
        self
    }

    /// A source package plus one `x86_64` binary of the same name.
    pub fn package(self, name: &str, build_requires: &[&str]) -> Self {
        self.source(name, build_requires)
            .binary(name, name, Arch::X86_64, &[], &[])
    }

    /// ACL members for a source package in the current branch.
    pub fn acl(mut self, name: &str, members: &[&str]) -> Self {
        self.current().acl.insert(
            PackageName::new(name),
            members.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// The snapshot assembled so far.
    pub fn snapshot(self) -> UniverseSnapshot {
        UniverseSnapshot {
            branches: self.branches,
        }
    }

    /// Index the snapshot, skipping debuginfo binaries.
    ///
    /// # Panics
    ///
    /// Never: the builder assigns unique hashes.
    pub fn build(self) -> InMemoryUniverse {
        InMemoryUniverse::new(self.snapshot(), true).expect("builder assigns unique hashes")
    }

    fn current(&mut self) -> &mut BranchSnapshot {
        self.branches
            .last_mut()
            .expect("builder always holds a branch")
    }

    fn hash(&mut self) -> PackageHash {
        let hash = PackageHash(self.next_hash);
        self.next_hash += 1;
        hash
    }

    fn srpm(source: &str) -> String {
        format!("{source}-1.0-alt1.src.rpm")
    }

    fn record(hash: PackageHash, name: &str, arch: Arch, is_source: bool, srpm: String) -> Package {
        let secs = i64::try_from(hash.0).unwrap_or(i64::MAX);
        Package {
            hash,
            name: PackageName::new(name),
            version: "1.0".to_string(),
            release: "alt1".to_string(),
            epoch: 0,
            serial: 0,
            arch,
            is_source,
            source_rpm: srpm,
            build_time: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
        }
    }

    fn push(&mut self, package: Package, requires: &[&str], provides: &[&str]) {
        let subject = package.hash;
        let branch = self.current();
        branch.packages.push(package);
        let edges = requires
            .iter()
            .map(|r| (r, DependencyKind::Require))
            .chain(provides.iter().map(|p| (p, DependencyKind::Provide)));
        for (name, kind) in edges {
            branch.dependencies.push(DependencyEdge {
                subject,
                name: DependencyName::new(name),
                version: String::new(),
                flags: 0,
                kind,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdep_schema::DependencyType;

    fn names(items: &[&str]) -> BTreeSet<PackageName> {
        items.iter().map(|s| PackageName::new(s)).collect()
    }

    fn deps(items: &[&str]) -> BTreeSet<DependencyName> {
        items.iter().map(|s| DependencyName::new(s)).collect()
    }

    fn universe() -> InMemoryUniverse {
        UniverseBuilder::new("sisyphus")
            .archs(&[Arch::X86_64, Arch::Aarch64])
            .source("python3", &["gcc", "libffi-devel"])
            .binary("python3", "python3", Arch::X86_64, &["libffi.so.8"], &[])
            .binary("python3", "python3", Arch::Aarch64, &["libffi.so.8"], &[])
            .binary("python3", "python3-debuginfo", Arch::X86_64, &["debug-only"], &[])
            .source("libffi", &[])
            .binary("libffi", "libffi8", Arch::X86_64, &[], &["libffi.so.8"])
            .binary("libffi", "libffi-devel", Arch::X86_64, &["libffi8"], &[])
            .package("gcc", &[])
            .acl("python3", &["@python", "alice"])
            .build()
    }

    #[tokio::test]
    async fn requirements_follow_dependency_type() {
        let universe = universe();
        let seeds = names(&["python3"]);

        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Source);
        let reqs = universe.requirements_of(&seeds, NameKind::Source, &scope).await.unwrap();
        assert_eq!(reqs[&PackageName::new("python3")], deps(&["gcc", "libffi-devel"]));

        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Binary);
        let reqs = universe.requirements_of(&seeds, NameKind::Source, &scope).await.unwrap();
        assert_eq!(reqs[&PackageName::new("python3")], deps(&["libffi.so.8"]));

        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let reqs = universe.requirements_of(&seeds, NameKind::Source, &scope).await.unwrap();
        assert_eq!(reqs[&PackageName::new("python3")].len(), 3);
    }

    #[tokio::test]
    async fn debuginfo_binaries_are_invisible() {
        let universe = universe();
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Binary);
        let reqs = universe
            .requirements_of(&names(&["python3"]), NameKind::Source, &scope)
            .await
            .unwrap();
        assert!(!reqs[&PackageName::new("python3")].contains("debug-only"));
    }

    #[tokio::test]
    async fn binary_lookups_ignore_siblings_and_sources() {
        let universe = UniverseBuilder::new("sisyphus")
            .source("foo", &["foo-build-tool"])
            .binary("foo", "foo", Arch::X86_64, &[], &[])
            .binary("foo", "foo-doc", Arch::X86_64, &["bar"], &[])
            .build();
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let foo = names(&["foo"]);

        let as_binary = universe
            .requirements_of(&foo, NameKind::Binary, &scope)
            .await
            .unwrap();
        assert!(as_binary.is_empty());

        let as_source = universe
            .requirements_of(&foo, NameKind::Source, &scope)
            .await
            .unwrap();
        assert_eq!(as_source[&PackageName::new("foo")], deps(&["bar", "foo-build-tool"]));

        let docs = universe
            .requirements_of(&names(&["foo-doc"]), NameKind::Any, &scope)
            .await
            .unwrap();
        assert_eq!(docs[&PackageName::new("foo-doc")], deps(&["bar"]));
    }

    #[tokio::test]
    async fn providers_map_to_sources_on_request() {
        let universe = universe();
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let wanted = deps(&["libffi.so.8", "libffi-devel", "missing"]);

        let binaries = universe.providers_of(&wanted, &scope, false).await.unwrap();
        assert_eq!(binaries[&DependencyName::new("libffi.so.8")], names(&["libffi8"]));
        assert_eq!(binaries[&DependencyName::new("libffi-devel")], names(&["libffi-devel"]));
        assert!(!binaries.contains_key("missing"));

        let sources = universe.providers_of(&wanted, &scope, true).await.unwrap();
        assert_eq!(sources[&DependencyName::new("libffi.so.8")], names(&["libffi"]));
    }

    #[tokio::test]
    async fn arch_filter_applies_to_binaries() {
        let universe = universe();
        let scope = Scope::new("sisyphus", [Arch::Aarch64], DependencyType::Both);
        let providers = universe
            .providers_of(&deps(&["libffi.so.8"]), &scope, false)
            .await
            .unwrap();
        assert!(providers.is_empty());

        let info = universe
            .describe(&names(&["python3"]), &scope, true)
            .await
            .unwrap();
        let archs: Vec<Arch> = info[&PackageName::new("python3")].archs.iter().copied().collect();
        assert_eq!(archs, vec![Arch::Aarch64]);
    }

    #[tokio::test]
    async fn binaries_of_lists_built_packages() {
        let universe = universe();
        let scope = Scope::new("sisyphus", [Arch::X86_64], DependencyType::Both);
        let built = universe.binaries_of(&names(&["libffi"]), &scope).await.unwrap();
        assert_eq!(built, names(&["libffi-devel", "libffi8"]));
    }

    #[tokio::test]
    async fn scope_check_rejects_unknown_branch_and_arch() {
        let universe = universe();
        let scope = Scope::new("p5", [Arch::X86_64], DependencyType::Both);
        assert_eq!(
            universe.check_scope(&scope).await,
            Err(UniverseError::UnknownBranch("p5".into()))
        );

        let scope = Scope::new("sisyphus", [Arch::Mipsel], DependencyType::Both);
        assert!(matches!(
            universe.check_scope(&scope).await,
            Err(UniverseError::UnknownArch { .. })
        ));
    }

    #[tokio::test]
    async fn acl_lookup() {
        let universe = universe();
        let acl = universe
            .acl_of(&PackageName::new("python3"), "sisyphus")
            .await
            .unwrap();
        assert_eq!(acl, vec!["@python", "alice"]);
        let none = universe
            .acl_of(&PackageName::new("gcc"), "sisyphus")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn duplicate_hashes_are_malformed() {
        let mut snapshot = UniverseBuilder::new("p11").package("a", &[]).snapshot();
        let dup = snapshot.branches[0].packages[0].clone();
        snapshot.branches[0].packages.push(dup);
        assert!(matches!(
            InMemoryUniverse::new(snapshot, true),
            Err(UniverseError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_a_file() {
        let snapshot = UniverseBuilder::new("p11").package("zlib", &[]).snapshot();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_json::to_string(&snapshot).unwrap()).unwrap();

        let loaded = UniverseSnapshot::load(file.path()).await.unwrap();
        assert_eq!(loaded.branches[0].packages.len(), 2);
    }
}
