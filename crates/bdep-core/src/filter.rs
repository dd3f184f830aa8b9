//! Post-sort views of a result: leaf, finite-package and requirement filters.
//!
//! Each filter narrows the set of emitted packages independently; the
//! resolver intersects whatever the caller enabled.

use crate::error::{Result, ValidationError};
use crate::graph::{DependencyGraph, SortedGraph};
use crate::session::Session;
use crate::universe::{NameKind, all_requirements};
use bdep_schema::{DependencyName, PackageName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filters as supplied by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    /// Keep only what this package transitively requires.
    pub leaf: Option<String>,
    /// Keep only packages no other emitted package requires.
    pub finite_package: bool,
    /// Keep packages requiring something one of these binaries provides.
    pub filter_by_package: Vec<String>,
    /// Keep packages requiring something a binary of this source provides.
    pub filter_by_source: Option<String>,
}

/// Binaries whose provides a package must require to be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementFilter {
    /// Explicit binary package names.
    Packages(BTreeSet<PackageName>),
    /// The binaries built by one source package.
    Source(PackageName),
}

/// Validated filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// See [`FilterRequest::leaf`].
    pub leaf: Option<PackageName>,
    /// See [`FilterRequest::finite_package`].
    pub finite_package: bool,
    /// Requirement filter, if any.
    pub requirement: Option<RequirementFilter>,
}

fn non_empty(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl FilterRequest {
    /// Check the request and normalise names.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConflictingRequirementFilters`] when both
    /// requirement filters are set.
    pub fn validate(&self) -> std::result::Result<Filters, ValidationError> {
        let packages: BTreeSet<PackageName> = self
            .filter_by_package
            .iter()
            .map(String::as_str)
            .filter_map(non_empty)
            .map(PackageName::new)
            .collect();
        let source = self.filter_by_source.as_deref().and_then(non_empty);

        let requirement = match (packages.is_empty(), source) {
            (false, Some(_)) => return Err(ValidationError::ConflictingRequirementFilters),
            (false, None) => Some(RequirementFilter::Packages(packages)),
            (true, Some(src)) => Some(RequirementFilter::Source(PackageName::new(src))),
            (true, None) => None,
        };

        Ok(Filters {
            leaf: self.leaf.as_deref().and_then(non_empty).map(PackageName::new),
            finite_package: self.finite_package,
            requirement,
        })
    }
}

impl Filters {
    /// Whether any filter is enabled.
    pub fn is_active(&self) -> bool {
        self.leaf.is_some() || self.finite_package || self.requirement.is_some()
    }
}

/// `leaf`, everything it requires and its cycle partners.
///
/// # Errors
///
/// Returns [`ValidationError::LeafNotInClosure`] if `leaf` is not a node.
pub fn leaf_scope(
    graph: &DependencyGraph,
    sorted: &SortedGraph,
    leaf: &PackageName,
) -> std::result::Result<BTreeSet<PackageName>, ValidationError> {
    if !graph.contains(leaf) {
        return Err(ValidationError::LeafNotInClosure { leaf: leaf.clone() });
    }
    let mut kept = graph.downward_closure(leaf);
    kept.extend(sorted.cycle_members(leaf).iter().cloned());
    Ok(kept)
}

/// Members of `emitted` that no other member of `emitted` requires.
pub fn finite_packages(
    graph: &DependencyGraph,
    emitted: &BTreeSet<PackageName>,
) -> BTreeSet<PackageName> {
    emitted
        .iter()
        .filter(|name| {
            !graph
                .required_by(name)
                .iter()
                .any(|consumer| emitted.contains(consumer))
        })
        .cloned()
        .collect()
}

/// Members of `candidates` requiring a name that one of the filter's
/// binaries provides.
///
/// `kind` must match how `candidates` are named: source packages for the
/// build closure, binaries for the full closure.
pub(crate) async fn requirement_matches(
    session: &Session<'_>,
    filter: &RequirementFilter,
    candidates: &BTreeSet<PackageName>,
    kind: NameKind,
) -> Result<BTreeSet<PackageName>> {
    let binaries = match filter {
        RequirementFilter::Packages(names) => names.clone(),
        RequirementFilter::Source(source) => {
            session
                .binaries_of(&BTreeSet::from([source.clone()]))
                .await?
        }
    };
    if binaries.is_empty() {
        return Ok(BTreeSet::new());
    }

    let requirements = session.requirements_of(candidates, kind).await?;
    let providers = session
        .providers_of(&all_requirements(&requirements), false)
        .await?;
    let satisfied = |deps: &BTreeSet<DependencyName>| {
        deps.iter().any(|dep| {
            providers
                .get(dep)
                .is_some_and(|found| !found.is_disjoint(&binaries))
        })
    };

    Ok(requirements
        .into_iter()
        .filter(|(name, deps)| candidates.contains(name) && satisfied(deps))
        .map(|(name, _)| name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<PackageName> {
        items.iter().map(|s| PackageName::new(s)).collect()
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new(nodes.iter().map(|n| PackageName::new(n)));
        for (from, to) in edges {
            g.add_requirement(from, to);
        }
        g
    }

    #[test]
    fn exclusive_requirement_filters() {
        let request = FilterRequest {
            filter_by_package: vec!["libfoo".into()],
            filter_by_source: Some("foo".into()),
            ..FilterRequest::default()
        };
        assert_eq!(
            request.validate(),
            Err(ValidationError::ConflictingRequirementFilters)
        );
    }

    #[test]
    fn blank_names_count_as_unset() {
        let request = FilterRequest {
            leaf: Some("  ".into()),
            filter_by_package: vec![String::new()],
            filter_by_source: Some("foo".into()),
            ..FilterRequest::default()
        };
        let filters = request.validate().unwrap();
        assert!(filters.leaf.is_none());
        assert_eq!(
            filters.requirement,
            Some(RequirementFilter::Source(PackageName::new("foo")))
        );
        assert!(!FilterRequest::default().validate().unwrap().is_active());
    }

    #[test]
    fn finite_packages_are_unrequired() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("c", "b")]);
        assert_eq!(finite_packages(&g, &set(&["a", "b", "c"])), set(&["a", "c"]));
    }

    #[test]
    fn finite_ignores_consumers_outside_the_output() {
        let g = graph(&["seed", "a", "b"], &[("seed", "a"), ("a", "b")]);
        assert_eq!(finite_packages(&g, &set(&["a", "b"])), set(&["a"]));
    }

    #[test]
    fn leaf_keeps_downward_closure_and_partners() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "b"), ("d", "a")],
        );
        let sorted = g.sort();
        assert_eq!(
            leaf_scope(&g, &sorted, &PackageName::new("c")).unwrap(),
            set(&["b", "c"])
        );
        assert_eq!(
            leaf_scope(&g, &sorted, &PackageName::new("a")).unwrap(),
            set(&["a", "b", "c"])
        );
    }

    #[test]
    fn unknown_leaf_is_rejected() {
        let g = graph(&["a"], &[]);
        let err = leaf_scope(&g, &g.sort(), &PackageName::new("zzz")).unwrap_err();
        assert!(matches!(err, ValidationError::LeafNotInClosure { .. }));
    }
}
