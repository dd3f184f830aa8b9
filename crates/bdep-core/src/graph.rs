//! Dependency graph over a closure, its cycles and its build order.
//!
//! Edges point from a consumer to the packages it requires. Nodes are
//! inserted in name order, so node indices, SCC discovery and the final
//! order are the same on every run for the same input.

use crate::closure::Closure;
use bdep_schema::PackageName;
use petgraph::algo::{condensation, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::{Direction, Graph};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Direct requirements between the members of a closure.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<PackageName, ()>,
    index: HashMap<PackageName, NodeIndex>,
}

impl DependencyGraph {
    /// A graph with the given nodes and no edges.
    pub fn new(members: impl IntoIterator<Item = PackageName>) -> Self {
        let sorted: BTreeSet<PackageName> = members.into_iter().collect();
        let mut graph = DiGraph::with_capacity(sorted.len(), 0);
        let mut index = HashMap::with_capacity(sorted.len());
        for name in sorted {
            let node = graph.add_node(name.clone());
            index.insert(name, node);
        }
        Self { graph, index }
    }

    /// Build the one-hop requirement graph of a closure from the facts it
    /// recorded. Requirements satisfied outside the closure are dropped.
    pub fn from_closure(closure: &Closure) -> Self {
        let members = closure.members();
        let mut graph = Self::new(members.iter().cloned());

        for consumer in &members {
            let Some(requirements) = closure.requirements(consumer) else {
                continue;
            };
            for dep in requirements {
                for provider in closure.providers(dep.as_str()).into_iter().flatten() {
                    graph.add_requirement(consumer, provider);
                }
            }
        }

        tracing::debug!(
            "Dependency graph: {} nodes, {} edges",
            graph.len(),
            graph.graph.edge_count()
        );
        graph
    }

    /// Record that `consumer` requires `requirement`.
    ///
    /// Self-requirements, repeated edges and names outside the graph are
    /// ignored; returns whether an edge was added.
    pub fn add_requirement(&mut self, consumer: &str, requirement: &str) -> bool {
        if consumer == requirement {
            return false;
        }
        let (Some(&from), Some(&to)) = (self.index.get(consumer), self.index.get(requirement))
        else {
            return false;
        };
        if self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether `name` is a node.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<PackageName> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<PackageName> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Direct requirements of `name`, in name order.
    pub fn requires(&self, name: &str) -> Vec<PackageName> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Members that directly require `name`, in name order.
    pub fn required_by(&self, name: &str) -> Vec<PackageName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// `start` and everything it transitively requires.
    ///
    /// Empty when `start` is not a node.
    pub fn downward_closure(&self, start: &str) -> BTreeSet<PackageName> {
        let mut reached = BTreeSet::new();
        let Some(&node) = self.index.get(start) else {
            return reached;
        };
        let mut dfs = Dfs::new(&self.graph, node);
        while let Some(n) = dfs.next(&self.graph) {
            reached.insert(self.graph[n].clone());
        }
        reached
    }

    /// Collapse cycles and order the result so that requirements come
    /// before their consumers.
    ///
    /// Among groups that are ready at the same time the one with the
    /// smallest member name goes first; members of a group are emitted in
    /// name order.
    pub fn sort(&self) -> SortedGraph {
        let mut cycles = HashMap::new();
        for component in tarjan_scc(&self.graph) {
            if component.len() < 2 {
                continue;
            }
            for &node in &component {
                let mut partners: Vec<PackageName> = component
                    .iter()
                    .filter(|&&other| other != node)
                    .map(|&other| self.graph[other].clone())
                    .collect();
                partners.sort();
                cycles.insert(self.graph[node].clone(), partners);
            }
        }

        let mut dag: Graph<Vec<PackageName>, ()> = condensation(self.graph.clone(), true);
        for group in dag.node_weights_mut() {
            group.sort();
        }

        // Kahn over the condensation: a group is ready once every group it
        // requires has been emitted.
        let mut pending: Vec<usize> = dag
            .node_indices()
            .map(|n| dag.neighbors_directed(n, Direction::Outgoing).count())
            .collect();
        let mut ready: BTreeMap<PackageName, NodeIndex> = dag
            .node_indices()
            .filter(|n| pending[n.index()] == 0)
            .filter_map(|n| dag[n].first().map(|name| (name.clone(), n)))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        let mut groups = Vec::with_capacity(dag.node_count());
        while let Some((_, group)) = ready.pop_first() {
            order.extend(dag[group].iter().cloned());
            groups.push(dag[group].clone());

            for consumer in dag.neighbors_directed(group, Direction::Incoming) {
                pending[consumer.index()] -= 1;
                if pending[consumer.index()] > 0 {
                    continue;
                }
                if let Some(name) = dag[consumer].first() {
                    ready.insert(name.clone(), consumer);
                }
            }
        }

        SortedGraph {
            order,
            groups,
            cycles,
        }
    }
}

/// A build order with its cycle groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedGraph {
    order: Vec<PackageName>,
    groups: Vec<Vec<PackageName>>,
    cycles: HashMap<PackageName, Vec<PackageName>>,
}

impl SortedGraph {
    /// Every node, requirements first.
    pub fn order(&self) -> &[PackageName] {
        &self.order
    }

    /// Strongly connected components in emission order, singletons included.
    pub fn groups(&self) -> &[Vec<PackageName>] {
        &self.groups
    }

    /// Other members of `name`'s cycle, empty when it is in none.
    pub fn cycle_members(&self, name: &str) -> &[PackageName] {
        self.cycles.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Position of `name` in the order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new(nodes.iter().map(|n| PackageName::new(n)));
        for (from, to) in edges {
            g.add_requirement(from, to);
        }
        g
    }

    fn names(items: &[&str]) -> Vec<PackageName> {
        items.iter().map(|s| PackageName::new(s)).collect()
    }

    #[test]
    fn chain_sorts_requirements_first() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let sorted = g.sort();
        assert_eq!(sorted.order(), names(&["c", "b", "a"]).as_slice());
        assert!(sorted.cycle_members("a").is_empty());
    }

    #[test]
    fn three_cycle_is_one_group() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let sorted = g.sort();
        assert_eq!(sorted.groups().len(), 1);
        assert_eq!(sorted.cycle_members("a"), names(&["b", "c"]).as_slice());
        assert_eq!(sorted.cycle_members("b"), names(&["a", "c"]).as_slice());
        assert_eq!(sorted.cycle_members("c"), names(&["a", "b"]).as_slice());
        assert_eq!(sorted.order(), names(&["a", "b", "c"]).as_slice());
    }

    #[test]
    fn cycle_partners_are_symmetric() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "e"), ("e", "c"), ("a", "c")],
        );
        let sorted = g.sort();
        for name in ["a", "b", "c", "d", "e"] {
            for partner in sorted.cycle_members(name) {
                assert!(sorted.cycle_members(partner).iter().any(|p| p == name));
            }
        }
        // {c,d,e} is required by {a,b}.
        assert!(sorted.position("e") < sorted.position("a"));
    }

    #[test]
    fn ties_break_on_name() {
        let g = graph(&["zlib", "bash", "make", "gcc"], &[("gcc", "make")]);
        let sorted = g.sort();
        assert_eq!(sorted.order(), names(&["bash", "make", "gcc", "zlib"]).as_slice());
    }

    #[test]
    fn every_edge_respects_the_order() {
        let edges = [
            ("app", "libfoo"),
            ("app", "libbar"),
            ("libfoo", "libc"),
            ("libbar", "libc"),
            ("libbar", "libfoo"),
            ("tool", "app"),
        ];
        let g = graph(&["app", "libbar", "libc", "libfoo", "tool"], &edges);
        let sorted = g.sort();
        for (consumer, requirement) in edges {
            assert!(sorted.position(requirement) < sorted.position(consumer));
        }
    }

    #[test]
    fn self_loops_and_strangers_are_ignored() {
        let mut g = graph(&["a", "b"], &[]);
        assert!(!g.add_requirement("a", "a"));
        assert!(!g.add_requirement("a", "zzz"));
        assert!(g.add_requirement("a", "b"));
        assert!(!g.add_requirement("a", "b"));
        assert_eq!(g.requires("a"), names(&["b"]));
        assert_eq!(g.required_by("b"), names(&["a"]));
    }

    #[test]
    fn downward_closure_follows_requirements_only() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("d", "a")],
        );
        let reached: Vec<PackageName> = g.downward_closure("b").into_iter().collect();
        assert_eq!(reached, names(&["b", "c"]));
        assert!(g.downward_closure("missing").is_empty());
    }
}
