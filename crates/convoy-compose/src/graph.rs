//! The compose graph: containers keyed by label plus their link edges.
//!
//! An edge means "consumer depends on provider; the provider must exist and
//! start first". Ordering is an explicit algorithmic property: a stable
//! topological sort whose ties are broken by declaration order, so runs are
//! deterministic across identical configurations.

use std::collections::{BTreeSet, HashMap};

use convoy_common::error::{ConvoyError, Result};
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;

use crate::descriptor::ContainerDescriptor;

/// Link edges keyed by `(consumer, provider)` labels.
pub type LinkSet = BTreeSet<(String, String)>;

/// Keyed collection of container descriptors with their link graph.
#[derive(Debug, Default)]
pub struct ComposeGraph {
    containers: Vec<ContainerDescriptor>,
    index: HashMap<String, usize>,
    links: LinkSet,
}

impl ComposeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of containers in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns whether the graph holds no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Returns whether a label is present.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Labels in declaration order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.containers.iter().map(|d| d.label.as_str()).collect()
    }

    /// Iterates descriptors in declaration order.
    pub fn containers(&self) -> impl Iterator<Item = &ContainerDescriptor> {
        self.containers.iter()
    }

    /// Looks up a descriptor by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&ContainerDescriptor> {
        self.index.get(label).map(|&at| &self.containers[at])
    }

    /// Looks up a descriptor mutably by label.
    #[must_use]
    pub fn get_mut(&mut self, label: &str) -> Option<&mut ContainerDescriptor> {
        self.index.get(label).map(|&at| &mut self.containers[at])
    }

    /// Inserts a descriptor by label.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoyError::DuplicateLabel`] if the label already exists.
    pub fn add_container(&mut self, descriptor: ContainerDescriptor) -> Result<()> {
        if self.contains(&descriptor.label) {
            return Err(ConvoyError::DuplicateLabel {
                label: descriptor.label,
            });
        }
        let _ = self
            .index
            .insert(descriptor.label.clone(), self.containers.len());
        self.containers.push(descriptor);
        Ok(())
    }

    /// Resolves every declared link to a container in the graph and checks
    /// the result for cycles, so a cyclic configuration fails here rather
    /// than at start time.
    ///
    /// The edge set is recomputed from the current descriptors, which makes
    /// repeated calls idempotent and safe to interleave with incremental
    /// additions. Reconciled entries are exempt: their declared links may
    /// point outside the loaded configuration (an out-of-band process may
    /// have started them) and contribute no edges.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoyError::UnresolvedLink`] for the first link naming a
    /// missing target, or [`ConvoyError::CyclicLink`] naming the cycle's
    /// members.
    pub fn link_containers(&mut self) -> Result<()> {
        let mut resolved = LinkSet::new();
        for descriptor in &self.containers {
            if descriptor.reconciled {
                continue;
            }
            for target in descriptor.link_targets() {
                if !self.contains(target) {
                    return Err(ConvoyError::UnresolvedLink {
                        container: descriptor.label.clone(),
                        target: target.to_string(),
                    });
                }
                let _ = resolved.insert((descriptor.label.clone(), target.to_string()));
            }
        }
        self.links = resolved;
        let _ = self.start_order()?;
        tracing::debug!(edges = self.links.len(), "link graph resolved");
        Ok(())
    }

    /// The resolved link edges as `(consumer, provider)` label pairs.
    #[must_use]
    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    /// Labels this container directly depends on.
    #[must_use]
    pub fn providers_of(&self, label: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|(consumer, _)| consumer.as_str() == label)
            .map(|(_, provider)| provider.as_str())
            .collect()
    }

    /// Topological start ordering: providers before consumers, ties broken
    /// by declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoyError::CyclicLink`] if the link graph has a cycle.
    pub fn start_order(&self) -> Result<Vec<String>> {
        let graph = self.link_graph();
        let count = graph.node_count();
        let mut blocking: Vec<usize> = (0..count)
            .map(|at| {
                graph
                    .neighbors_directed(NodeIndex::new(at), Direction::Incoming)
                    .count()
            })
            .collect();
        let mut placed = vec![false; count];
        let mut order = Vec::with_capacity(count);

        while let Some(next) = (0..count).find(|&at| !placed[at] && blocking[at] == 0) {
            placed[next] = true;
            for dependent in graph.neighbors_directed(NodeIndex::new(next), Direction::Outgoing) {
                blocking[dependent.index()] -= 1;
            }
            if let Some(label) = graph.node_weight(NodeIndex::new(next)) {
                order.push(label.clone());
            }
        }

        if order.len() < count {
            return Err(ConvoyError::CyclicLink {
                members: cycle_members(&graph),
            });
        }
        Ok(order)
    }

    /// The exact reverse of [`ComposeGraph::start_order`]: consumers before
    /// providers, for stop, kill, and delete.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoyError::CyclicLink`] if the link graph has a cycle.
    pub fn stop_order(&self) -> Result<Vec<String>> {
        let mut order = self.start_order()?;
        order.reverse();
        Ok(order)
    }

    /// Removes a container by label, dropping its edges and preserving the
    /// declaration order of the remainder.
    pub fn remove(&mut self, label: &str) -> Option<ContainerDescriptor> {
        let at = self.index.remove(label)?;
        let descriptor = self.containers.remove(at);
        self.index = self
            .containers
            .iter()
            .enumerate()
            .map(|(position, d)| (d.label.clone(), position))
            .collect();
        self.links
            .retain(|(consumer, provider)| consumer != label && provider != label);
        Some(descriptor)
    }

    /// Builds the petgraph view with edges pointing provider → consumer so
    /// a topological sort yields providers first. Node indices follow
    /// declaration order.
    fn link_graph(&self) -> petgraph::Graph<String, ()> {
        let mut graph = petgraph::Graph::new();
        let mut nodes = HashMap::new();
        for descriptor in &self.containers {
            let node = graph.add_node(descriptor.label.clone());
            let _ = nodes.insert(descriptor.label.as_str(), node);
        }
        for (consumer, provider) in &self.links {
            if let (Some(&from), Some(&to)) =
                (nodes.get(provider.as_str()), nodes.get(consumer.as_str()))
            {
                let _ = graph.add_edge(from, to, ());
            }
        }
        graph
    }
}

/// Names the members of one cycle, in declaration order. A self-link is a
/// one-member cycle.
fn cycle_members(graph: &petgraph::Graph<String, ()>) -> Vec<String> {
    for component in tarjan_scc(graph) {
        let cyclic = component.len() > 1
            || component
                .iter()
                .any(|&node| graph.find_edge(node, node).is_some());
        if cyclic {
            let mut indices: Vec<usize> = component.iter().map(|&node| node.index()).collect();
            indices.sort_unstable();
            return indices
                .into_iter()
                .filter_map(|at| graph.node_weight(NodeIndex::new(at)).cloned())
                .collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ContainerDescriptor;

    fn container(label: &str, links: &[&str]) -> ContainerDescriptor {
        let mut descriptor = ContainerDescriptor::new(label, format!("test_{label}_1"));
        descriptor.links = links.iter().map(|&l| l.to_string()).collect();
        descriptor
    }

    fn graph_of(entries: &[(&str, &[&str])]) -> ComposeGraph {
        let mut graph = ComposeGraph::new();
        for (label, links) in entries {
            graph
                .add_container(container(label, links))
                .expect("should add");
        }
        graph
    }

    #[test]
    fn empty_graph_resolves_to_empty_order() {
        let mut graph = ComposeGraph::new();
        graph.link_containers().expect("should link");
        assert!(graph.start_order().expect("should order").is_empty());
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut graph = graph_of(&[("web", &[])]);
        let err = graph.add_container(container("web", &[])).unwrap_err();
        assert!(matches!(err, ConvoyError::DuplicateLabel { .. }), "got: {err}");
    }

    #[test]
    fn providers_sort_before_consumers() {
        let mut graph = graph_of(&[("web", &["db"]), ("db", &[])]);
        graph.link_containers().expect("should link");
        assert_eq!(graph.start_order().expect("should order"), vec!["db", "web"]);
        assert_eq!(graph.stop_order().expect("should order"), vec!["web", "db"]);
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let mut graph = graph_of(&[("c", &[]), ("a", &[]), ("b", &[])]);
        graph.link_containers().expect("should link");
        assert_eq!(graph.start_order().expect("should order"), vec!["c", "a", "b"]);
    }

    #[test]
    fn diamond_orders_every_provider_first() {
        let mut graph = graph_of(&[
            ("api", &["db", "cache"]),
            ("db", &["disk"]),
            ("cache", &["disk"]),
            ("disk", &[]),
        ]);
        graph.link_containers().expect("should link");
        let order = graph.start_order().expect("should order");
        let pos = |label: &str| order.iter().position(|l| l == label).expect(label);
        assert!(pos("disk") < pos("db"));
        assert!(pos("disk") < pos("cache"));
        assert!(pos("db") < pos("api"));
        assert!(pos("cache") < pos("api"));
        // db declared before cache, both ready after disk
        assert!(pos("db") < pos("cache"));
    }

    #[test]
    fn linking_twice_produces_identical_edges() {
        let mut graph = graph_of(&[("web", &["db", "db:alias"]), ("db", &[])]);
        graph.link_containers().expect("should link");
        let first = graph.links().clone();
        graph.link_containers().expect("should link again");
        assert_eq!(&first, graph.links());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn linking_stays_idempotent_across_additions() {
        let mut graph = graph_of(&[("db", &[])]);
        graph.link_containers().expect("should link");
        graph
            .add_container(container("web", &["db"]))
            .expect("should add");
        graph.link_containers().expect("should relink");
        assert!(graph.links().contains(&("web".into(), "db".into())));
        assert_eq!(graph.links().len(), 1);
    }

    #[test]
    fn unresolved_link_names_container_and_target() {
        let mut graph = graph_of(&[("web", &["ghost"])]);
        let err = graph.link_containers().unwrap_err();
        match err {
            ConvoyError::UnresolvedLink { container, target } => {
                assert_eq!(container, "web");
                assert_eq!(target, "ghost");
            }
            other => panic!("expected UnresolvedLink, got {other}"),
        }
    }

    #[test]
    fn two_node_cycle_fails_at_link_time() {
        let mut graph = graph_of(&[("a", &["b"]), ("b", &["a"])]);
        let err = graph.link_containers().unwrap_err();
        match err {
            ConvoyError::CyclicLink { members } => assert_eq!(members, vec!["a", "b"]),
            other => panic!("expected CyclicLink, got {other}"),
        }
    }

    #[test]
    fn self_link_is_a_one_member_cycle() {
        let mut graph = graph_of(&[("loner", &["loner"])]);
        let err = graph.link_containers().unwrap_err();
        match err {
            ConvoyError::CyclicLink { members } => assert_eq!(members, vec!["loner"]),
            other => panic!("expected CyclicLink, got {other}"),
        }
    }

    #[test]
    fn reconciled_entries_are_validation_leaves() {
        let mut graph = graph_of(&[("web", &[])]);
        let mut stray = container("worker", &["queue"]);
        stray.reconciled = true;
        graph.add_container(stray).expect("should add");
        graph.link_containers().expect("reconciled links are tolerated");
        assert!(graph.links().is_empty());
    }

    #[test]
    fn declared_containers_may_link_to_reconciled_ones() {
        let mut graph = ComposeGraph::new();
        let mut live = container("db", &[]);
        live.reconciled = true;
        graph.add_container(live).expect("should add");
        graph
            .add_container(container("web", &["db"]))
            .expect("should add");
        graph.link_containers().expect("should link");
        assert_eq!(graph.start_order().expect("should order"), vec!["db", "web"]);
    }

    #[test]
    fn remove_drops_edges_and_preserves_order() {
        let mut graph = graph_of(&[("web", &["db"]), ("db", &[]), ("cache", &[])]);
        graph.link_containers().expect("should link");
        let removed = graph.remove("web").expect("web should exist");
        assert_eq!(removed.label, "web");
        assert!(graph.links().is_empty());
        assert_eq!(graph.labels(), vec!["db", "cache"]);
        assert!(graph.remove("web").is_none());
    }
}
