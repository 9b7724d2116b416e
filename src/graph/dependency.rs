//! dependency.rs
//! Forward (dependent -> dependencies) and reverse (dependency -> dependents) maps.

use super::identifier::RelationId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The dependency relation between derived relations.
///
/// An edge `(A, B)` means "A cannot be materialized before B". Both maps are
/// ordered so every traversal over them is deterministic. Nodes that only ever
/// appear as a dependency have no entry in `dependencies`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependencies: BTreeMap<RelationId, BTreeSet<RelationId>>,
    dependents: BTreeMap<RelationId, BTreeSet<RelationId>>,
}

impl DependencyGraph {
    pub fn new() -> Self { Self::default() }

    /// Records that `dependent` depends on `dependency`. Re-inserting an edge is a no-op.
    pub fn add_edge(&mut self, dependent: RelationId, dependency: RelationId) -> bool {
        self.dependents
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
        self.dependencies.entry(dependent).or_default().insert(dependency)
    }

    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }

    pub fn is_empty(&self) -> bool { self.dependencies.is_empty() }

    /// Every node seen as a dependent or as a dependency, in identifier order.
    pub fn nodes(&self) -> BTreeSet<&RelationId> {
        self.dependencies
            .iter()
            .flat_map(|(node, deps)| std::iter::once(node).chain(deps.iter()))
            .collect()
    }

    pub fn node_count(&self) -> usize { self.nodes().len() }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of `node`, empty for roots and unknown nodes.
    pub fn dependencies_of(&self, node: &RelationId) -> impl Iterator<Item = &RelationId> {
        self.dependencies.get(node).into_iter().flatten()
    }

    /// Direct dependents of `node`.
    pub fn dependents_of(&self, node: &RelationId) -> impl Iterator<Item = &RelationId> {
        self.dependents.get(node).into_iter().flatten()
    }

    pub fn has_dependencies(&self, node: &RelationId) -> bool {
        self.dependencies.get(node).is_some_and(|deps| !deps.is_empty())
    }

    /// All `(dependent, dependency)` pairs in identifier order.
    pub fn edges(&self) -> impl Iterator<Item = (&RelationId, &RelationId)> {
        self.dependencies
            .iter()
            .flat_map(|(node, deps)| deps.iter().map(move |dep| (node, dep)))
    }

    pub fn dependency_map(&self) -> &BTreeMap<RelationId, BTreeSet<RelationId>> {
        &self.dependencies
    }
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, deps) in &self.dependencies {
            let names: Vec<&str> = deps.iter().map(RelationId::short_name).collect();
            let joined = if names.is_empty() { "(none)".to_string() } else { names.join(", ") };
            writeln!(f, "- {} depends on: {}", node.short_name(), joined)?;
        }
        Ok(())
    }
}
