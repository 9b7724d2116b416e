//! Level (stratum) assignment by fixed-point propagation over the dependency relation.

use super::topology::CycleError;
use crate::graph::{DependencyGraph, RelationId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Depth of every relation: level 0 has no dependencies, and every other
/// relation sits one above its deepest dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stratification {
    pub levels: BTreeMap<RelationId, usize>,
    pub max_level: usize,
}

impl Stratification {
    pub fn level_of(&self, node: &RelationId) -> Option<usize> {
        self.levels.get(node).copied()
    }

    /// Relations grouped by level, each group in identifier order.
    pub fn by_level(&self) -> BTreeMap<usize, Vec<&RelationId>> {
        let mut grouped: BTreeMap<usize, Vec<&RelationId>> = BTreeMap::new();
        for (node, &level) in &self.levels {
            grouped.entry(level).or_default().push(node);
        }
        grouped
    }
}

/// Assigns levels without relying on any traversal order.
///
/// Each pass assigns every node whose dependencies are all assigned. An acyclic
/// graph settles within `node_count + 1` passes; exceeding that bound, or a pass
/// that assigns nothing while nodes remain, means a cycle.
pub fn stratify(graph: &DependencyGraph) -> Result<Stratification, CycleError> {
    let nodes = graph.nodes();
    let mut levels: BTreeMap<&RelationId, usize> = nodes
        .iter()
        .filter(|node| !graph.has_dependencies(node))
        .map(|&node| (node, 0))
        .collect();

    let max_passes = nodes.len() + 1;
    let mut passes = 0;
    while levels.len() < nodes.len() {
        passes += 1;
        let mut changed = false;

        for &node in &nodes {
            if levels.contains_key(node) {
                continue;
            }
            let resolved: Option<Vec<usize>> =
                graph.dependencies_of(node).map(|dep| levels.get(dep).copied()).collect();
            if let Some(dep_levels) = resolved {
                let deepest = dep_levels.into_iter().max().unwrap_or(0);
                levels.insert(node, deepest + 1);
                changed = true;
            }
        }

        if !changed || passes > max_passes {
            if let Some(&stuck) = nodes.iter().find(|node| !levels.contains_key(**node)) {
                return Err(CycleError::at(graph, stuck));
            }
            break;
        }
    }

    let max_level = levels.values().copied().max().unwrap_or(0);
    Ok(Stratification {
        levels: levels.into_iter().map(|(node, level)| (node.clone(), level)).collect(),
        max_level,
    })
}
