use crate::graph::{DependencyGraph, RelationId};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;
use thiserror::Error;

/// A dependency cycle makes both a total order and a level map impossible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cycle detected in dependency graph at '{node}' (cycle members: {})", display_members(.members))]
pub struct CycleError {
    /// The node whose visit closed the cycle.
    pub node: RelationId,
    /// Every node of the strongly connected component containing `node`, sorted.
    pub members: Vec<RelationId>,
}

fn display_members(members: &[RelationId]) -> String {
    members.iter().map(RelationId::short_name).collect::<Vec<_>>().join(", ")
}

impl CycleError {
    pub(crate) fn at(graph: &DependencyGraph, node: &RelationId) -> Self {
        Self { node: node.clone(), members: cycle_members(graph, node) }
    }
}

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns every node of `graph` such that each dependency appears before its
/// dependents. Dependencies are visited in identifier order, so the result is
/// reproducible. All traversal state is local to the call.
pub fn sort(graph: &DependencyGraph) -> Result<Vec<RelationId>, CycleError> {
    let nodes = graph.nodes();
    let mut order = Vec::with_capacity(nodes.len());
    let mut state: BTreeMap<&RelationId, VisitState> =
        nodes.iter().map(|&n| (n, VisitState::None)).collect();

    for &node in &nodes {
        if state[node] == VisitState::None {
            visit(node, graph, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit<'g>(
    node: &'g RelationId,
    graph: &'g DependencyGraph,
    state: &mut BTreeMap<&'g RelationId, VisitState>,
    order: &mut Vec<RelationId>,
) -> Result<(), CycleError> {
    match state.get(node).copied().unwrap_or(VisitState::None) {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => return Err(CycleError::at(graph, node)),
        VisitState::None => { state.insert(node, VisitState::Visiting); }
    }

    // BTreeSet iteration is already lexicographic.
    for dep in graph.dependencies_of(node) {
        visit(dep, graph, state, order)?;
    }

    state.insert(node, VisitState::Visited);
    order.push(node.clone());
    Ok(())
}

/// The strongly connected component containing `node`, used to locate a cycle.
fn cycle_members(graph: &DependencyGraph, node: &RelationId) -> Vec<RelationId> {
    let mut digraph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (dependent, dependency) in graph.edges() {
        digraph.add_edge(dependent.as_str(), dependency.as_str(), ());
    }

    let mut members: Vec<RelationId> = tarjan_scc(&digraph)
        .into_iter()
        .find(|component| component.contains(&node.as_str()))
        .unwrap_or_default()
        .into_iter()
        .map(RelationId::from)
        .collect();
    members.sort();
    members
}
