//! Presentation of an analysis keyed by short relation names.
//!
//! Short names are only unique by convention, so every report is built through
//! [`short_names`], which refuses to merge two identifiers that share a suffix.

use super::levels::Stratification;
use super::AnalysisError;
use crate::graph::{DependencyGraph, RelationId};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::path::Path;

/// Maps each identifier to its short name, failing on the first collision.
pub fn short_names<'a, I>(ids: I) -> Result<BTreeMap<&'a RelationId, &'a str>, AnalysisError>
where
    I: IntoIterator<Item = &'a RelationId>,
{
    let mut owners: BTreeMap<&str, &RelationId> = BTreeMap::new();
    let mut names = BTreeMap::new();
    for id in ids {
        let short = id.short_name();
        match owners.get(short) {
            Some(&owner) if owner != id => {
                return Err(AnalysisError::ShortNameCollision {
                    short_name: short.to_string(),
                    first: owner.clone(),
                    second: id.clone(),
                });
            }
            _ => {
                owners.insert(short, id);
                names.insert(id, short);
            }
        }
    }
    Ok(names)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub level: usize,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

/// `source` must be materialized before `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
}

/// Key of `levels_ordered`: orders numerically, serializes as `level_{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LevelKey(pub usize);

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level_{}", self.0)
    }
}

impl Serialize for LevelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// JSON-ready dump of the graph and its levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub nodes: BTreeMap<String, NodeReport>,
    pub relationships: Vec<Relationship>,
    pub levels: BTreeMap<String, usize>,
    pub levels_ordered: BTreeMap<LevelKey, Vec<String>>,
    pub max_level: usize,
}

impl GraphReport {
    pub fn build(graph: &DependencyGraph, strata: &Stratification) -> Result<Self, AnalysisError> {
        let nodes = graph.nodes();
        let names = short_names(nodes.iter().copied())?;
        let name = |id: &RelationId| names.get(id).map_or_else(|| id.short_name().to_string(), |s| s.to_string());

        let mut node_reports = BTreeMap::new();
        let mut levels = BTreeMap::new();
        for &id in &nodes {
            let level = strata.level_of(id).unwrap_or(0);
            levels.insert(name(id), level);
            node_reports.insert(
                name(id),
                NodeReport {
                    level,
                    dependencies: graph.dependencies_of(id).map(name).collect(),
                    dependents: graph.dependents_of(id).map(name).collect(),
                },
            );
        }

        let relationships = graph
            .edges()
            .map(|(dependent, dependency)| Relationship { source: name(dependency), target: name(dependent) })
            .collect();

        let levels_ordered = strata
            .by_level()
            .into_iter()
            .map(|(level, ids)| {
                let mut group: Vec<String> = ids.into_iter().map(name).collect();
                group.sort();
                (LevelKey(level), group)
            })
            .collect();

        Ok(Self {
            nodes: node_reports,
            relationships,
            levels,
            levels_ordered,
            max_level: strata.max_level,
        })
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), AnalysisError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// The materialization order grouped by level, one `- short (full)` line per relation.
pub fn ordered_relationships(order: &[RelationId], strata: &Stratification) -> Result<String, AnalysisError> {
    short_names(order.iter())?;

    let mut grouped: BTreeMap<usize, Vec<&RelationId>> = BTreeMap::new();
    for id in order {
        grouped.entry(strata.level_of(id).unwrap_or(0)).or_default().push(id);
    }

    let mut out = String::new();
    write_levels(&mut out, grouped)?;
    Ok(out)
}

fn write_levels(out: &mut String, grouped: BTreeMap<usize, Vec<&RelationId>>) -> fmt::Result {
    writeln!(out, "# Ordered Relationships by Dependency Level\n")?;
    for (level, mut ids) in grouped {
        if level == 0 {
            writeln!(out, "## Level 0 (Base relationships - no dependencies)")?;
        } else {
            writeln!(out, "## Level {} (Dependency Depth: {})", level, level)?;
        }
        ids.sort();
        for id in ids {
            writeln!(out, "- {} ({})", id.short_name(), id)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One `- short depends on: a, b` line per dependent, after the short-name check.
pub fn dependency_summary(graph: &DependencyGraph) -> Result<String, AnalysisError> {
    short_names(graph.nodes())?;
    Ok(graph.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::levels::stratify;
    use crate::analysis::topology::sort;

    const NS: &str = "http://example.org/family#";

    fn family_graph() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let id = |s: &str| RelationId::new(format!("{}{}", NS, s));
        g.add_edge(id("grandparentOf"), id("parentOf"));
        g.add_edge(id("siblingOf"), id("parentOf"));
        g.add_edge(id("uncleOf"), id("siblingOf"));
        g
    }

    #[test]
    fn test_graph_report_shape() {
        let g = family_graph();
        let strata = stratify(&g).unwrap();
        let report = GraphReport::build(&g, &strata).unwrap();

        assert_eq!(report.nodes["parentOf"].level, 0);
        assert_eq!(report.nodes["parentOf"].dependents, vec!["grandparentOf", "siblingOf"]);
        assert_eq!(report.nodes["uncleOf"].dependencies, vec!["siblingOf"]);
        assert_eq!(report.levels_ordered[&LevelKey(1)], vec!["grandparentOf", "siblingOf"]);
        assert!(report.relationships.contains(&Relationship {
            source: "siblingOf".into(),
            target: "uncleOf".into(),
        }));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["max_level"], 2);
    }

    #[test]
    fn test_levels_ordered_sorts_numerically() {
        let mut g = DependencyGraph::new();
        let id = |n: usize| RelationId::new(format!("{}r{}", NS, n));
        for n in 1..=11 {
            g.add_edge(id(n), id(n - 1));
        }
        let strata = stratify(&g).unwrap();
        let report = GraphReport::build(&g, &strata).unwrap();

        let keys: Vec<usize> = report.levels_ordered.keys().map(|k| k.0).collect();
        assert_eq!(keys, (0..=11).collect::<Vec<_>>());

        let json = report.to_json().unwrap();
        let position = |key: &str| json.find(&format!("\"{}\"", key)).unwrap();
        assert!(position("level_2") < position("level_10"), "{}", json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["levels_ordered"]["level_10"], serde_json::json!(["r10"]));
    }

    #[test]
    fn test_short_name_collision_is_reported() {
        let mut g = DependencyGraph::new();
        g.add_edge(RelationId::new("http://a.org/ns#knows"), RelationId::new("http://b.org/ns#knows"));
        let strata = stratify(&g).unwrap();

        let err = GraphReport::build(&g, &strata).unwrap_err();
        match err {
            AnalysisError::ShortNameCollision { short_name, .. } => assert_eq!(short_name, "knows"),
            other => panic!("Wrong error type: {:?}", other),
        }
    }

    #[test]
    fn test_ordered_relationships_text() {
        let g = family_graph();
        let order = sort(&g).unwrap();
        let strata = stratify(&g).unwrap();

        let text = ordered_relationships(&order, &strata).unwrap();
        let expected_level_1 = format!(
            "## Level 1 (Dependency Depth: 1)\n- grandparentOf ({ns}grandparentOf)\n- siblingOf ({ns}siblingOf)\n",
            ns = NS
        );
        assert!(text.contains("## Level 0 (Base relationships - no dependencies)"));
        assert!(text.contains(&expected_level_1), "{}", text);
    }

    #[test]
    fn test_dependency_summary_lines() {
        let summary = dependency_summary(&family_graph()).unwrap();
        assert!(summary.contains("- uncleOf depends on: siblingOf\n"), "{}", summary);
        assert!(!summary.contains("- parentOf depends on"));
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("graph_data.json");
        let g = family_graph();
        let strata = stratify(&g).unwrap();

        GraphReport::build(&g, &strata).unwrap().save(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"levels_ordered\""));
    }
}
