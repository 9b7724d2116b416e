//! Turns chain and annotation declarations into a `DependencyGraph`.

use super::dependency::DependencyGraph;
use super::identifier::RelationId;
use crate::store::types::{Term, Triple, RDF_FIRST, RDF_NIL, RDF_REST};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const OWL_PROPERTY_CHAIN: &str = "http://www.w3.org/2002/07/owl#propertyChainAxiom";
pub const DEFAULT_NAMESPACE: &str = "http://example.org/family#";

/// A single declaration as yielded by a declaration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `relation` is the composition of `members`; only membership matters for ordering.
    Chain { relation: Term, members: Vec<Term> },
    /// `relation` explicitly depends on `dependency`.
    DependsOn { relation: Term, dependency: Term },
}

impl Declaration {
    pub fn chain(relation: &str, members: &[&str]) -> Self {
        Declaration::Chain {
            relation: Term::iri(relation),
            members: members.iter().map(|m| Term::iri(*m)).collect(),
        }
    }

    pub fn depends_on(relation: &str, dependency: &str) -> Self {
        Declaration::DependsOn { relation: Term::iri(relation), dependency: Term::iri(dependency) }
    }
}

/// Which predicates mark chain and annotation declarations in a triple graph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub chain_predicate: String,
    pub dependency_predicate: String,
}

impl ExtractionSettings {
    /// Settings whose annotation predicate is `materializationDependency` in `namespace`.
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            chain_predicate: OWL_PROPERTY_CHAIN.to_string(),
            dependency_predicate: format!("{}materializationDependency", namespace),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self { Self::for_namespace(DEFAULT_NAMESPACE) }
}

/// Merges both declaration forms into one dependency relation.
///
/// Each call to an `extract*` method starts from an empty graph, so the
/// extractor can be re-run against a changed source.
#[derive(Debug, Default)]
pub struct DeclarationExtractor {
    graph: DependencyGraph,
}

impl DeclarationExtractor {
    pub fn new() -> Self { Self::default() }

    pub fn graph(&self) -> &DependencyGraph { &self.graph }

    pub fn into_graph(self) -> DependencyGraph { self.graph }

    pub fn extract<I>(&mut self, declarations: I) -> &DependencyGraph
    where
        I: IntoIterator<Item = Declaration>,
    {
        self.graph.clear();
        for declaration in declarations {
            self.add(declaration);
        }
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "extracted dependency graph"
        );
        &self.graph
    }

    /// Reads declarations straight out of a triple set (see [`declarations_from_triples`]).
    pub fn extract_from_triples<'a, I>(&mut self, triples: I, settings: &ExtractionSettings) -> &DependencyGraph
    where
        I: IntoIterator<Item = &'a Triple>,
    {
        let declarations = declarations_from_triples(triples, settings);
        self.extract(declarations)
    }

    fn add(&mut self, declaration: Declaration) {
        match declaration {
            Declaration::Chain { relation, members } => {
                let Some(relation) = relation.as_iri().map(RelationId::new) else {
                    debug!(?relation, "skipping chain on a non-IRI relation");
                    return;
                };
                for member in members {
                    // Unresolved list cells and literals are not concrete relations.
                    if let Term::Iri(member) = member {
                        self.graph.add_edge(relation.clone(), RelationId::new(member));
                    }
                }
            }
            Declaration::DependsOn { relation, dependency } => {
                if let (Term::Iri(relation), Term::Iri(dependency)) = (relation, dependency) {
                    self.graph.add_edge(RelationId::new(relation), RelationId::new(dependency));
                }
            }
        }
    }
}

/// Collects chain and annotation declarations from a triple set.
///
/// A chain object must be the head of an RDF collection (a blank node); any
/// other object is skipped. A broken collection yields the members read before
/// the break.
pub fn declarations_from_triples<'a, I>(triples: I, settings: &ExtractionSettings) -> Vec<Declaration>
where
    I: IntoIterator<Item = &'a Triple>,
{
    let mut first: BTreeMap<&Term, &Term> = BTreeMap::new();
    let mut rest: BTreeMap<&Term, &Term> = BTreeMap::new();
    let mut chains = Vec::new();
    let mut annotations = Vec::new();

    for triple in triples {
        match triple.predicate.as_iri() {
            Some(RDF_FIRST) => { first.insert(&triple.subject, &triple.object); }
            Some(RDF_REST) => { rest.insert(&triple.subject, &triple.object); }
            Some(p) if p == settings.chain_predicate => chains.push(triple),
            Some(p) if p == settings.dependency_predicate => annotations.push(triple),
            _ => {}
        }
    }

    let mut declarations = Vec::with_capacity(chains.len() + annotations.len());
    for triple in chains {
        if !triple.object.is_blank() {
            continue;
        }
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut cell = &triple.object;
        while cell.as_iri() != Some(RDF_NIL) && seen.insert(cell) {
            let Some(member) = first.get(cell) else { break };
            members.push((*member).clone());
            let Some(next) = rest.get(cell) else { break };
            cell = *next;
        }
        declarations.push(Declaration::Chain { relation: triple.subject.clone(), members });
    }
    for triple in annotations {
        declarations.push(Declaration::DependsOn {
            relation: triple.subject.clone(),
            dependency: triple.object.clone(),
        });
    }
    declarations
}
