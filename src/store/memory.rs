//! memory.rs
//! In-process triple store backed by oxigraph. Holds exactly the asserted
//! triples; no inference.

use super::types::{Binding, QueryOutcome, Row, StoreStats, Term, Triple};
use super::{Store, StoreError};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, Subject, Term as RdfTerm};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store as Dataset;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Default)]
pub struct MemoryStore {
    data_files: Vec<PathBuf>,
    dataset: Option<Dataset>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("data_files", &self.data_files)
            .field("initialized", &self.dataset.is_some())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// A store whose `initialize` loads the given Turtle files in order.
    pub fn with_data_files(data_files: Vec<PathBuf>) -> Self {
        Self { data_files, dataset: None }
    }

    /// An initialized store holding the triples of one Turtle document.
    pub fn from_turtle(text: &str) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.initialize()?;
        store.load_turtle(text)?;
        Ok(store)
    }

    pub fn data_files(&self) -> &[PathBuf] { &self.data_files }

    /// Snapshot of every triple in the default graph.
    pub fn triples(&self) -> Result<Vec<Triple>, StoreError> {
        let mut out = Vec::new();
        for quad in self.dataset()?.iter() {
            let quad = quad?;
            out.push(Triple::new(
                subject_term(&quad.subject),
                Term::iri(quad.predicate.as_str()),
                object_term(&quad.object),
            ));
        }
        Ok(out)
    }

    /// Loads one Turtle document and returns how many new triples it added.
    /// Blank node labels are local to the document.
    pub fn load_turtle(&mut self, text: &str) -> Result<usize, StoreError> {
        let dataset = self.dataset()?;
        let before = dataset.len()?;
        let parser = RdfParser::from_format(RdfFormat::Turtle).rename_blank_nodes();
        dataset.load_from_reader(parser, text.as_bytes())?;
        Ok(dataset.len()? - before)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize, StoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        let added = self.load_turtle(&text)?;
        debug!(file = %path.display(), added, "loaded data file");
        Ok(added)
    }

    fn dataset(&self) -> Result<&Dataset, StoreError> {
        self.dataset.as_ref().ok_or(StoreError::NotInitialized)
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str { "memory" }

    fn initialize(&mut self) -> Result<(), StoreError> {
        self.dataset = Some(Dataset::new()?);
        for path in self.data_files.clone() {
            self.load_file(&path)?;
        }
        Ok(())
    }

    fn query(&self, text: &str) -> Result<QueryOutcome, StoreError> {
        match self.dataset()?.query(text)? {
            QueryResults::Boolean(b) => Ok(QueryOutcome::Boolean(b)),
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution?;
                    let row: Row = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), Binding::text(plain_value(term))))
                        .collect();
                    rows.push(row);
                }
                Ok(QueryOutcome::Rows(rows))
            }
            QueryResults::Graph(_) => Err(StoreError::Protocol("CONSTRUCT and DESCRIBE results have no rows".into())),
        }
    }

    fn update(&mut self, text: &str) -> Result<i64, StoreError> {
        let dataset = self.dataset()?;
        let before = dataset.len()? as i64;
        dataset.update(text)?;
        Ok(dataset.len()? as i64 - before)
    }

    fn size(&self) -> Result<usize, StoreError> {
        Ok(self.dataset()?.len()?)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats { backend: self.backend(), triples: self.size()?, location: None })
    }
}

/// The IRI, the blank label, or the literal's lexical form.
fn plain_value(term: &RdfTerm) -> String {
    match term {
        RdfTerm::NamedNode(node) => node.as_str().to_string(),
        RdfTerm::BlankNode(node) => node.as_str().to_string(),
        RdfTerm::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

fn subject_term(subject: &Subject) -> Term {
    match subject {
        Subject::NamedNode(node) => Term::iri(node.as_str()),
        Subject::BlankNode(node) => Term::Blank(node.as_str().to_string()),
        #[allow(unreachable_patterns)]
        other => Term::Iri(other.to_string()),
    }
}

fn object_term(object: &RdfTerm) -> Term {
    match object {
        RdfTerm::NamedNode(node) => Term::iri(node.as_str()),
        RdfTerm::BlankNode(node) => Term::Blank(node.as_str().to_string()),
        RdfTerm::Literal(literal) => literal_term(literal),
        #[allow(unreachable_patterns)]
        other => Term::Iri(other.to_string()),
    }
}

fn literal_term(literal: &Literal) -> Term {
    match literal.language() {
        Some(tag) => Term::Literal { lexical: literal.value().to_string(), suffix: Some(format!("@{}", tag)) },
        None if literal.datatype() == xsd::STRING => Term::literal(literal.value()),
        None => Term::typed(literal.value(), literal.datatype().as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    const FAMILY: &str = r#"
        @prefix : <http://example.org/family#> .
        :alice :parentOf :bob , :carol .
        :bob :parentOf :dave .
        :carol :parentOf :erin .
    "#;

    const PREFIX: &str = "PREFIX : <http://example.org/family#>\n";

    fn family() -> MemoryStore {
        MemoryStore::from_turtle(FAMILY).unwrap()
    }

    fn rows(store: &MemoryStore, body: &str) -> Vec<Row> {
        store.query(&format!("{}{}", PREFIX, body)).unwrap().into_rows()
    }

    #[test]
    fn test_select_join() {
        let store = family();
        let result = rows(&store, "SELECT ?g ?c WHERE { ?g :parentOf ?p . ?p :parentOf ?c } ORDER BY ?c");
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["c"], Binding::text("http://example.org/family#dave"));
        assert_eq!(result[1]["g"], Binding::text("http://example.org/family#alice"));
    }

    #[rstest]
    #[case("ASK { :alice :parentOf :bob }", true)]
    #[case("ASK { :alice :grandparentOf :dave }", false)]
    #[case("ASK WHERE { ?x :parentOf ?y FILTER(?x = :carol) }", true)]
    fn test_ask(#[case] body: &str, #[case] expected: bool) {
        let outcome = family().query(&format!("{}{}", PREFIX, body)).unwrap();
        assert_eq!(outcome, QueryOutcome::Boolean(expected));
    }

    #[test]
    fn test_filter_not_equal_and_distinct() {
        let store = family();
        let siblings = rows(
            &store,
            "SELECT DISTINCT ?a ?b WHERE { ?p :parentOf ?a . ?p :parentOf ?b FILTER(?a != ?b) }",
        );
        assert_eq!(siblings.len(), 2);

        let parents = rows(&store, "SELECT DISTINCT ?p WHERE { ?p :parentOf ?c }");
        assert_eq!(parents.len(), 3);
    }

    #[test]
    fn test_insert_where_materializes_and_reports_delta() {
        let mut store = family();
        let script = format!("{}INSERT {{ ?g :grandparentOf ?c }} WHERE {{ ?g :parentOf ?p . ?p :parentOf ?c }}", PREFIX);
        assert_eq!(store.update(&script).unwrap(), 2);

        // Re-running adds nothing: the store is a set.
        assert_eq!(store.update(&script).unwrap(), 0);
    }

    #[rstest]
    #[case::not_exists(
        "INSERT { ?p :motherOf ?c } WHERE { ?p :parentOf ?c FILTER NOT EXISTS { ?p :gender :male } }",
        vec![":carol"]
    )]
    #[case::union(
        "INSERT { ?p :motherOf ?c } WHERE { { ?p :parentOf ?c . ?p :gender :female } UNION { ?c :hasMother ?p } }",
        vec![":carol", ":zoe"]
    )]
    #[case::optional(
        "INSERT { ?p :motherOf ?c } WHERE { ?p :parentOf ?c OPTIONAL { ?p :gender ?g } FILTER(!BOUND(?g) || ?g = :female) }",
        vec![":carol"]
    )]
    fn test_derivation_constructs(#[case] script: &str, #[case] mothers: Vec<&str>) {
        let mut store = MemoryStore::from_turtle(
            r#"@prefix : <http://example.org/family#> .
               :bob :parentOf :dave ; :gender :male .
               :carol :parentOf :erin ; :gender :female .
               :finn :hasMother :zoe ."#,
        )
        .unwrap();
        store.update(&format!("{}{}", PREFIX, script)).unwrap();

        let found: BTreeSet<String> = rows(&store, "SELECT DISTINCT ?m WHERE { ?m :motherOf ?x }")
            .into_iter()
            .map(|r| r["m"].to_string().replace("http://example.org/family#", ":"))
            .collect();
        let expected: BTreeSet<String> = mothers.into_iter().map(str::to_string).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_delete_and_insert_data_sequence() {
        let mut store = family();
        let delta = store
            .update(&format!(
                "{}DELETE DATA {{ :bob :parentOf :dave }} ; INSERT DATA {{ :x :parentOf :y . :x :parentOf :z }}",
                PREFIX
            ))
            .unwrap();
        assert_eq!(delta, 1);
        assert_eq!(store.size().unwrap(), 5);
    }

    #[test]
    fn test_long_strings_and_literals_load() {
        let store = MemoryStore::from_turtle(
            r#"@prefix : <http://example.org/family#> .
               @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
               :parentOf rdfs:comment """A parent
relation""" ; rdfs:label "parent"@en ; :arity 2 ."#,
        )
        .unwrap();
        assert_eq!(store.size().unwrap(), 3);

        let objects: Vec<Term> = store.triples().unwrap().into_iter().map(|t| t.object).collect();
        assert!(objects.contains(&Term::literal("A parent\nrelation")));
        assert!(objects.contains(&Term::Literal { lexical: "parent".into(), suffix: Some("@en".into()) }));
        assert!(objects.contains(&Term::typed("2", "http://www.w3.org/2001/XMLSchema#integer")));
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let mut store = family();
        assert!(matches!(store.update("INSERT { ?a"), Err(StoreError::Evaluation(_))));
        assert!(matches!(MemoryStore::from_turtle(":a :b"), Err(StoreError::Load(_))));
    }

    #[test]
    fn test_uninitialized_store_refuses_queries() {
        let store = MemoryStore::new();
        assert!(matches!(store.query("ASK { ?s ?p ?o }"), Err(StoreError::NotInitialized)));
        assert!(matches!(store.size(), Err(StoreError::NotInitialized)));
    }

    #[test]
    fn test_initialize_loads_files_and_reset_restores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("family.ttl");
        std::fs::write(&path, FAMILY).unwrap();

        let mut store = MemoryStore::with_data_files(vec![path]);
        store.initialize().unwrap();
        assert_eq!(store.size().unwrap(), 4);

        store.update(&format!("{}INSERT DATA {{ :a :b :c }}", PREFIX)).unwrap();
        assert_eq!(store.size().unwrap(), 5);

        store.reset().unwrap();
        assert_eq!(store.stats().unwrap().triples, 4);
    }

    #[test]
    fn test_missing_data_file() {
        let mut store = MemoryStore::with_data_files(vec![PathBuf::from("/nonexistent/data.ttl")]);
        assert!(matches!(store.initialize(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_blank_nodes_do_not_collide_across_documents() {
        let mut store = MemoryStore::from_turtle("_:x <http://p> <http://o1> .").unwrap();
        store.load_turtle("_:x <http://p> <http://o2> .").unwrap();
        let triples = store.triples().unwrap();
        let subjects: BTreeSet<&Term> = triples.iter().map(|t| &t.subject).collect();
        assert_eq!(subjects.len(), 2);
    }
}
