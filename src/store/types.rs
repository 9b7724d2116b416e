use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    /// `suffix` carries the language tag (`@en`) or datatype (`^^<iri>`) verbatim.
    Literal { lexical: String, suffix: Option<String> },
}

impl Term {
    pub fn iri(s: impl Into<String>) -> Self { Term::Iri(s.into()) }

    pub fn literal(s: impl Into<String>) -> Self {
        Term::Literal { lexical: s.into(), suffix: None }
    }

    pub fn typed(s: impl Into<String>, datatype: &str) -> Self {
        Term::Literal { lexical: s.into(), suffix: Some(format!("^^<{}>", datatype)) }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool { matches!(self, Term::Blank(_)) }

    /// The plain string form: the IRI, the blank label, or the literal's lexical form.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(s) | Term::Blank(s) => s,
            Term::Literal { lexical, .. } => lexical,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal { lexical, suffix } => {
                write!(f, "\"{}\"{}", lexical.replace('"', "\\\""), suffix.as_deref().unwrap_or(""))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self { subject, predicate, object }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A single bound value in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    Boolean(bool),
    Text(String),
}

impl Binding {
    pub fn text(s: impl Into<String>) -> Self { Binding::Text(s.into()) }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Boolean(b) => write!(f, "{}", b),
            Binding::Text(s) => f.write_str(s),
        }
    }
}

/// Variable name -> bound value.
pub type Row = BTreeMap<String, Binding>;

/// The variable name of the single row an ASK outcome is reported as.
pub const BOOLEAN_KEY: &str = "result";

/// What a store returns for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Boolean(bool),
}

impl QueryOutcome {
    /// Flattens to rows; an ASK outcome becomes `[{"result": b}]`.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            QueryOutcome::Boolean(b) => {
                vec![Row::from([(BOOLEAN_KEY.to_string(), Binding::Boolean(b))])]
            }
        }
    }
}

/// Size and identity of a store, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub backend: &'static str,
    pub triples: usize,
    pub location: Option<String>,
}
