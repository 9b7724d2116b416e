//! Diagnostic classification of a failed comparison.
use crate::store::Row;
use serde::Serialize;
use std::fmt;

/// Why an actual result set differs from the expected one.
///
/// Diagnostic only: pass/fail is decided by exact set equality, never by this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// Nothing came back although rows were expected; usually a missing derivation.
    NotInferred,
    /// Fewer rows than expected.
    Partial { missing: Vec<Row> },
    /// More rows than expected.
    TooMany { extra: Vec<Row> },
    /// Same number of rows, different values.
    ContentDiffers,
}

impl Mismatch {
    pub(crate) fn classify(expected: &[Row], actual: &[Row]) -> Self {
        if actual.is_empty() && !expected.is_empty() {
            Mismatch::NotInferred
        } else if actual.len() < expected.len() {
            let missing = expected.iter().filter(|row| !actual.contains(row)).cloned().collect();
            Mismatch::Partial { missing }
        } else if actual.len() > expected.len() {
            let extra = actual.iter().filter(|row| !expected.contains(row)).cloned().collect();
            Mismatch::TooMany { extra }
        } else {
            Mismatch::ContentDiffers
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::NotInferred => write!(f, "no results returned (relation not inferred or materialized)"),
            Mismatch::Partial { missing } => write!(f, "partial results, {} expected row(s) missing", missing.len()),
            Mismatch::TooMany { extra } => write!(f, "too many results, {} unexpected row(s)", extra.len()),
            Mismatch::ContentDiffers => write!(f, "results differ in content (check value formatting and prefixes)"),
        }
    }
}
