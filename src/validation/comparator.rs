//! Order-insensitive comparison of query results against expectations.
use super::mismatch::Mismatch;
use crate::store::types::{Binding, Row, BOOLEAN_KEY};

/// The outcome of comparing one test's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub passed: bool,
    /// The normalized actual rows, in the order the store returned them.
    pub actual: Vec<Row>,
    pub mismatch: Option<Mismatch>,
}

/// Normalizes store output into the vocabulary of expected results and
/// compares the two as multisets of rows.
#[derive(Debug, Clone)]
pub struct ResultComparator {
    namespace: String,
}

impl ResultComparator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str { &self.namespace }

    /// A single boolean row passes through untouched. Every other value is
    /// stringified, and values inside the base namespace become `:local`.
    pub fn normalize(&self, rows: Vec<Row>) -> Vec<Row> {
        if rows.len() == 1 && rows[0].contains_key(BOOLEAN_KEY) {
            return rows;
        }
        rows.into_iter()
            .map(|row| row.into_iter().map(|(var, value)| (var, self.normalize_value(value))).collect())
            .collect()
    }

    fn normalize_value(&self, value: Binding) -> Binding {
        let text = value.to_string();
        match text.find(self.namespace.as_str()) {
            Some(start) if !self.namespace.is_empty() => {
                Binding::Text(format!(":{}", &text[start + self.namespace.len()..]))
            }
            _ => Binding::Text(text),
        }
    }

    /// Exact equality of the two row sets once both are put in canonical order.
    pub fn compare(&self, actual: &[Row], expected: &[Row]) -> bool {
        canonical(actual) == canonical(expected)
    }

    /// Normalizes `actual`, compares, and classifies any mismatch.
    pub fn evaluate(&self, actual: Vec<Row>, expected: &[Row]) -> Comparison {
        let actual = self.normalize(actual);
        let passed = self.compare(&actual, expected);
        let mismatch = (!passed).then(|| Mismatch::classify(expected, &actual));
        Comparison { passed, actual, mismatch }
    }
}

/// Rows sorted by their sorted key/value pairs; `Row` is a `BTreeMap`, so its
/// ordering already walks pairs in key order.
fn canonical(rows: &[Row]) -> Vec<&Row> {
    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort();
    sorted
}
