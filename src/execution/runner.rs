//! Runs test cases against a store and records per-test outcomes.
use super::suite::{TestCase, TestId, TestSuite};
use super::ConfigError;
use crate::store::{Row, Store};
use crate::validation::{Mismatch, ResultComparator};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub status: TestStatus,
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
}

/// Aggregate of a batch of tests. `failed` counts both FAIL and ERROR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResults {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub details: BTreeMap<TestId, TestRecord>,
}

impl RunResults {
    pub fn new() -> Self { Self::default() }

    /// Adds one outcome. Recording an id again replaces its earlier outcome.
    pub fn record(&mut self, id: TestId, record: TestRecord) {
        let status = record.status;
        if let Some(previous) = self.details.insert(id, record) {
            self.uncount(previous.status);
        }
        self.total += 1;
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail | TestStatus::Error => self.failed += 1,
        }
    }

    fn uncount(&mut self, status: TestStatus) {
        self.total -= 1;
        match status {
            TestStatus::Pass => self.passed -= 1,
            TestStatus::Fail | TestStatus::Error => self.failed -= 1,
        }
    }

    /// The subset of these results belonging to `ids`.
    pub fn subset<'a, I>(&self, ids: I) -> RunResults
    where
        I: IntoIterator<Item = &'a TestId>,
    {
        let mut out = RunResults::new();
        for id in ids {
            if let Some(record) = self.details.get(id) {
                out.record(id.clone(), record.clone());
            }
        }
        out
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TestId, &TestRecord)> {
        self.details.iter().filter(|(_, r)| r.status != TestStatus::Pass)
    }

    pub fn all_passed(&self) -> bool { self.failed == 0 }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

pub struct TestRunner {
    suite: TestSuite,
    comparator: ResultComparator,
}

impl TestRunner {
    pub fn new(suite: TestSuite, namespace: &str) -> Self {
        Self { suite, comparator: ResultComparator::new(namespace) }
    }

    pub fn suite(&self) -> &TestSuite { &self.suite }

    /// Runs `ids` once each, or the whole suite, in dot-numeric order.
    ///
    /// Unknown ids are rejected before any query is sent.
    pub fn run_tests(&self, store: &dyn Store, ids: Option<&[TestId]>) -> Result<RunResults, ConfigError> {
        match ids {
            Some(ids) => {
                self.suite.check_ids(ids.iter())?;
                let unique: BTreeSet<&TestId> = ids.iter().collect();
                Ok(self.run_selected(store, unique))
            }
            None => Ok(self.run_selected(store, self.suite.ids())),
        }
    }

    /// Runs ids already known to exist; anything else is skipped.
    pub(crate) fn run_selected<'a, I>(&self, store: &dyn Store, ids: I) -> RunResults
    where
        I: IntoIterator<Item = &'a TestId>,
    {
        let mut results = RunResults::new();
        for id in ids {
            if let Some(case) = self.suite.get(id) {
                results.record(id.clone(), self.run_test(store, id, case));
            }
        }
        results
    }

    pub fn run_test(&self, store: &dyn Store, id: &TestId, case: &TestCase) -> TestRecord {
        let query = self.ensure_prefix(case.query.trim());
        let outcome = match store.query(&query) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(test = %id, error = %e, "test query failed");
                return TestRecord {
                    status: TestStatus::Error,
                    name: case.name.clone(),
                    message: e.to_string(),
                    expected: None,
                    actual: None,
                    mismatch: None,
                };
            }
        };

        let comparison = self.comparator.evaluate(outcome.into_rows(), &case.expected);
        if comparison.passed {
            debug!(test = %id, name = %case.name, "PASS");
            return TestRecord {
                status: TestStatus::Pass,
                name: case.name.clone(),
                message: "All assertions passed".into(),
                expected: None,
                actual: None,
                mismatch: None,
            };
        }

        let message = comparison
            .mismatch
            .as_ref()
            .map_or_else(|| "Results do not match expected values".to_string(), ToString::to_string);
        warn!(test = %id, name = %case.name, reason = %message, "FAIL");
        TestRecord {
            status: TestStatus::Fail,
            name: case.name.clone(),
            message,
            expected: Some(case.expected.clone()),
            actual: Some(comparison.actual),
            mismatch: comparison.mismatch,
        }
    }

    /// Prepends the base namespace as the default prefix unless one is declared.
    fn ensure_prefix(&self, query: &str) -> String {
        if query.contains("PREFIX :") {
            query.to_string()
        } else {
            format!("PREFIX : <{}>\n{}", self.comparator.namespace(), query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const NS: &str = "http://example.org/family#";

    const DATA: &str = r#"
        @prefix : <http://example.org/family#> .
        :alice :parentOf :bob , :carol .
    "#;

    const SUITE: &str = r#"{"tests": {
        "0.10": {"name": "alice is a parent", "query": "ASK { :alice :parentOf :bob }", "expected": [{"result": true}]},
        "0.2": {"name": "children", "query": "SELECT ?c WHERE { :alice :parentOf ?c }",
                "expected": [{"c": ":carol"}, {"c": ":bob"}]},
        "1.1": {"name": "grandchildren", "query": "SELECT ?g WHERE { ?g :grandparentOf ?c }",
                "expected": [{"g": ":alice"}]},
        "1.2": {"name": "broken", "query": "SELECT WHERE {", "expected": []}
    }}"#;

    fn runner() -> TestRunner {
        TestRunner::new(TestSuite::from_json(SUITE).unwrap(), NS)
    }

    fn id(s: &str) -> TestId { TestId::parse(s).unwrap() }

    #[test]
    fn test_run_all_in_dot_numeric_order() {
        let store = MemoryStore::from_turtle(DATA).unwrap();
        let results = runner().run_tests(&store, None).unwrap();

        assert_eq!(results.total, 4);
        assert_eq!(results.passed, 2);
        assert_eq!(results.failed, 2);
        let order: Vec<&str> = results.details.keys().map(TestId::as_str).collect();
        assert_eq!(order, vec!["0.2", "0.10", "1.1", "1.2"]);

        let missing = &results.details[&id("1.1")];
        assert_eq!(missing.status, TestStatus::Fail);
        assert_eq!(missing.mismatch, Some(Mismatch::NotInferred));
        assert_eq!(results.details[&id("1.2")].status, TestStatus::Error);
    }

    #[test]
    fn test_unknown_id_rejected_before_running() {
        let store = MemoryStore::from_turtle(DATA).unwrap();
        let err = runner().run_tests(&store, Some(&[id("0.2"), id("7.7")][..])).unwrap_err();
        assert!(err.to_string().contains("7.7"), "{}", err);
    }

    #[test]
    fn test_repeated_ids_run_once() {
        let store = MemoryStore::from_turtle(DATA).unwrap();
        let results = runner().run_tests(&store, Some(&[id("0.2"), id("1.1"), id("0.2")][..])).unwrap();
        assert_eq!((results.total, results.passed, results.failed), (2, 1, 1));
        assert_eq!(results.details.len(), results.total);
    }

    #[test]
    fn test_record_replaces_earlier_outcome() {
        let store = MemoryStore::from_turtle(DATA).unwrap();
        let runner = runner();
        let case = runner.suite().get(&id("1.1")).unwrap();
        let mut results = RunResults::new();
        results.record(id("1.1"), runner.run_test(&store, &id("1.1"), case));
        results.record(id("1.1"), runner.run_test(&store, &id("1.1"), case));
        assert_eq!((results.total, results.passed, results.failed), (1, 0, 1));
    }

    #[test]
    fn test_explicit_prefix_is_kept() {
        let runner = runner();
        let query = "PREFIX : <http://other.org/ns#>\nASK { :x :y :z }";
        assert_eq!(runner.ensure_prefix(query), query);
        assert!(runner.ensure_prefix("ASK { :x :y :z }").starts_with("PREFIX : <http://example.org/family#>"));
    }

    #[test]
    fn test_subset_and_save() {
        let store = MemoryStore::from_turtle(DATA).unwrap();
        let results = runner().run_tests(&store, None).unwrap();
        let level_zero = results.subset([id("0.2"), id("0.10")].iter());
        assert_eq!((level_zero.total, level_zero.passed), (2, 2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_results.json");
        results.save(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["details"]["1.1"]["status"], "FAIL");
        assert_eq!(json["details"]["1.1"]["mismatch"]["kind"], "not_inferred");
        assert_eq!(json["details"]["0.2"]["status"], "PASS");
    }
}
