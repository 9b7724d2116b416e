//! Test case definitions keyed by dot-numeric identifiers.
use super::ConfigError;
use crate::store::Row;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A dot-separated numeric identifier such as `0.1.4`.
///
/// Ordering compares components as integers, so `0.2` sorts before `0.10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestId {
    raw: String,
    components: Vec<u64>,
}

impl TestId {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let components = raw
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::InvalidTestId(raw.to_string()))?;
        Ok(Self { raw: raw.to_string(), components })
    }

    pub fn as_str(&self) -> &str { &self.raw }
}

impl Ord for TestId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for TestId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

impl Serialize for TestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub query: String,
    /// Rows of variable -> value, or the single `{"result": bool}` row for ASK.
    pub expected: Vec<Row>,
}

#[derive(Deserialize)]
struct SuiteFile {
    tests: BTreeMap<String, TestCase>,
}

#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    tests: BTreeMap<TestId, TestCase>,
}

impl TestSuite {
    pub fn new() -> Self { Self::default() }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: SuiteFile =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse { origin: "test suite".into(), source })?;
        let mut suite = Self::new();
        for (raw, case) in file.tests {
            suite.insert(TestId::parse(&raw)?, case);
        }
        Ok(suite)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text).map_err(|e| e.with_origin(path))
    }

    pub fn insert(&mut self, id: TestId, case: TestCase) {
        self.tests.insert(id, case);
    }

    pub fn get(&self, id: &TestId) -> Option<&TestCase> { self.tests.get(id) }

    pub fn contains(&self, id: &TestId) -> bool { self.tests.contains_key(id) }

    /// All ids in dot-numeric order.
    pub fn ids(&self) -> impl Iterator<Item = &TestId> { self.tests.keys() }

    pub fn len(&self) -> usize { self.tests.len() }

    pub fn is_empty(&self) -> bool { self.tests.is_empty() }

    /// Fails with every id in `ids` that the suite does not define.
    pub fn check_ids<'a, I>(&self, ids: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = &'a TestId>,
    {
        let missing: Vec<String> = ids.into_iter().filter(|id| !self.contains(id)).map(TestId::to_string).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::UnknownTests { missing, available: self.ids().map(TestId::to_string).collect() })
        }
    }
}
