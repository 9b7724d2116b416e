//! Level-by-level materialization and validation against a store.
pub mod config;
pub mod runner;
pub mod staged;
pub mod suite;

pub use config::{ExecutorSettings, FailurePolicy, Level, LevelConfig, LevelSelector, LevelSpec};
pub use runner::{RunResults, TestRecord, TestRunner, TestStatus};
pub use staged::{LevelOutcome, ScriptApplication, ScriptVerification, StagedExecutor, StagedRunResult};
pub use suite::{TestCase, TestId, TestSuite};

use crate::store::StoreError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Problems with the suite or level configuration. Raised before the store is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Invalid {origin}: {source}")]
    Parse { origin: String, source: serde_json::Error },
    #[error("Invalid test id '{0}': components must be non-negative integers")]
    InvalidTestId(String),
    #[error("Invalid level key '{0}': expected a non-negative integer or 'all'")]
    InvalidLevelKey(String),
    #[error("Invalid level: {level}. Configured levels: {available:?}")]
    UnknownLevel { level: usize, available: Vec<usize> },
    #[error("Test ID(s) not found: {}. Available test IDs: {}", .missing.join(", "), .available.join(", "))]
    UnknownTests { missing: Vec<String>, available: Vec<String> },
}

impl ConfigError {
    pub(crate) fn with_origin(self, path: &Path) -> Self {
        match self {
            ConfigError::Parse { source, .. } => ConfigError::Parse { origin: path.display().to_string(), source },
            other => other,
        }
    }
}

/// A derivation script could not be applied. Fatal to a staged run.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Materialization script not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Failed to read script '{}': {source}", .path.display())]
    Unreadable { path: PathBuf, source: std::io::Error },
    #[error("Store rejected '{}': {source}", .path.display())]
    Rejected { path: PathBuf, source: StoreError },
}

impl ScriptError {
    pub fn path(&self) -> &Path {
        match self {
            ScriptError::Missing(path) => path,
            ScriptError::Unreadable { path, .. } | ScriptError::Rejected { path, .. } => path,
        }
    }
}
