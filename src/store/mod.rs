//! Triple stores the executor materializes into and tests query against.
pub mod memory;
pub mod remote;
pub mod types;

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use types::{Binding, QueryOutcome, Row, StoreStats, Term, Triple};

use oxigraph::sparql::EvaluationError;
use oxigraph::store::{LoaderError, StorageError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store has not been initialized")]
    NotInitialized,
    #[error("Query or update failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Failed to load Turtle data: {0}")]
    Load(#[from] LoaderError),
    #[error("Store storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to read data file '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Store {operation} failed with HTTP {status}: {body}")]
    Http { operation: &'static str, status: u16, body: String },
    #[error("Store {operation} request failed: {message}")]
    Transport { operation: &'static str, message: String },
    #[error("Unexpected store response: {0}")]
    Protocol(String),
}

/// The query/update surface shared by every backend.
pub trait Store {
    fn backend(&self) -> &'static str;

    /// Prepares an empty store and loads the configured data files.
    fn initialize(&mut self) -> Result<(), StoreError>;

    /// Discards all state and re-initializes from the data files.
    fn reset(&mut self) -> Result<(), StoreError> {
        self.initialize()
    }

    fn query(&self, text: &str) -> Result<QueryOutcome, StoreError>;

    /// Applies an update and returns the net change in triple count.
    fn update(&mut self, text: &str) -> Result<i64, StoreError>;

    fn size(&self) -> Result<usize, StoreError>;

    fn stats(&self) -> Result<StoreStats, StoreError>;
}

fn default_timeout_secs() -> u64 { remote::DEFAULT_TIMEOUT_SECS }

/// Which backend to open, as read from configuration (`{"mode": "memory"}` etc.).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory,
    Remote {
        url: String,
        repository: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self { StoreConfig::Memory }
}

/// Builds an uninitialized store that will load `data_files` on `initialize`.
pub fn open_store(config: &StoreConfig, data_files: Vec<PathBuf>) -> Box<dyn Store> {
    match config {
        StoreConfig::Memory => Box::new(MemoryStore::with_data_files(data_files)),
        StoreConfig::Remote { url, repository, timeout_secs } => Box::new(
            RemoteStore::new(url, repository, Duration::from_secs(*timeout_secs)).with_data_files(data_files),
        ),
    }
}
