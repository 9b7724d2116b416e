// Facade: the crate's public surface.
//
// Declarations go in through `graph`, come out of `analysis` as an order and
// a level map, and `execution` replays them against a `store` level by level.

pub mod analysis;
pub mod error;
pub mod execution;
pub mod graph;
pub mod store;
pub mod validation;

pub use analysis::{analyze, Analysis, AnalysisError, CycleError, GraphReport, Stratification};
pub use error::{Result, StrataError};
pub use execution::{
    ConfigError, ExecutorSettings, FailurePolicy, LevelConfig, LevelSelector, RunResults, ScriptError,
    StagedExecutor, StagedRunResult, TestId, TestRunner, TestSuite,
};
pub use graph::{Declaration, DeclarationExtractor, DependencyGraph, ExtractionSettings, RelationId};
pub use store::{open_store, MemoryStore, RemoteStore, Store, StoreConfig, StoreError};
pub use validation::{Mismatch, ResultComparator};
