//! Static analysis of the dependency relation: total order, levels, and reports.
pub mod levels;
pub mod report;
pub mod topology;

pub use levels::{stratify, Stratification};
pub use report::{dependency_summary, ordered_relationships, GraphReport, LevelKey};
pub use topology::{sort, CycleError};

use crate::graph::{DependencyGraph, RelationId};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("Short name '{short_name}' is shared by '{first}' and '{second}'")]
    ShortNameCollision { short_name: String, first: RelationId, second: RelationId },
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to format report")]
    Format(#[from] std::fmt::Error),
}

/// The result of one analysis pass. Rebuilt from scratch on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Dependencies before dependents.
    pub order: Vec<RelationId>,
    pub strata: Stratification,
}

/// Sorts first so a cycle is reported before stratification is attempted.
pub fn analyze(graph: &DependencyGraph) -> Result<Analysis, CycleError> {
    let order = sort(graph)?;
    let strata = stratify(graph)?;
    info!(
        relations = order.len(),
        max_level = strata.max_level,
        "dependency analysis complete"
    );
    Ok(Analysis { order, strata })
}
