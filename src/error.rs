//! Crate-level error with one variant per fatal category.
use crate::analysis::{AnalysisError, CycleError};
use crate::execution::{ConfigError, ScriptError};
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Report(AnalysisError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AnalysisError> for StrataError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Cycle(cycle) => StrataError::Cycle(cycle),
            AnalysisError::Io(io) => StrataError::Io(io),
            other => StrataError::Report(other),
        }
    }
}

impl StrataError {
    /// Distinct process exit status per category.
    pub fn exit_code(&self) -> i32 {
        match self {
            StrataError::Config(_) => 2,
            StrataError::Cycle(_) => 3,
            StrataError::Script(_) => 4,
            StrataError::Store(_) => 5,
            StrataError::Report(_) => 6,
            StrataError::Io(_) => 7,
        }
    }
}

pub type Result<T, E = StrataError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationId;
    use std::path::PathBuf;

    #[test]
    fn test_categories_have_distinct_exit_codes() {
        let errors: Vec<StrataError> = vec![
            ConfigError::InvalidTestId("x".into()).into(),
            CycleError { node: RelationId::new("a"), members: vec![RelationId::new("a")] }.into(),
            ScriptError::Missing(PathBuf::from("m.sparql")).into(),
            StoreError::NotInitialized.into(),
            AnalysisError::ShortNameCollision {
                short_name: "knows".into(),
                first: RelationId::new("http://a#knows"),
                second: RelationId::new("http://b#knows"),
            }
            .into(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into(),
        ];
        let mut codes: Vec<i32> = errors.iter().map(StrataError::exit_code).collect();
        codes.dedup();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_cycle_inside_analysis_error_keeps_its_category() {
        let cycle = CycleError { node: RelationId::new("x"), members: vec![] };
        let err: StrataError = AnalysisError::Cycle(cycle).into();
        assert_eq!(err.exit_code(), 3);
    }
}
