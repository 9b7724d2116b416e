//! Scoring of query results against a test's expected rows.
pub mod comparator;
pub mod mismatch;

pub use comparator::{Comparison, ResultComparator};
pub use mismatch::Mismatch;
