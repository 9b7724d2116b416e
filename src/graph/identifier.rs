//! Defines `RelationId`, the globally unique name of a relation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dereferenceable relation name (normally a full IRI).
///
/// Equality and ordering are exact string comparisons. The derived
/// [`short_name`](RelationId::short_name) is for presentation only and is not
/// guaranteed to be unique across identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(String);

impl RelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing fragment or path segment, e.g. `parentOf` for
    /// `http://example.org/family#parentOf`.
    pub fn short_name(&self) -> &str {
        let after_hash = self.0.rsplit('#').next().unwrap_or(&self.0);
        after_hash.rsplit('/').next().unwrap_or(after_hash)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
