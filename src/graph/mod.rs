//! Relation identifiers and the dependency relation between them.
pub mod dependency;
pub mod extract;
pub mod identifier;

pub use dependency::DependencyGraph;
pub use extract::{declarations_from_triples, Declaration, DeclarationExtractor, ExtractionSettings};
pub use identifier::RelationId;
