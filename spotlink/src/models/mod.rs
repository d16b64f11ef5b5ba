//! Domain models for documents, mentions, candidates, and annotations

pub mod annotation;
pub mod document;
pub mod mention;

// Re-export important models
pub use annotation::{Annotation, EntityCandidate, TextAnnotation};
pub use document::Document;
pub use mention::{InvalidMention, MatchKind, Mention};
