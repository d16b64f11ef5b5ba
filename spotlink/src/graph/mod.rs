//! Per-document annotation graph.
//!
//! The graph is an append-only log of [`GraphEntry`] values keyed by document
//! id. Writes to one document are serialized through a [`DocumentWriter`]
//! session; writes to different documents proceed in parallel. Readers take
//! snapshots and may observe a partially populated document, but never a torn
//! entry: every entry is pushed whole under the log lock.
//!
//! Entries are never removed. Appending an entry whose id is already present
//! is a no-op, which makes re-running an engine over the same document safe.

mod store;

pub use store::{AnnotationGraph, DocumentWriter};

use crate::models::{Annotation, TextAnnotation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record in the annotation graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEntry {
    /// Span assertion from an upstream engine
    Text(TextAnnotation),
    /// Linked entity annotation
    Entity(Annotation),
}

impl GraphEntry {
    /// Identifier of the wrapped annotation.
    pub fn id(&self) -> Uuid {
        match self {
            GraphEntry::Text(text) => text.id,
            GraphEntry::Entity(annotation) => annotation.id,
        }
    }

    /// Document the entry belongs to.
    pub fn document_id(&self) -> &str {
        match self {
            GraphEntry::Text(text) => &text.document_id,
            GraphEntry::Entity(annotation) => &annotation.document_id,
        }
    }

    /// Engine that asserted the entry.
    pub fn producer_id(&self) -> &str {
        match self {
            GraphEntry::Text(text) => &text.producer_id,
            GraphEntry::Entity(annotation) => &annotation.producer_id,
        }
    }
}

impl From<Annotation> for GraphEntry {
    fn from(annotation: Annotation) -> Self {
        GraphEntry::Entity(annotation)
    }
}

impl From<TextAnnotation> for GraphEntry {
    fn from(text: TextAnnotation) -> Self {
        GraphEntry::Text(text)
    }
}

/// Error type for graph writes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Entry targets a different document than the open writer session
    #[error("entry for document '{entry}' cannot be written through the writer of '{writer}'")]
    DocumentMismatch {
        /// Document the writer session is bound to
        writer: String,
        /// Document the entry belongs to
        entry: String,
    },
}
