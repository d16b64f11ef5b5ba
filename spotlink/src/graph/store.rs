//! In-memory annotation graph storage.

use super::{GraphEntry, GraphError};
use crate::models::{Annotation, TextAnnotation};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<GraphEntry>,
    ids: HashSet<Uuid>,
}

/// Append-only log for one document.
#[derive(Debug, Default)]
struct DocumentLog {
    /// Held for the lifetime of a writer session
    writer: Arc<Mutex<()>>,
    state: RwLock<LogState>,
}

impl DocumentLog {
    fn read(&self) -> RwLockReadGuard<'_, LogState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared annotation graph keyed by document id.
///
/// Cloning is cheap; clones share the same underlying logs.
#[derive(Debug, Clone, Default)]
pub struct AnnotationGraph {
    documents: Arc<RwLock<HashMap<String, Arc<DocumentLog>>>>,
}

impl AnnotationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, document_id: &str) -> Option<Arc<DocumentLog>> {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(document_id)
            .cloned()
    }

    fn log_or_create(&self, document_id: &str) -> Arc<DocumentLog> {
        if let Some(log) = self.log(document_id) {
            return log;
        }
        self.documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(document_id.to_string())
            .or_default()
            .clone()
    }

    /// Open the single writer session for a document.
    ///
    /// Waits until any other session on the same document is dropped.
    pub async fn writer(&self, document_id: &str) -> DocumentWriter {
        let log = self.log_or_create(document_id);
        let guard = log.writer.clone().lock_owned().await;
        DocumentWriter {
            document_id: document_id.to_string(),
            log,
            _guard: guard,
        }
    }

    /// Append one entry in its own writer session.
    ///
    /// Returns `false` if an entry with the same id was already present.
    pub async fn append(&self, entry: impl Into<GraphEntry>) -> bool {
        let entry = entry.into();
        let document_id = entry.document_id().to_string();
        let mut writer = self.writer(&document_id).await;
        // The session is bound to the entry's own document.
        writer.append(entry).unwrap_or(false)
    }

    /// Snapshot of every entry recorded for a document, in append order.
    pub fn entries(&self, document_id: &str) -> Vec<GraphEntry> {
        self.log(document_id)
            .map(|log| log.read().entries.clone())
            .unwrap_or_default()
    }

    /// Entity annotations of a document, in append order.
    pub fn annotations(&self, document_id: &str) -> Vec<Annotation> {
        self.log(document_id)
            .map(|log| {
                log.read()
                    .entries
                    .iter()
                    .filter_map(|entry| match entry {
                        GraphEntry::Entity(annotation) => Some(annotation.clone()),
                        GraphEntry::Text(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Upstream text annotations of a document, in append order.
    pub fn text_annotations(&self, document_id: &str) -> Vec<TextAnnotation> {
        self.log(document_id)
            .map(|log| {
                log.read()
                    .entries
                    .iter()
                    .filter_map(|entry| match entry {
                        GraphEntry::Text(text) => Some(text.clone()),
                        GraphEntry::Entity(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First type hint asserted by a text annotation on exactly this span.
    pub fn type_hint_for(&self, document_id: &str, start: usize, end: usize) -> Option<String> {
        let log = self.log(document_id)?;
        let state = log.read();
        state.entries.iter().find_map(|entry| match entry {
            GraphEntry::Text(text) if text.start == start && text.end == end => {
                text.type_hint.clone()
            }
            _ => None,
        })
    }

    /// Number of entries recorded for a document.
    pub fn len(&self, document_id: &str) -> usize {
        self.log(document_id)
            .map(|log| log.read().entries.len())
            .unwrap_or(0)
    }

    /// Check if a document has no entries.
    pub fn is_empty(&self, document_id: &str) -> bool {
        self.len(document_id) == 0
    }

    /// Ids of every document with a log.
    pub fn documents(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

/// Exclusive write session for one document.
///
/// Dropping the writer releases the document for the next session.
#[derive(Debug)]
pub struct DocumentWriter {
    document_id: String,
    log: Arc<DocumentLog>,
    _guard: OwnedMutexGuard<()>,
}

impl DocumentWriter {
    /// Document this session writes to.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Entity annotation already recorded under `id`, if any.
    pub fn annotation(&self, id: Uuid) -> Option<Annotation> {
        self.log.read().entries.iter().find_map(|entry| match entry {
            GraphEntry::Entity(annotation) if annotation.id == id => Some(annotation.clone()),
            _ => None,
        })
    }

    /// Append an entry atomically.
    ///
    /// Returns `Ok(false)` when an entry with the same id already exists.
    pub fn append(&mut self, entry: impl Into<GraphEntry>) -> Result<bool, GraphError> {
        let entry = entry.into();
        if entry.document_id() != self.document_id {
            return Err(GraphError::DocumentMismatch {
                writer: self.document_id.clone(),
                entry: entry.document_id().to_string(),
            });
        }

        let mut state = self.log.write();
        if !state.ids.insert(entry.id()) {
            debug!(
                "Skipping duplicate graph entry {} for document {}",
                entry.id(),
                self.document_id
            );
            return Ok(false);
        }
        state.entries.push(entry);
        Ok(true)
    }
}
