//! Enhancement coordinator: sequences spotting and disambiguation per document.

use super::{CancellationToken, DocumentState, FailureReason, PipelineConfig, StateTracker};
use crate::disambiguation::{DisambiguationEngine, DisambiguationError, OracleError};
use crate::graph::{AnnotationGraph, DocumentWriter};
use crate::models::{Annotation, Document, InvalidMention, Mention};
use crate::spotting::SpottingEngine;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether the coordinator can enhance a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementCapability {
    /// The document can be enhanced; processing is asynchronous
    Async,
    /// The document cannot be enhanced by this coordinator
    Unsupported,
}

/// Why a mention produced no annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The oracle failed after all retries
    OracleFailure(String),
    /// The mention does not fit its document
    InvalidMention(String),
    /// No candidate survived filtering
    NoCandidates,
}

/// A mention that was spotted but not linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedMention {
    /// The mention
    pub mention: Mention,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Processed document
    pub document_id: String,
    /// Terminal state
    pub state: DocumentState,
    /// Annotations held by the graph for the linked mentions, in mention
    /// start-offset order. A mention linked by an earlier run reports the
    /// annotation stored then.
    pub annotations: Vec<Annotation>,
    /// Mentions without an annotation
    pub skipped: Vec<SkippedMention>,
}

impl DocumentOutcome {
    /// Check if the document completed.
    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// Failure reason, if the document failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            DocumentState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Coordinates spotting and disambiguation and writes results to the graph.
#[derive(Debug, Clone)]
pub struct EnhancementCoordinator {
    spotter: SpottingEngine,
    disambiguator: DisambiguationEngine,
    graph: AnnotationGraph,
    config: Arc<PipelineConfig>,
    tracker: StateTracker,
}

impl EnhancementCoordinator {
    /// Create a new coordinator.
    pub fn new(
        spotter: SpottingEngine,
        disambiguator: DisambiguationEngine,
        graph: AnnotationGraph,
        config: PipelineConfig,
    ) -> Self {
        Self {
            spotter,
            disambiguator,
            graph,
            config: Arc::new(config),
            tracker: StateTracker::new(),
        }
    }

    /// The annotation graph results are written to.
    pub fn graph(&self) -> &AnnotationGraph {
        &self.graph
    }

    /// Tracker exposing the state of every processed document.
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Current state of a document.
    pub fn state(&self, document_id: &str) -> Option<DocumentState> {
        self.tracker.state(document_id)
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check whether a document can be enhanced.
    ///
    /// `Async` iff the document carries a supported language tag and its text
    /// is not blank.
    pub fn can_enhance(&self, document: &Document) -> EnhancementCapability {
        if document.is_blank() {
            return EnhancementCapability::Unsupported;
        }
        match document.primary_language() {
            Some(language) if self.config.supports_language(&language) => {
                EnhancementCapability::Async
            }
            _ => EnhancementCapability::Unsupported,
        }
    }

    /// Spot and disambiguate a document.
    pub async fn process(&self, document: &Document) -> DocumentOutcome {
        self.process_with_cancel(document, &CancellationToken::new())
            .await
    }

    /// Spot and disambiguate a document, stopping early if `cancel` fires.
    ///
    /// Runs on the same document are serialized by the graph writer session,
    /// so the tracker always shows the state of the latest run.
    pub async fn process_with_cancel(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> DocumentOutcome {
        let writer = self.graph.writer(&document.id).await;
        self.tracker.begin(&document.id);

        let mentions = match self.spotter.spot_all(document) {
            Ok(mentions) => mentions,
            Err(e) => {
                warn!("Cannot spot document {}: {}", document.id, e);
                let reason = FailureReason::ConfigurationError(e.to_string());
                return self.finish(document, Err(reason), Vec::new(), Vec::new());
            }
        };

        self.link(document, writer, mentions, cancel).await
    }

    /// Disambiguate the mentions asserted by upstream text annotations.
    ///
    /// Skips spotting; the mentions come from the graph.
    pub async fn process_existing(&self, document: &Document) -> DocumentOutcome {
        self.process_existing_with_cancel(document, &CancellationToken::new())
            .await
    }

    /// Disambiguate upstream text annotations, stopping early if `cancel` fires.
    pub async fn process_existing_with_cancel(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> DocumentOutcome {
        let writer = self.graph.writer(&document.id).await;
        self.tracker.begin(&document.id);
        let mentions = self.disambiguator.mentions_from_graph(document);
        self.link(document, writer, mentions, cancel).await
    }

    /// Process several documents, up to `max_concurrent_documents` at once.
    ///
    /// Outcomes are returned in input order.
    pub async fn process_all(&self, documents: &[Document]) -> Vec<DocumentOutcome> {
        let limit = self.config.max_concurrent_documents.max(1);
        stream::iter(documents)
            .map(|document| self.process(document))
            .buffered(limit)
            .collect()
            .await
    }

    async fn link(
        &self,
        document: &Document,
        mut writer: DocumentWriter,
        mentions: Vec<Mention>,
        cancel: &CancellationToken,
    ) -> DocumentOutcome {
        self.advance(&document.id, DocumentState::Spotted);
        debug!(
            "Document {} has {} mentions",
            document.id,
            mentions.len()
        );
        self.advance(&document.id, DocumentState::Disambiguating);

        let limit = self.disambiguator.config().max_concurrent_mentions.max(1);

        // Buffered keeps input order, so the graph sees mentions by start offset.
        let mut results = stream::iter(mentions)
            .map(|mention| async move {
                if cancel.is_cancelled() {
                    return (mention, None);
                }
                let outcome = self.disambiguate_with_retry(&mention, document).await;
                (mention, Some(outcome))
            })
            .buffered(limit);

        let mut annotations = Vec::new();
        let mut skipped = Vec::new();
        let mut attempted = 0usize;
        let mut oracle_failures = 0usize;
        let mut cancelled = false;

        while let Some((mention, outcome)) = results.next().await {
            let Some(outcome) = outcome.filter(|_| !cancel.is_cancelled()) else {
                cancelled = true;
                break;
            };

            match outcome {
                Ok(Some(annotation)) => {
                    attempted += 1;
                    let annotation = match writer.append(annotation.clone()) {
                        Ok(true) => annotation,
                        Ok(false) => match writer.annotation(annotation.id) {
                            Some(stored) => {
                                debug!("Annotation {} already recorded", stored.id);
                                stored
                            }
                            None => {
                                warn!(
                                    "Annotation id {} is taken by a text annotation",
                                    annotation.id
                                );
                                continue;
                            }
                        },
                        Err(e) => {
                            warn!("Failed to record annotation {}: {}", annotation.id, e);
                            continue;
                        }
                    };
                    debug!("Linked {}", annotation.format());
                    annotations.push(annotation);
                }
                Ok(None) => {
                    attempted += 1;
                    debug!("No candidates for {}", mention.format());
                    skipped.push(SkippedMention {
                        mention,
                        reason: SkipReason::NoCandidates,
                    });
                }
                Err(DisambiguationError::Oracle(e)) => {
                    attempted += 1;
                    oracle_failures += 1;
                    warn!("Skipping {}: {}", mention.format(), e);
                    skipped.push(SkippedMention {
                        mention,
                        reason: SkipReason::from(&e),
                    });
                }
                Err(DisambiguationError::InvalidMention(e)) => {
                    warn!("Skipping invalid mention {}: {}", mention.format(), e);
                    skipped.push(SkippedMention {
                        mention,
                        reason: SkipReason::from(&e),
                    });
                }
            }
        }
        drop(results);

        let result = if cancelled {
            Err(FailureReason::Cancelled)
        } else if attempted > 1 && oracle_failures == attempted {
            Err(FailureReason::OracleUnavailable)
        } else {
            Ok(())
        };
        // Settle the terminal state before releasing the document.
        let outcome = self.finish(document, result, annotations, skipped);
        drop(writer);
        outcome
    }

    async fn disambiguate_with_retry(
        &self,
        mention: &Mention,
        document: &Document,
    ) -> Result<Option<Annotation>, DisambiguationError> {
        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.disambiguator.disambiguate(mention, document).await {
                Err(DisambiguationError::Oracle(e)) if attempt < policy.max_retries => {
                    let backoff = policy.backoff_duration(attempt);
                    warn!(
                        "Oracle failed for '{}' (attempt {}/{}), retrying in {:?}: {}",
                        mention.surface_form,
                        attempt + 1,
                        policy.max_retries + 1,
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn advance(&self, document_id: &str, next: DocumentState) {
        if let Err(e) = self.tracker.transition(document_id, next) {
            warn!("Document {}: {}", document_id, e);
        }
    }

    fn finish(
        &self,
        document: &Document,
        result: Result<(), FailureReason>,
        annotations: Vec<Annotation>,
        skipped: Vec<SkippedMention>,
    ) -> DocumentOutcome {
        let state = match result {
            Ok(()) => {
                info!(
                    "Document {} completed: {} annotations, {} skipped",
                    document.id,
                    annotations.len(),
                    skipped.len()
                );
                DocumentState::Completed
            }
            Err(reason) => {
                warn!("Document {} failed: {}", document.id, reason);
                DocumentState::Failed { reason }
            }
        };
        self.advance(&document.id, state.clone());

        DocumentOutcome {
            document_id: document.id.clone(),
            state,
            annotations,
            skipped,
        }
    }
}

impl From<&OracleError> for SkipReason {
    fn from(error: &OracleError) -> Self {
        SkipReason::OracleFailure(error.to_string())
    }
}

impl From<&InvalidMention> for SkipReason {
    fn from(error: &InvalidMention) -> Self {
        SkipReason::InvalidMention(error.to_string())
    }
}
