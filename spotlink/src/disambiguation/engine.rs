//! Disambiguation engine.

use super::{
    Clock, DisambiguationConfig, EntityScoringOracle, OracleError, ScoringRequest, SystemClock,
};
use crate::graph::AnnotationGraph;
use crate::models::{Annotation, Document, EntityCandidate, InvalidMention, MatchKind, Mention};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that skip a single mention.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DisambiguationError {
    /// The oracle failed or missed its deadline
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The mention does not fit its document
    #[error(transparent)]
    InvalidMention(#[from] InvalidMention),
}

impl DisambiguationError {
    /// Whether the failure came from the oracle rather than the mention.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Self::Oracle(_))
    }
}

/// Outcome of disambiguating one mention.
#[derive(Debug, Clone)]
pub struct MentionResult {
    /// The mention as submitted
    pub mention: Mention,
    /// `Ok(None)` when the oracle found no usable candidate
    pub outcome: Result<Option<Annotation>, DisambiguationError>,
}

/// Engine that links mentions to entities through a scoring oracle.
#[derive(Debug, Clone)]
pub struct DisambiguationEngine {
    oracle: Arc<dyn EntityScoringOracle>,
    graph: AnnotationGraph,
    config: Arc<DisambiguationConfig>,
    clock: Arc<dyn Clock>,
}

impl DisambiguationEngine {
    /// Create a new engine.
    ///
    /// The graph is consulted for type hints asserted by upstream engines.
    pub fn new(
        oracle: Arc<dyn EntityScoringOracle>,
        graph: AnnotationGraph,
        config: DisambiguationConfig,
    ) -> Self {
        Self {
            oracle,
            graph,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source for extraction timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Producer id recorded on annotations.
    pub fn producer_id(&self) -> &str {
        &self.config.producer_id
    }

    /// Engine configuration.
    pub fn config(&self) -> &DisambiguationConfig {
        &self.config
    }

    /// The oracle in use.
    pub fn oracle(&self) -> &Arc<dyn EntityScoringOracle> {
        &self.oracle
    }

    /// Disambiguate one mention with the configured oracle deadline.
    pub async fn disambiguate(
        &self,
        mention: &Mention,
        document: &Document,
    ) -> Result<Option<Annotation>, DisambiguationError> {
        self.disambiguate_within(mention, document, self.config.oracle_deadline)
            .await
    }

    /// Disambiguate one mention, giving the oracle at most `deadline`.
    ///
    /// # Returns
    /// `Ok(None)` when no candidate survives filtering, otherwise an
    /// annotation whose selected entity is the highest-scoring candidate,
    /// ties going to the lowest entity id.
    pub async fn disambiguate_within(
        &self,
        mention: &Mention,
        document: &Document,
        deadline: Duration,
    ) -> Result<Option<Annotation>, DisambiguationError> {
        mention.validate(document)?;

        let request = self.request_for(mention, document, deadline);
        let candidates = match tokio::time::timeout(deadline, self.oracle.score(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(
                    "Oracle '{}' missed its {:?} deadline for '{}'",
                    self.oracle.name(),
                    deadline,
                    mention.surface_form
                );
                return Err(OracleError::Timeout(deadline).into());
            }
        };

        let mut linked = mention.clone();
        linked.type_hint = request.type_hint;
        Ok(self.select(linked, candidates))
    }

    /// Disambiguate a batch of mentions of one document.
    ///
    /// Up to `max_concurrent_mentions` oracle calls run at once; results come
    /// back in input order regardless of completion order.
    pub async fn disambiguate_all(
        &self,
        mentions: &[Mention],
        document: &Document,
    ) -> Vec<MentionResult> {
        let limit = self.config.max_concurrent_mentions.max(1);
        stream::iter(mentions.iter().cloned())
            .map(|mention| async move {
                let outcome = self.disambiguate(&mention, document).await;
                MentionResult { mention, outcome }
            })
            .buffered(limit)
            .collect()
            .await
    }

    /// Mentions asserted by upstream text annotations on a document.
    ///
    /// Sorted by start offset; when several annotations cover the same span
    /// the first one recorded wins.
    pub fn mentions_from_graph(&self, document: &Document) -> Vec<Mention> {
        let mut mentions: Vec<Mention> = Vec::new();
        for text in self.graph.text_annotations(&document.id) {
            if mentions
                .iter()
                .any(|m| m.start == text.start && m.end == text.end)
            {
                continue;
            }
            mentions.push(Mention {
                start: text.start,
                end: text.end,
                label: text.selected_text.clone(),
                surface_form: text.selected_text,
                context: text.context.unwrap_or_else(|| document.text.clone()),
                document_id: document.id.clone(),
                entity_ids: Vec::new(),
                match_kind: MatchKind::Asserted,
                type_hint: text.type_hint,
            });
        }
        mentions.sort_by_key(|m| (m.start, m.end));
        mentions
    }

    fn request_for(
        &self,
        mention: &Mention,
        document: &Document,
        deadline: Duration,
    ) -> ScoringRequest {
        let type_hint = mention.type_hint.clone().or_else(|| {
            self.graph
                .type_hint_for(&document.id, mention.start, mention.end)
        });
        let context = if mention.context.trim().is_empty() {
            document.text.clone()
        } else {
            mention.context.clone()
        };

        ScoringRequest {
            mention_text: mention.surface_form.clone(),
            context,
            language_tag: document
                .language
                .clone()
                .unwrap_or_else(|| self.config.default_language.clone()),
            type_hint,
            entity_ids: mention.entity_ids.clone(),
            deadline,
        }
    }

    fn select(&self, mention: Mention, candidates: Vec<EntityCandidate>) -> Option<Annotation> {
        let candidates: Vec<EntityCandidate> = candidates
            .into_iter()
            .filter(|candidate| {
                if !candidate.has_valid_score() {
                    warn!(
                        "Discarding candidate {} with invalid score {}",
                        candidate.entity_id, candidate.score
                    );
                    return false;
                }
                candidate.score >= self.config.min_score
            })
            .collect();

        // Highest score wins; ties go to the lowest entity id.
        let mut best = 0;
        for (idx, candidate) in candidates.iter().enumerate() {
            let current = &candidates[best];
            if candidate.score > current.score
                || (candidate.score == current.score && candidate.entity_id < current.entity_id)
            {
                best = idx;
            }
        }
        let selected = candidates.get(best)?.clone();

        let max = self.config.max_candidates.max(1);
        let mut all_candidates: Vec<EntityCandidate> = candidates.into_iter().take(max).collect();
        if best >= max {
            all_candidates.pop();
            all_candidates.push(selected.clone());
        }

        Some(Annotation {
            id: Annotation::derive_id(
                &mention.document_id,
                mention.start,
                mention.end,
                &self.config.producer_id,
            ),
            document_id: mention.document_id.clone(),
            mention,
            selected_entity: selected,
            all_candidates,
            extraction_timestamp: self.clock.now(),
            producer_id: self.config.producer_id.clone(),
        })
    }
}
