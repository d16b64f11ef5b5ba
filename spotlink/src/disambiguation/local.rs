//! In-process oracle ranking gazetteer candidates by their static prior.

use super::{EntityScoringOracle, OracleError, ScoringRequest};
use crate::gazetteer::{EntityRecord, Gazetteer};
use crate::models::EntityCandidate;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::trace;

/// Oracle that scores candidates by gazetteer prior.
///
/// Deterministic: the same request always yields the same candidates in the
/// same order (score descending, then entity id ascending).
#[derive(Debug, Clone)]
pub struct LocalOracle {
    gazetteer: Gazetteer,
    type_mismatch_penalty: f32,
    latency: Option<Duration>,
}

impl LocalOracle {
    /// Create a local oracle over a gazetteer.
    pub fn new(gazetteer: Gazetteer) -> Self {
        Self {
            gazetteer,
            type_mismatch_penalty: 0.5,
            latency: None,
        }
    }

    /// Multiply the prior of candidates whose type contradicts the hint.
    pub fn with_type_mismatch_penalty(mut self, penalty: f32) -> Self {
        self.type_mismatch_penalty = penalty.clamp(0.0, 1.0);
        self
    }

    /// Delay every call, e.g. to exercise concurrency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn candidate(&self, record: &EntityRecord, type_hint: Option<&str>) -> EntityCandidate {
        let mismatch = match (type_hint, record.type_hint.as_deref()) {
            (Some(wanted), Some(actual)) => !wanted.eq_ignore_ascii_case(actual),
            _ => false,
        };
        let score = if mismatch {
            record.prior * self.type_mismatch_penalty
        } else {
            record.prior
        };

        EntityCandidate {
            entity_id: record.id.clone(),
            label: record.label.clone(),
            type_hint: record.type_hint.clone(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl EntityScoringOracle for LocalOracle {
    async fn score(&self, request: &ScoringRequest) -> Result<Vec<EntityCandidate>, OracleError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let automaton = self
            .gazetteer
            .automaton()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let records: Vec<EntityRecord> = if request.entity_ids.is_empty() {
            automaton.lookup_surface(&request.mention_text)
        } else {
            request
                .entity_ids
                .iter()
                .filter_map(|id| automaton.entity(id).cloned())
                .collect()
        };

        let mut candidates: Vec<EntityCandidate> = records
            .iter()
            .map(|record| self.candidate(record, request.type_hint.as_deref()))
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        trace!(
            "Local oracle ranked {} candidates for '{}'",
            candidates.len(),
            request.mention_text
        );
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "local"
    }
}
