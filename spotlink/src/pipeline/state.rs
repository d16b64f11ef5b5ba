//! Per-document enhancement state machine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Why a document failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The gazetteer could not be used
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Every attempted mention failed at the oracle
    #[error("entity scoring oracle unavailable")]
    OracleUnavailable,

    /// Processing was cancelled by the caller
    #[error("cancelled")]
    Cancelled,
}

/// Lifecycle of one document through the pipeline.
///
/// `Pending → Spotted → Disambiguating → Completed`, with `Failed` reachable
/// from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentState {
    /// Accepted, not yet spotted
    Pending,
    /// Mentions located
    Spotted,
    /// Mentions are being resolved
    Disambiguating,
    /// Every mention resolved or skipped
    Completed,
    /// Processing stopped
    Failed {
        /// Cause of the failure
        reason: FailureReason,
    },
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document state transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    /// State before the attempted change
    pub from: DocumentState,
    /// Requested state
    pub to: DocumentState,
}

impl DocumentState {
    /// Check if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Check if the document completed successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Move to `next` if the transition is allowed.
    pub fn advance(&self, next: DocumentState) -> Result<DocumentState, InvalidTransition> {
        let allowed = matches!(
            (self, &next),
            (Self::Pending, Self::Spotted)
                | (Self::Spotted, Self::Disambiguating)
                | (Self::Disambiguating, Self::Completed)
        ) || (!self.is_terminal() && matches!(next, Self::Failed { .. }));

        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self.clone(),
                to: next,
            })
        }
    }
}

/// Shared view of the current state of every document seen by a coordinator.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    states: Arc<RwLock<HashMap<String, DocumentState>>>,
}

impl StateTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) tracking a document in the `Pending` state.
    pub fn begin(&self, document_id: &str) {
        self.states
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(document_id.to_string(), DocumentState::Pending);
    }

    /// Apply a validated transition.
    pub fn transition(
        &self,
        document_id: &str,
        next: DocumentState,
    ) -> Result<DocumentState, InvalidTransition> {
        let mut states = self
            .states
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = states
            .get(document_id)
            .cloned()
            .unwrap_or(DocumentState::Pending);
        let advanced = current.advance(next)?;
        states.insert(document_id.to_string(), advanced.clone());
        Ok(advanced)
    }

    /// Current state of a document.
    pub fn state(&self, document_id: &str) -> Option<DocumentState> {
        self.states
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(document_id)
            .cloned()
    }

    /// States of every tracked document, sorted by document id.
    pub fn snapshot(&self) -> Vec<(String, DocumentState)> {
        let mut states: Vec<(String, DocumentState)> = self
            .states
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
