//! Entity scoring oracle contract.

use crate::models::EntityCandidate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request sent to an oracle for one mention.
///
/// Serializes to the remote wire shape
/// `{"mentionText", "context", "languageTag", "typeHint"?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    /// Surface form of the mention
    pub mention_text: String,
    /// Context window around the mention
    pub context: String,
    /// Language of the document
    pub language_tag: String,
    /// Type constraint asserted on the mention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Gazetteer entity ids for the surface form (in-process only)
    #[serde(skip)]
    pub entity_ids: Vec<String>,
    /// Deadline for this call (in-process only)
    #[serde(skip)]
    pub deadline: Duration,
}

/// Recoverable oracle failures.
///
/// Every variant takes the same path: the mention is skipped and the failure
/// counts towards the document-level outage threshold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Service unreachable, transport error or non-success status
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline
    #[error("Oracle call exceeded its deadline of {0:?}")]
    Timeout(Duration),

    /// The response body could not be decoded
    #[error("Oracle returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for components that rank candidate entities for a mention.
#[async_trait]
pub trait EntityScoringOracle: Send + Sync + std::fmt::Debug {
    /// Rank candidate entities for the request.
    ///
    /// # Returns
    /// Candidates in the oracle's order with scores in [0, 1]; an empty list
    /// means no entity was found, which is not an error.
    async fn score(&self, request: &ScoringRequest) -> Result<Vec<EntityCandidate>, OracleError>;

    /// Get the name of this oracle for identification purposes.
    fn name(&self) -> &str;
}
