//! Oracle backed by an external disambiguation service.

use super::{EntityScoringOracle, OracleError, ScoringRequest};
use crate::models::EntityCandidate;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Candidate as returned by the remote service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    entity_id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    type_hint: Option<String>,
    score: f32,
}

impl From<WireCandidate> for EntityCandidate {
    fn from(wire: WireCandidate) -> Self {
        EntityCandidate {
            entity_id: wire.entity_id,
            label: wire.label,
            type_hint: wire.type_hint,
            score: wire.score,
        }
    }
}

/// Oracle that POSTs each [`ScoringRequest`] as JSON to a service endpoint.
///
/// The service answers with a JSON array of
/// `{"entityId", "label"?, "typeHint"?, "score"}`; an empty body means no
/// candidates. Transport failures and non-success statuses map to
/// [`OracleError::Unavailable`], a missed deadline to [`OracleError::Timeout`].
#[derive(Debug, Clone)]
pub struct RemoteOracle {
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

impl RemoteOracle {
    /// Create a remote oracle for an endpoint.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, OracleError> {
        let client = Client::builder()
            .build()
            .map_err(|e| OracleError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create a remote oracle that reuses an existing HTTP client.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            headers: HashMap::new(),
        }
    }

    /// Send an extra header with every request.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Service endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EntityScoringOracle for RemoteOracle {
    async fn score(&self, request: &ScoringRequest) -> Result<Vec<EntityCandidate>, OracleError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(request);
        if !request.deadline.is_zero() {
            builder = builder.timeout(request.deadline);
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(request.deadline)
            } else {
                warn!("Oracle request to {} failed: {}", self.endpoint, e);
                OracleError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Oracle at {} returned status {}", self.endpoint, status);
            return Err(OracleError::Unavailable(format!(
                "service returned status {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(request.deadline)
            } else {
                OracleError::Unavailable(e.to_string())
            }
        })?;
        if body.trim().is_empty() {
            debug!(
                "Oracle returned an empty body for '{}'",
                request.mention_text
            );
            return Ok(Vec::new());
        }

        let candidates: Vec<WireCandidate> = serde_json::from_str(&body)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        Ok(candidates.into_iter().map(EntityCandidate::from).collect())
    }

    fn name(&self) -> &str {
        "remote"
    }
}
