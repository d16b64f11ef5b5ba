//! Disambiguation: resolving mentions to knowledge-base entities.
//!
//! The [`DisambiguationEngine`] builds a [`ScoringRequest`] for each mention,
//! delegates ranking to an [`EntityScoringOracle`] and turns the ranked
//! candidates into an [`Annotation`](crate::models::Annotation). Two oracles
//! are provided: [`LocalOracle`] ranks gazetteer candidates by their static
//! prior in-process, [`RemoteOracle`] calls an external disambiguation service.

mod clock;
mod engine;
mod local;
mod oracle;
mod remote;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{DisambiguationEngine, DisambiguationError, MentionResult};
pub use local::LocalOracle;
pub use oracle::{EntityScoringOracle, OracleError, ScoringRequest};
pub use remote::RemoteOracle;

use crate::gazetteer::Gazetteer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the disambiguation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisambiguationConfig {
    /// Producer id recorded on every annotation
    pub producer_id: String,
    /// Maximum number of candidates retained per annotation
    pub max_candidates: usize,
    /// Candidates scoring below this are discarded
    pub min_score: f32,
    /// Language tag sent when a document carries none
    pub default_language: String,
    /// Maximum concurrent oracle calls per document
    pub max_concurrent_mentions: usize,
    /// Deadline for a single oracle call
    #[serde(with = "humantime_serde")]
    pub oracle_deadline: Duration,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            producer_id: "spotlink.disambiguation".to_string(),
            max_candidates: 5,
            min_score: 0.0,
            default_language: "en".to_string(),
            max_concurrent_mentions: 8,
            oracle_deadline: Duration::from_secs(10),
        }
    }
}

/// Which oracle implementation to use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    /// In-process ranking over gazetteer priors
    #[default]
    Local,
    /// External disambiguation service
    Remote,
}

/// Configuration for the entity scoring oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// Oracle implementation
    pub kind: OracleKind,
    /// Service endpoint for the remote oracle
    pub endpoint: Option<String>,
    /// Extra HTTP headers sent to the remote oracle
    pub headers: HashMap<String, String>,
    /// Score multiplier when a candidate's type contradicts the type hint (local)
    pub type_mismatch_penalty: f32,
    /// Artificial delay per call (local), for exercising concurrency
    #[serde(with = "humantime_serde")]
    pub simulated_latency: Option<Duration>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            kind: OracleKind::Local,
            endpoint: None,
            headers: HashMap::new(),
            type_mismatch_penalty: 0.5,
            simulated_latency: None,
        }
    }
}

/// Create the oracle described by the configuration.
pub fn create_oracle(
    config: &OracleConfig,
    gazetteer: &Gazetteer,
) -> Result<Arc<dyn EntityScoringOracle>, OracleError> {
    match config.kind {
        OracleKind::Local => {
            let mut oracle = LocalOracle::new(gazetteer.clone())
                .with_type_mismatch_penalty(config.type_mismatch_penalty);
            if let Some(latency) = config.simulated_latency {
                oracle = oracle.with_latency(latency);
            }
            Ok(Arc::new(oracle))
        }
        OracleKind::Remote => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                OracleError::Unavailable("remote oracle requires an endpoint".to_string())
            })?;
            let oracle = config
                .headers
                .iter()
                .fold(RemoteOracle::new(endpoint)?, |oracle, (key, value)| {
                    oracle.with_header(key.clone(), value.clone())
                });
            Ok(Arc::new(oracle))
        }
    }
}
