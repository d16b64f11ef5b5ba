//! Serialized gazetteer artifacts.
//!
//! An artifact is a JSON document carrying the raw gazetteer contents and a
//! SHA-256 checksum of the serialized payload. Loading verifies the format
//! version, the checksum and the payload structure before anything is built.

use super::{EntityRecord, GazetteerAutomaton, GazetteerBuilder, LookupError, MatchConfig};
use crate::spotting::Tokenizer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Artifact format understood by this version of the crate.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A surface form and the entity ids it refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceFormRecord {
    /// Surface text
    pub surface: String,
    /// Entity ids (may be redirect sources)
    pub entity_ids: Vec<String>,
}

impl SurfaceFormRecord {
    /// Create a new surface form record.
    pub fn new(surface: impl Into<String>, entity_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            surface: surface.into(),
            entity_ids: entity_ids.into_iter().collect(),
        }
    }
}

/// A redirect from one entity id to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedirectRecord {
    /// Redirected id
    pub from: String,
    /// Target id
    pub to: String,
}

/// Raw gazetteer contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtifactPayload {
    /// Known entities
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    /// Surface forms
    #[serde(default)]
    pub surface_forms: Vec<SurfaceFormRecord>,
    /// Redirects, resolved at build time
    #[serde(default)]
    pub redirects: Vec<RedirectRecord>,
}

/// A sealed, checksummed gazetteer artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GazetteerArtifact {
    /// Format version
    pub format_version: u32,
    /// Lowercase hex SHA-256 of the serialized payload
    pub checksum: String,
    /// Gazetteer contents
    pub payload: ArtifactPayload,
}

fn checksum_of(payload: &ArtifactPayload) -> Result<String, LookupError> {
    let bytes = serde_json::to_vec(payload)
        .map_err(|e| LookupError::Malformed(format!("payload cannot be serialized: {e}")))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

impl GazetteerArtifact {
    /// Seal a payload, computing its checksum.
    pub fn seal(payload: ArtifactPayload) -> Result<Self, LookupError> {
        let checksum = checksum_of(&payload)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            checksum,
            payload,
        })
    }

    /// Parse and validate an artifact from JSON.
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let artifact: GazetteerArtifact = serde_json::from_str(json)
            .map_err(|e| LookupError::Malformed(format!("artifact is not valid JSON: {e}")))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read, parse and validate an artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LookupError::Malformed(format!("cannot read artifact {}: {e}", path.display()))
        })?;
        let artifact = Self::from_json(&json).inspect_err(|e| {
            warn!("Rejected gazetteer artifact {}: {}", path.display(), e);
        })?;
        debug!(
            "Loaded gazetteer artifact {} ({} entities, {} surface forms)",
            path.display(),
            artifact.payload.entities.len(),
            artifact.payload.surface_forms.len()
        );
        Ok(artifact)
    }

    /// Verify the format version, checksum and payload structure.
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(LookupError::Malformed(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let actual = checksum_of(&self.payload)?;
        if !actual.eq_ignore_ascii_case(self.checksum.trim()) {
            return Err(LookupError::Malformed(format!(
                "checksum mismatch: recorded {}, computed {}",
                self.checksum, actual
            )));
        }

        GazetteerBuilder::from_payload(self.payload.clone()).validate()
    }

    /// Serialize the artifact to pretty JSON.
    pub fn to_json(&self) -> Result<String, LookupError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LookupError::Malformed(format!("artifact cannot be serialized: {e}")))
    }

    /// Write the artifact to a file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LookupError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| {
            LookupError::Malformed(format!("cannot write artifact {}: {e}", path.display()))
        })
    }

    /// Validate and build the automaton.
    pub fn into_automaton(
        self,
        tokenizer: Arc<dyn Tokenizer>,
        config: MatchConfig,
    ) -> Result<GazetteerAutomaton, LookupError> {
        self.validate()?;
        GazetteerBuilder::from_payload(self.payload)
            .tokenizer(tokenizer)
            .match_config(config)
            .build()
    }
}
