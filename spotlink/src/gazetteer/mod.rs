//! Gazetteer automaton over known entity surface forms.
//!
//! The gazetteer is built once from an entity list (or a sealed artifact) and
//! then served read-only. Surface forms are tokenized with the same
//! [`Tokenizer`](crate::spotting::Tokenizer) the spotter uses and stored in a
//! token trie, so a forward scan from any token position finds every surface
//! form starting there, longest first.

mod artifact;
mod automaton;
mod builder;

pub use artifact::{
    ARTIFACT_FORMAT_VERSION, ArtifactPayload, GazetteerArtifact, RedirectRecord, SurfaceFormRecord,
};
pub use automaton::{GazetteerAutomaton, GazetteerMatch};
pub use builder::GazetteerBuilder;

use crate::spotting::Tokenizer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Error type for gazetteer lookups and loading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The automaton was queried before construction completed
    #[error("Gazetteer automaton has not been built")]
    Unbuilt,

    /// The backing index failed integrity or structure validation
    #[error("Gazetteer index is malformed: {0}")]
    Malformed(String),
}

/// A knowledge-base entity known to the gazetteer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRecord {
    /// Canonical entity identifier
    pub id: String,
    /// Canonical label
    pub label: String,
    /// Optional entity type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Static popularity prior in [0, 1]
    #[serde(default = "default_prior")]
    pub prior: f32,
}

fn default_prior() -> f32 {
    0.5
}

impl EntityRecord {
    /// Create a new entity record with the default prior.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            type_hint: None,
            prior: default_prior(),
        }
    }

    /// Set the popularity prior.
    pub fn prior(mut self, prior: f32) -> Self {
        self.prior = prior;
        self
    }

    /// Set the entity type.
    pub fn type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }
}

/// Matching behaviour of the automaton.
///
/// The default is exact plus case-fold matching. Fuzzy matching is opt-in to
/// bound false positives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchConfig {
    /// Fall back to case-insensitive matching
    pub case_insensitive: bool,
    /// Allow per-token edit distance matching
    pub fuzzy: bool,
    /// Total character edits allowed across a fuzzy match
    pub max_edit_distance: u8,
    /// Tokens shorter than this (in chars) must match without edits
    pub min_fuzzy_token_chars: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            fuzzy: false,
            max_edit_distance: 1,
            min_fuzzy_token_chars: 5,
        }
    }
}

impl MatchConfig {
    /// Exact, case-sensitive matching only.
    pub fn exact() -> Self {
        Self {
            case_insensitive: false,
            fuzzy: false,
            ..Self::default()
        }
    }

    /// Case-fold plus bounded edit distance matching.
    pub fn fuzzy(max_edit_distance: u8) -> Self {
        Self {
            fuzzy: true,
            max_edit_distance,
            ..Self::default()
        }
    }
}

/// Shareable slot holding the automaton once it has been built.
///
/// Starts unbuilt; every query fails with [`LookupError::Unbuilt`] until an
/// automaton is installed. An installed automaton is never replaced.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    slot: Arc<OnceLock<Arc<GazetteerAutomaton>>>,
}

impl Gazetteer {
    /// Create an empty, unbuilt gazetteer.
    pub fn unbuilt() -> Self {
        Self::default()
    }

    /// Create a gazetteer serving an already built automaton.
    pub fn from_automaton(automaton: GazetteerAutomaton) -> Self {
        let gazetteer = Self::unbuilt();
        gazetteer.install(automaton);
        gazetteer
    }

    /// Load, validate and install a sealed artifact from disk.
    pub fn load(
        path: impl AsRef<Path>,
        tokenizer: Arc<dyn Tokenizer>,
        config: MatchConfig,
    ) -> Result<Self, LookupError> {
        let automaton = GazetteerArtifact::load(path)?.into_automaton(tokenizer, config)?;
        Ok(Self::from_automaton(automaton))
    }

    /// Install the automaton. Returns `false` if one was already installed.
    pub fn install(&self, automaton: GazetteerAutomaton) -> bool {
        self.slot.set(Arc::new(automaton)).is_ok()
    }

    /// Check if an automaton has been installed.
    pub fn is_built(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Get the installed automaton.
    pub fn automaton(&self) -> Result<Arc<GazetteerAutomaton>, LookupError> {
        self.slot.get().cloned().ok_or(LookupError::Unbuilt)
    }
}
