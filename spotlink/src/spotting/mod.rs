//! Spotting: locating candidate entity mentions in text.
//!
//! The [`SpottingEngine`] scans a document's tokens left to right against the
//! gazetteer automaton. At each token it takes the longest accepted surface
//! form starting there, emits a [`Mention`](crate::models::Mention) and jumps
//! past it; otherwise it advances one token. Spotting is synchronous and
//! deterministic.

mod context;
mod engine;
pub mod tokenizer;

pub use context::context_window;
pub use engine::{Mentions, SpottingEngine};
pub use tokenizer::{RegexTokenizer, Token, Tokenizer};

use serde::{Deserialize, Serialize};

/// How much surrounding text a mention carries as context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContextWindow {
    /// The sentence(s) containing the mention
    #[default]
    Sentence,
    /// A fixed number of characters on either side of the mention
    Radius {
        /// Characters before and after the mention
        chars: usize,
    },
    /// The whole document
    Document,
}

/// Configuration for spotting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpottingConfig {
    /// Context window attached to each mention
    pub context: ContextWindow,
    /// Documents up to this many characters use the whole text as sentence context
    pub short_document_chars: usize,
    /// Minimum mention length in characters
    pub min_mention_chars: usize,
    /// Single-token surface forms that are never emitted (compared case-insensitively)
    pub stop_words: Vec<String>,
}

impl Default for SpottingConfig {
    fn default() -> Self {
        Self {
            context: ContextWindow::Sentence,
            short_document_chars: 280,
            min_mention_chars: 2,
            stop_words: Vec::new(),
        }
    }
}
