//! Gazetteer-driven spotting engine.

use super::{SpottingConfig, Token, context_window};
use crate::gazetteer::{Gazetteer, GazetteerAutomaton, GazetteerMatch, LookupError};
use crate::models::{Document, Mention};
use std::sync::Arc;
use tracing::debug;

/// Engine that locates candidate mentions in documents.
#[derive(Debug, Clone)]
pub struct SpottingEngine {
    gazetteer: Gazetteer,
    config: Arc<SpottingConfig>,
}

impl SpottingEngine {
    /// Create a new spotting engine over a (possibly not yet built) gazetteer.
    pub fn new(gazetteer: Gazetteer, config: SpottingConfig) -> Self {
        Self {
            gazetteer,
            config: Arc::new(config),
        }
    }

    /// Name used as producer id for diagnostics.
    pub fn name(&self) -> &str {
        "spotlink.spotting"
    }

    /// Spotting configuration.
    pub fn config(&self) -> &SpottingConfig {
        &self.config
    }

    /// Start spotting a document.
    ///
    /// Fails only if the gazetteer has not been built. The returned iterator
    /// is lazy, finite and cloneable; a clone or [`Mentions::restart`] replays
    /// the same sequence.
    pub fn spot<'a>(&self, document: &'a Document) -> Result<Mentions<'a>, LookupError> {
        let automaton = self.gazetteer.automaton()?;
        let language = document.primary_language();
        let tokens = automaton.tokenize(&document.text, language.as_deref());

        debug!(
            "Spotting document {} ({} tokens, language: {})",
            document.id,
            tokens.len(),
            language.as_deref().unwrap_or("unknown")
        );

        Ok(Mentions {
            automaton,
            config: self.config.clone(),
            document,
            tokens: Arc::new(tokens),
            position: 0,
        })
    }

    /// Spot a document and collect every mention.
    pub fn spot_all(&self, document: &Document) -> Result<Vec<Mention>, LookupError> {
        Ok(self.spot(document)?.collect())
    }
}

/// Lazy sequence of mentions in one document.
#[derive(Debug, Clone)]
pub struct Mentions<'a> {
    automaton: Arc<GazetteerAutomaton>,
    config: Arc<SpottingConfig>,
    document: &'a Document,
    tokens: Arc<Vec<Token>>,
    position: usize,
}

impl Mentions<'_> {
    /// Rewind to the start of the document.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Tokens of the document being spotted.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn accepts(&self, found: &GazetteerMatch) -> bool {
        let text = &self.document.text[found.start..found.end];
        if text.chars().count() < self.config.min_mention_chars {
            return false;
        }
        if found.token_len() == 1
            && self
                .config
                .stop_words
                .iter()
                .any(|word| word.to_lowercase() == text.to_lowercase())
        {
            return false;
        }
        true
    }

    fn to_mention(&self, found: GazetteerMatch) -> Mention {
        let text = &self.document.text;
        Mention {
            start: found.start,
            end: found.end,
            surface_form: text[found.start..found.end].to_string(),
            label: found.label,
            context: context_window(
                text,
                found.start,
                found.end,
                &self.config.context,
                self.config.short_document_chars,
            ),
            document_id: self.document.id.clone(),
            entity_ids: found.entity_ids,
            match_kind: found.kind,
            type_hint: None,
        }
    }
}

impl Iterator for Mentions<'_> {
    type Item = Mention;

    fn next(&mut self) -> Option<Mention> {
        while self.position < self.tokens.len() {
            let start = self.position;
            let accepted = self
                .automaton
                .matches_at(&self.tokens, start)
                .into_iter()
                .find(|found| self.accepts(found));

            match accepted {
                Some(found) => {
                    // No sub-span of an accepted match is ever emitted.
                    self.position = found.end_token;
                    return Some(self.to_mention(found));
                }
                None => self.position += 1,
            }
        }
        None
    }
}
