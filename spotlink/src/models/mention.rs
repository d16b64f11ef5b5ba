//! Candidate entity mentions produced by spotting.

use serde::{Deserialize, Serialize};

use super::Document;

/// How a mention's surface form matched the gazetteer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Token-for-token match including case
    Exact,
    /// Matched after case folding
    CaseFolded,
    /// Matched within the configured edit distance
    Fuzzy {
        /// Total number of character edits across all tokens
        edits: u8,
    },
    /// Asserted by an upstream annotation rather than spotted
    Asserted,
}

/// A text span suspected to reference a real-world entity.
///
/// Offsets are byte offsets into [`Document::text`] and always fall on UTF-8
/// character boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Text of the span exactly as it appears in the document
    pub surface_form: String,
    /// Canonical label after alias and redirect normalization
    pub label: String,
    /// Surrounding text used for disambiguation
    pub context: String,
    /// Identifier of the source document
    pub document_id: String,
    /// Canonical entity ids the gazetteer associates with the surface form
    pub entity_ids: Vec<String>,
    /// How the span was matched
    pub match_kind: MatchKind,
    /// Optional type constraint asserted on the mention
    pub type_hint: Option<String>,
}

/// Contract violations on a mention. Fatal for that mention only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMention {
    /// Offsets do not satisfy `0 <= start < end <= len`
    #[error("mention offsets {start}..{end} are out of bounds for text of length {len}")]
    OutOfBounds {
        /// Start offset
        start: usize,
        /// End offset
        end: usize,
        /// Length of the document text
        len: usize,
    },

    /// Offsets split a multi-byte character
    #[error("mention offsets {start}..{end} do not fall on character boundaries")]
    NotCharBoundary {
        /// Start offset
        start: usize,
        /// End offset
        end: usize,
    },

    /// Surface form is empty or whitespace
    #[error("mention surface form is empty")]
    EmptySurfaceForm,

    /// Surface form disagrees with the document text at the given offsets
    #[error("mention surface form '{surface_form}' does not match document text '{actual}'")]
    SurfaceMismatch {
        /// Surface form carried by the mention
        surface_form: String,
        /// Text found in the document at the offsets
        actual: String,
    },

    /// Mention was spotted in another document
    #[error("mention belongs to document '{expected}', not '{actual}'")]
    WrongDocument {
        /// Document id the mention carries
        expected: String,
        /// Document id it was checked against
        actual: String,
    },
}

impl Mention {
    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if two mentions overlap.
    pub fn overlaps(&self, other: &Mention) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Validate the mention against the document it claims to come from.
    pub fn validate(&self, document: &Document) -> Result<(), InvalidMention> {
        if self.document_id != document.id {
            return Err(InvalidMention::WrongDocument {
                expected: self.document_id.clone(),
                actual: document.id.clone(),
            });
        }

        let len = document.text.len();
        if self.start >= self.end || self.end > len {
            return Err(InvalidMention::OutOfBounds {
                start: self.start,
                end: self.end,
                len,
            });
        }

        if !document.text.is_char_boundary(self.start) || !document.text.is_char_boundary(self.end)
        {
            return Err(InvalidMention::NotCharBoundary {
                start: self.start,
                end: self.end,
            });
        }

        if self.surface_form.trim().is_empty() {
            return Err(InvalidMention::EmptySurfaceForm);
        }

        let actual = &document.text[self.start..self.end];
        if actual != self.surface_form {
            return Err(InvalidMention::SurfaceMismatch {
                surface_form: self.surface_form.clone(),
                actual: actual.to_string(),
            });
        }

        Ok(())
    }

    /// Get a formatted string representation of the mention.
    pub fn format(&self) -> String {
        format!(
            "'{}' [{}..{}] -> {}",
            self.surface_form, self.start, self.end, self.label
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(start: usize, end: usize, surface: &str) -> Mention {
        Mention {
            start,
            end,
            surface_form: surface.to_string(),
            label: surface.to_string(),
            context: String::new(),
            document_id: "doc".to_string(),
            entity_ids: Vec::new(),
            match_kind: MatchKind::Exact,
            type_hint: None,
        }
    }

    #[test]
    fn test_valid_mention() {
        let doc = Document::with_id("doc", "Visit Berlin today");
        assert!(mention(6, 12, "Berlin").validate(&doc).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let doc = Document::with_id("doc", "Berlin");
        assert!(matches!(
            mention(0, 7, "Berlin!").validate(&doc),
            Err(InvalidMention::OutOfBounds { .. })
        ));
        assert!(matches!(
            mention(3, 3, "").validate(&doc),
            Err(InvalidMention::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_char_boundary() {
        let doc = Document::with_id("doc", "Zürich");
        assert!(matches!(
            mention(0, 2, "Z\u{fc}").validate(&doc),
            Err(InvalidMention::NotCharBoundary { .. })
        ));
    }

    #[test]
    fn test_empty_and_mismatched_surface() {
        let doc = Document::with_id("doc", "a   b");
        assert_eq!(
            mention(1, 3, "  ").validate(&doc),
            Err(InvalidMention::EmptySurfaceForm)
        );

        let doc = Document::with_id("doc", "Berlin");
        assert!(matches!(
            mention(0, 6, "Bonn!!").validate(&doc),
            Err(InvalidMention::SurfaceMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_document() {
        let doc = Document::with_id("other", "Berlin");
        assert!(matches!(
            mention(0, 6, "Berlin").validate(&doc),
            Err(InvalidMention::WrongDocument { .. })
        ));
    }

    #[test]
    fn test_overlap() {
        let a = mention(0, 5, "abcde");
        let b = mention(4, 8, "efgh");
        let c = mention(5, 8, "fgh");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
