//! Source documents handed to the linking pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable piece of text to be linked.
///
/// Documents are owned by the caller; the engines only ever read them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Unique identifier of the document
    pub id: String,
    /// Plain text content
    pub text: String,
    /// Language tag (e.g. "en", "de-AT"); absence disables linking
    pub language: Option<String>,
}

impl Document {
    /// Create a document with a generated identifier and no language tag.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            language: None,
        }
    }

    /// Create a document with an explicit identifier.
    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            language: None,
        }
    }

    /// Set the language tag.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Primary language subtag in lowercase ("en-US" -> "en").
    pub fn primary_language(&self) -> Option<String> {
        self.language
            .as_deref()
            .map(str::trim)
            .and_then(|tag| tag.split(['-', '_']).next())
            .filter(|primary| !primary.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether the document has no linkable text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_language() {
        let doc = Document::new("Hallo").language("de-AT");
        assert_eq!(doc.primary_language().as_deref(), Some("de"));

        let doc = Document::new("Hello").language("EN_us");
        assert_eq!(doc.primary_language().as_deref(), Some("en"));

        let doc = Document::new("Hello").language("  ");
        assert_eq!(doc.primary_language(), None);

        assert_eq!(Document::new("Hello").primary_language(), None);
    }

    #[test]
    fn test_blank_detection() {
        assert!(Document::new("").is_blank());
        assert!(Document::new(" \n\t ").is_blank());
        assert!(!Document::new(" a ").is_blank());
    }
}
