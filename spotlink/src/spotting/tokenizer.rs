//! Token boundary detection.
//!
//! Language-aware tokenization is an external concern; the engines only need
//! token boundaries. [`RegexTokenizer`] is the default, splitting on word
//! characters and treating every other non-space character as its own token.

use lazy_static::lazy_static;
use regex::Regex;

/// A token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text as it appears in the source
    pub text: String,
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Token {
    /// Create a new token.
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Whether the token is a single punctuation or symbol character.
    pub fn is_punctuation(&self) -> bool {
        let mut chars = self.text.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if !c.is_alphanumeric())
    }
}

/// Trait for splitting text into tokens.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Split text into tokens ordered by start offset.
    ///
    /// # Arguments
    /// * `text` - The text to tokenize
    /// * `language` - Primary language subtag, when known
    fn tokenize(&self, text: &str, language: Option<&str>) -> Vec<Token>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &str;
}

/// Default regex-based tokenizer.
#[derive(Debug, Clone, Default)]
pub struct RegexTokenizer;

impl RegexTokenizer {
    /// Create a new regex tokenizer.
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str, _language: Option<&str>) -> Vec<Token> {
        lazy_static! {
            // Words keep inner apostrophes, hyphens and dots ("O'Neil", "U.S", "Baden-Baden").
            static ref TOKEN_REGEX: Regex =
                Regex::new(r"\w+(?:['\u{2019}.\-]\w+)*|[^\w\s]").expect("token pattern is valid");
        }

        TOKEN_REGEX
            .find_iter(text)
            .map(|m| Token::new(m.as_str(), m.start(), m.end()))
            .collect()
    }

    fn name(&self) -> &str {
        "regex"
    }
}
