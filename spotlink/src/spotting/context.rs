//! Context window extraction around mentions.

use super::ContextWindow;
use lazy_static::lazy_static;
use regex::Regex;

/// Text surrounding the span `start..end` according to the window mode.
///
/// `start` and `end` must be char boundaries of `text`. In `Sentence` mode,
/// documents no longer than `short_document_chars` characters are returned whole.
pub fn context_window(
    text: &str,
    start: usize,
    end: usize,
    window: &ContextWindow,
    short_document_chars: usize,
) -> String {
    match window {
        ContextWindow::Document => text.to_string(),
        ContextWindow::Sentence => {
            if text.chars().count() <= short_document_chars {
                return text.to_string();
            }
            sentence_around(text, start, end).trim().to_string()
        }
        ContextWindow::Radius { chars } => radius_around(text, start, end, *chars).to_string(),
    }
}

fn sentence_around(text: &str, start: usize, end: usize) -> &str {
    lazy_static! {
        static ref SENTENCE_BREAK: Regex =
            Regex::new(r#"[.!?]+["')\]]*\s+"#).expect("sentence pattern is valid");
    }

    let mut from = 0;
    let mut to = text.len();
    for boundary in SENTENCE_BREAK.find_iter(text) {
        if boundary.end() <= start {
            from = boundary.end();
        } else if boundary.start() >= end {
            to = boundary.end();
            break;
        }
    }
    &text[from..to]
}

fn radius_around(text: &str, start: usize, end: usize, chars: usize) -> &str {
    let from = if chars == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(chars - 1)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    };
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "First sentence here. Angela Merkel met Obama in Berlin! Last one?";

    fn span(text: &str, needle: &str) -> (usize, usize) {
        let start = text.find(needle).unwrap();
        (start, start + needle.len())
    }

    #[test]
    fn test_sentence_context() {
        let (start, end) = span(TEXT, "Obama");
        let context = context_window(TEXT, start, end, &ContextWindow::Sentence, 0);
        assert_eq!(context, "Angela Merkel met Obama in Berlin!");

        let (start, end) = span(TEXT, "First");
        let context = context_window(TEXT, start, end, &ContextWindow::Sentence, 0);
        assert_eq!(context, "First sentence here.");

        let (start, end) = span(TEXT, "Last");
        let context = context_window(TEXT, start, end, &ContextWindow::Sentence, 0);
        assert_eq!(context, "Last one?");
    }

    #[test]
    fn test_short_documents_use_whole_text() {
        let (start, end) = span(TEXT, "Obama");
        let context = context_window(TEXT, start, end, &ContextWindow::Sentence, 500);
        assert_eq!(context, TEXT);
    }

    #[test]
    fn test_radius_context() {
        let (start, end) = span(TEXT, "Obama");
        let context = context_window(TEXT, start, end, &ContextWindow::Radius { chars: 4 }, 0);
        assert_eq!(context, "met Obama in ");

        let context = context_window(TEXT, 0, 5, &ContextWindow::Radius { chars: 100 }, 0);
        assert_eq!(context, TEXT);

        let context = context_window(TEXT, start, end, &ContextWindow::Radius { chars: 0 }, 0);
        assert_eq!(context, "Obama");
    }

    #[test]
    fn test_radius_respects_char_boundaries() {
        let text = "ääZürichöö";
        let (start, end) = span(text, "Zürich");
        let context = context_window(text, start, end, &ContextWindow::Radius { chars: 1 }, 0);
        assert_eq!(context, "äZürichö");
    }

    #[test]
    fn test_document_context() {
        let context = context_window(TEXT, 0, 5, &ContextWindow::Document, 0);
        assert_eq!(context, TEXT);
    }
}
