//! Integration tests for the spotting engine
//!
//! Tests cover:
//! - Deterministic, restartable mention sequences
//! - Longest-match-first and non-overlapping mentions
//! - Byte offsets on character boundaries
//! - Empty documents and unbuilt gazetteers
//! - Stop words, minimum length and context windows

use spotlink::gazetteer::{EntityRecord, Gazetteer, GazetteerBuilder, LookupError};
use spotlink::models::{Document, MatchKind};
use spotlink::spotting::{ContextWindow, SpottingConfig, SpottingEngine};

const SCENARIO: &str = "President Obama is meeting Angela Merkel in Berlin on Monday.";

fn gazetteer() -> Gazetteer {
    let automaton = GazetteerBuilder::new()
        .entity(
            EntityRecord::new("dbr:Barack_Obama", "Barack Obama")
                .type_hint("Person")
                .prior(0.9),
        )
        .alias("Obama", "dbr:Obama")
        .redirect("dbr:Obama", "dbr:Barack_Obama")
        .entity(
            EntityRecord::new("dbr:Angela_Merkel", "Angela Merkel")
                .type_hint("Person")
                .prior(0.9),
        )
        .entity(EntityRecord::new("dbr:Angela", "Angela").prior(0.1))
        .entity(
            EntityRecord::new("dbr:Berlin", "Berlin")
                .type_hint("Place")
                .prior(0.8),
        )
        .entity(EntityRecord::new("dbr:Zürich", "Zürich").prior(0.7))
        .entity(EntityRecord::new("dbr:München", "München").prior(0.7))
        .entity(EntityRecord::new("dbr:The", "The").prior(0.1))
        .entity(EntityRecord::new("dbr:The_Who", "The Who").prior(0.6))
        .entity(EntityRecord::new("dbr:A", "A").prior(0.1))
        .build()
        .unwrap();
    Gazetteer::from_automaton(automaton)
}

fn engine() -> SpottingEngine {
    SpottingEngine::new(gazetteer(), SpottingConfig::default())
}

#[cfg(test)]
mod sequence_tests {
    use super::*;

    #[test]
    fn test_scenario_mentions() {
        let document = Document::with_id("doc-1", SCENARIO).language("en");
        let mentions = engine().spot_all(&document).unwrap();

        let surfaces: Vec<&str> = mentions.iter().map(|m| m.surface_form.as_str()).collect();
        assert_eq!(surfaces, vec!["Obama", "Angela Merkel", "Berlin"]);

        let obama = &mentions[0];
        assert_eq!(obama.label, "Barack Obama");
        assert_eq!(obama.entity_ids, vec!["dbr:Barack_Obama"]);
        assert_eq!(obama.match_kind, MatchKind::Exact);
        assert_eq!(obama.document_id, "doc-1");
        assert!(obama.type_hint.is_none());
    }

    #[test]
    fn test_spotting_is_deterministic() {
        let document = Document::with_id("doc-1", SCENARIO).language("en");
        let engine = engine();

        let first = engine.spot_all(&document).unwrap();
        let second = engine.spot_all(&document).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mentions_are_restartable() {
        let document = Document::with_id("doc-1", SCENARIO).language("en");
        let engine = engine();

        let mut mentions = engine.spot(&document).unwrap();
        let first = mentions.next().unwrap();
        let replay: Vec<_> = mentions.clone().collect();
        assert_eq!(replay.len(), 2);

        mentions.restart();
        assert_eq!(mentions.next().unwrap(), first);
        assert_eq!(mentions.collect::<Vec<_>>(), replay);
    }
}

#[cfg(test)]
mod longest_match_tests {
    use super::*;

    #[test]
    fn test_longest_surface_form_wins() {
        let document = Document::with_id("doc", "Angela Merkel and Angela met.");
        let mentions = engine().spot_all(&document).unwrap();

        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].surface_form, "Angela Merkel");
        assert_eq!(mentions[0].entity_ids, vec!["dbr:Angela_Merkel"]);
        assert_eq!(mentions[1].surface_form, "Angela");
    }

    #[test]
    fn test_mentions_never_overlap() {
        let text = "Angela Merkel Berlin Angela Merkel Obama Berlin";
        let document = Document::with_id("doc", text);
        let mentions = engine().spot_all(&document).unwrap();

        assert_eq!(mentions.len(), 5);
        for pair in mentions.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }

    #[test]
    fn test_case_folded_mentions() {
        let document = Document::with_id("doc", "berlin is big.");
        let mentions = engine().spot_all(&document).unwrap();

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].surface_form, "berlin");
        assert_eq!(mentions[0].label, "Berlin");
        assert_eq!(mentions[0].match_kind, MatchKind::CaseFolded);
    }
}

#[cfg(test)]
mod offset_tests {
    use super::*;

    #[test]
    fn test_offsets_match_document_text() {
        let document = Document::with_id("doc", SCENARIO);
        for mention in engine().spot_all(&document).unwrap() {
            assert!(mention.start < mention.end);
            assert!(mention.end <= document.text.len());
            assert_eq!(&document.text[mention.start..mention.end], mention.surface_form);
            assert!(mention.validate(&document).is_ok());
        }
    }

    #[test]
    fn test_offsets_on_multibyte_text() {
        let text = "Von Zürich nach München über Berlin.";
        let document = Document::with_id("doc", text).language("de");
        let mentions = engine().spot_all(&document).unwrap();

        let surfaces: Vec<&str> = mentions.iter().map(|m| m.surface_form.as_str()).collect();
        assert_eq!(surfaces, vec!["Zürich", "München", "Berlin"]);
        for mention in &mentions {
            assert!(text.is_char_boundary(mention.start));
            assert!(text.is_char_boundary(mention.end));
            assert_eq!(&text[mention.start..mention.end], mention.surface_form);
        }
        assert_eq!(mentions[0].start, 4);
        assert_eq!(mentions[0].end, 4 + "Zürich".len());
    }
}

#[cfg(test)]
mod edge_case_tests {
    use super::*;

    #[test]
    fn test_empty_and_blank_documents() {
        let engine = engine();
        for text in ["", "   ", "\n\t "] {
            let document = Document::with_id("doc", text);
            assert_eq!(engine.spot(&document).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_unbuilt_gazetteer() {
        let engine = SpottingEngine::new(Gazetteer::unbuilt(), SpottingConfig::default());
        let document = Document::with_id("doc", SCENARIO);
        assert!(matches!(engine.spot(&document), Err(LookupError::Unbuilt)));
    }

    #[test]
    fn test_gazetteer_installed_later() {
        let slot = Gazetteer::unbuilt();
        let engine = SpottingEngine::new(slot.clone(), SpottingConfig::default());
        let document = Document::with_id("doc", "Berlin");
        assert!(engine.spot(&document).is_err());

        let automaton = GazetteerBuilder::new()
            .entity(EntityRecord::new("dbr:Berlin", "Berlin"))
            .build()
            .unwrap();
        assert!(slot.install(automaton));
        assert_eq!(engine.spot_all(&document).unwrap().len(), 1);
    }

    #[test]
    fn test_stop_words_and_min_length() {
        let config = SpottingConfig {
            stop_words: vec!["the".to_string()],
            ..SpottingConfig::default()
        };
        let engine = SpottingEngine::new(gazetteer(), config);
        let document = Document::with_id("doc", "The band The Who played A song.");
        let mentions = engine.spot_all(&document).unwrap();

        // "The" alone is a stop word, "A" is below the minimum length.
        let surfaces: Vec<&str> = mentions.iter().map(|m| m.surface_form.as_str()).collect();
        assert_eq!(surfaces, vec!["The Who"]);
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    #[test]
    fn test_short_documents_use_whole_text() {
        let document = Document::with_id("doc", SCENARIO);
        let mentions = engine().spot_all(&document).unwrap();
        assert!(mentions.iter().all(|m| m.context == SCENARIO));
    }

    #[test]
    fn test_sentence_context_in_long_documents() {
        let config = SpottingConfig {
            short_document_chars: 0,
            ..SpottingConfig::default()
        };
        let engine = SpottingEngine::new(gazetteer(), config);
        let text = "Obama spoke first. Later Angela Merkel answered.";
        let document = Document::with_id("doc", text);
        let mentions = engine.spot_all(&document).unwrap();

        assert_eq!(mentions[0].context, "Obama spoke first.");
        assert_eq!(mentions[1].context, "Later Angela Merkel answered.");
    }

    #[test]
    fn test_radius_context() {
        let config = SpottingConfig {
            context: ContextWindow::Radius { chars: 3 },
            ..SpottingConfig::default()
        };
        let engine = SpottingEngine::new(gazetteer(), config);
        let document = Document::with_id("doc", "in Berlin on");
        let mentions = engine.spot_all(&document).unwrap();
        assert_eq!(mentions[0].context, "in Berlin on");
    }
}
