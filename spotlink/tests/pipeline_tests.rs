//! Integration tests for the enhancement pipeline coordinator
//!
//! Tests cover:
//! - The end-to-end linking scenario with the local oracle
//! - Partial failure and the all-failed threshold
//! - Flush order, cancellation and retries
//! - Capability checks, disambiguate-only mode and batch processing
//! - Concurrent runs of the same document

use async_trait::async_trait;
use spotlink::config::{ConfigBuilder, SpotlinkConfig};
use spotlink::disambiguation::{
    DisambiguationEngine, EntityScoringOracle, OracleError, ScoringRequest,
};
use spotlink::gazetteer::{EntityRecord, Gazetteer, GazetteerBuilder};
use spotlink::graph::AnnotationGraph;
use spotlink::models::{Document, EntityCandidate, TextAnnotation};
use spotlink::pipeline::{
    CancellationToken, DocumentState, EnhancementCapability, EnhancementCoordinator,
    FailureReason, RetryPolicy, SkipReason,
};
use spotlink::spotting::SpottingEngine;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const SCENARIO: &str = "President Obama is meeting Angela Merkel in Berlin on Monday.";

fn gazetteer() -> Gazetteer {
    let automaton = GazetteerBuilder::new()
        .entity(
            EntityRecord::new("dbr:Barack_Obama", "Barack Obama")
                .type_hint("Person")
                .prior(0.9),
        )
        .alias("Obama", "dbr:Barack_Obama")
        .entity(EntityRecord::new("dbr:Obama_Japan", "Obama Japan").prior(0.2))
        .alias("Obama", "dbr:Obama_Japan")
        .entity(
            EntityRecord::new("dbr:Angela_Merkel", "Angela Merkel")
                .type_hint("Person")
                .prior(0.9),
        )
        .entity(
            EntityRecord::new("dbr:Berlin", "Berlin")
                .type_hint("Place")
                .prior(0.8),
        )
        .build()
        .unwrap();
    Gazetteer::from_automaton(automaton)
}

fn config() -> SpotlinkConfig {
    ConfigBuilder::testing().build().unwrap()
}

fn local_coordinator() -> EnhancementCoordinator {
    spotlink::build_coordinator(&config(), gazetteer(), AnnotationGraph::new()).unwrap()
}

fn coordinator_with(
    oracle: Arc<dyn EntityScoringOracle>,
    config: SpotlinkConfig,
) -> EnhancementCoordinator {
    let graph = AnnotationGraph::new();
    let spotter = SpottingEngine::new(gazetteer(), config.spotting.clone());
    let disambiguator =
        DisambiguationEngine::new(oracle, graph.clone(), config.disambiguation.clone());
    EnhancementCoordinator::new(spotter, disambiguator, graph, config.pipeline)
}

fn scenario() -> Document {
    Document::with_id("doc-1", SCENARIO).language("en")
}

/// Oracle answering from a script keyed by mention text.
#[derive(Debug, Default)]
struct ScriptedOracle {
    answers: HashMap<String, Result<Vec<EntityCandidate>, OracleError>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn answer(mut self, mention: &str, candidates: Vec<EntityCandidate>) -> Self {
        self.answers.insert(mention.to_string(), Ok(candidates));
        self
    }

    fn fail(mut self, mention: &str) -> Self {
        self.answers.insert(
            mention.to_string(),
            Err(OracleError::Unavailable("connection refused".to_string())),
        );
        self
    }

    fn delay(mut self, mention: &str, delay: Duration) -> Self {
        self.delays.insert(mention.to_string(), delay);
        self
    }
}

#[async_trait]
impl EntityScoringOracle for ScriptedOracle {
    async fn score(&self, request: &ScoringRequest) -> Result<Vec<EntityCandidate>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&request.mention_text) {
            tokio::time::sleep(*delay).await;
        }
        self.answers
            .get(&request.mention_text)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Oracle that always fails.
#[derive(Debug, Default)]
struct UnreachableOracle {
    calls: AtomicUsize,
}

#[async_trait]
impl EntityScoringOracle for UnreachableOracle {
    async fn score(&self, _request: &ScoringRequest) -> Result<Vec<EntityCandidate>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OracleError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

fn candidate(id: &str, score: f32) -> EntityCandidate {
    EntityCandidate::new(id, id.trim_start_matches("dbr:"), score)
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_obama_merkel_berlin() {
        let coordinator = local_coordinator();
        let document = scenario();

        assert_eq!(
            coordinator.can_enhance(&document),
            EnhancementCapability::Async
        );
        let outcome = coordinator.process(&document).await;

        assert!(outcome.is_completed());
        assert!(outcome.skipped.is_empty());
        let linked: Vec<(&str, &str)> = outcome
            .annotations
            .iter()
            .map(|a| {
                (
                    a.mention.surface_form.as_str(),
                    a.selected_entity.entity_id.as_str(),
                )
            })
            .collect();
        assert_eq!(
            linked,
            vec![
                ("Obama", "dbr:Barack_Obama"),
                ("Angela Merkel", "dbr:Angela_Merkel"),
                ("Berlin", "dbr:Berlin"),
            ]
        );

        let obama = &outcome.annotations[0];
        assert_eq!(obama.all_candidates.len(), 2);
        assert_eq!(obama.all_candidates[1].entity_id, "dbr:Obama_Japan");

        assert_eq!(coordinator.graph().annotations("doc-1"), outcome.annotations);
        assert_eq!(coordinator.state("doc-1"), Some(DocumentState::Completed));
    }

    #[tokio::test]
    async fn test_zero_candidates_completes_without_annotations() {
        let oracle = ScriptedOracle::default();
        let coordinator = coordinator_with(Arc::new(oracle), config());
        let outcome = coordinator.process(&scenario()).await;

        assert!(outcome.is_completed());
        assert!(outcome.annotations.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
        assert!(
            outcome
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::NoCandidates)
        );
        assert!(coordinator.graph().annotations("doc-1").is_empty());
    }

    #[tokio::test]
    async fn test_document_without_mentions_completes() {
        let coordinator = local_coordinator();
        let document = Document::with_id("doc-2", "Nothing to see here.").language("en");
        let outcome = coordinator.process(&document).await;

        assert!(outcome.is_completed());
        assert!(outcome.annotations.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent_in_graph() {
        let coordinator = local_coordinator();
        let document = scenario();

        coordinator.process(&document).await;
        let outcome = coordinator.process(&document).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.annotations.len(), 3);
        assert_eq!(coordinator.graph().annotations("doc-1").len(), 3);
    }

    #[tokio::test]
    async fn test_rerun_reports_stored_annotation() {
        /// Oracle whose answer can change between runs.
        #[derive(Debug)]
        struct SwitchingOracle {
            entity_id: Mutex<String>,
        }

        #[async_trait]
        impl EntityScoringOracle for SwitchingOracle {
            async fn score(
                &self,
                _request: &ScoringRequest,
            ) -> Result<Vec<EntityCandidate>, OracleError> {
                Ok(vec![candidate(&self.entity_id.lock().unwrap(), 0.8)])
            }

            fn name(&self) -> &str {
                "switching"
            }
        }

        let oracle = Arc::new(SwitchingOracle {
            entity_id: Mutex::new("dbr:Berlin".to_string()),
        });
        let coordinator = coordinator_with(oracle.clone(), config());
        let document = Document::with_id("doc-5", "Berlin is big.").language("en");

        let first = coordinator.process(&document).await;
        *oracle.entity_id.lock().unwrap() = "dbr:Berlin_NH".to_string();
        let second = coordinator.process(&document).await;

        assert!(second.is_completed());
        let stored = coordinator.graph().annotations("doc-5");
        assert_eq!(stored.len(), 1);
        assert_eq!(second.annotations, stored);
        assert_eq!(second.annotations, first.annotations);
        assert_eq!(second.annotations[0].selected_entity.entity_id, "dbr:Berlin");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    /// Oracle failing its first `failures` calls, each after a short delay.
    #[derive(Debug)]
    struct OutageOracle {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityScoringOracle for OutageOracle {
        async fn score(
            &self,
            request: &ScoringRequest,
        ) -> Result<Vec<EntityCandidate>, OracleError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            if call < self.failures {
                return Err(OracleError::Unavailable("connection refused".to_string()));
            }
            Ok(vec![candidate(&format!("dbr:{}", request.mention_text), 0.9)])
        }

        fn name(&self) -> &str {
            "outage"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_document_runs_are_serialized() {
        let oracle = Arc::new(OutageOracle {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let coordinator = coordinator_with(oracle.clone(), config());
        let document = Document::with_id("doc-6", "Obama visited Berlin.").language("en");

        let (first, second) = tokio::join!(
            coordinator.process(&document),
            coordinator.process(&document)
        );

        assert_eq!(first.failure(), Some(&FailureReason::OracleUnavailable));
        assert!(second.is_completed());
        assert_eq!(second.annotations.len(), 2);
        assert_eq!(coordinator.state("doc-6"), Some(DocumentState::Completed));
        assert_eq!(coordinator.graph().annotations("doc-6"), second.annotations);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 4);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_unreachable_fails_document() {
        let oracle = Arc::new(UnreachableOracle::default());
        let coordinator = coordinator_with(oracle.clone(), config());
        let outcome = coordinator.process(&scenario()).await;

        assert_eq!(outcome.failure(), Some(&FailureReason::OracleUnavailable));
        assert!(outcome.annotations.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
        assert!(
            outcome
                .skipped
                .iter()
                .all(|s| matches!(s.reason, SkipReason::OracleFailure(_)))
        );
        assert!(coordinator.graph().annotations("doc-1").is_empty());
        // Testing preset: no retries.
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_failure_is_partial() {
        let oracle = ScriptedOracle::default()
            .answer("Obama", vec![candidate("dbr:Barack_Obama", 0.9)])
            .fail("Angela Merkel")
            .answer("Berlin", vec![candidate("dbr:Berlin", 0.8)]);
        let coordinator = coordinator_with(Arc::new(oracle), config());
        let outcome = coordinator.process(&scenario()).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.annotations.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].mention.surface_form, "Angela Merkel");
    }

    #[tokio::test]
    async fn test_single_mention_failure_completes() {
        let oracle = Arc::new(UnreachableOracle::default());
        let coordinator = coordinator_with(oracle, config());
        let document = Document::with_id("doc-3", "Berlin is big.").language("en");
        let outcome = coordinator.process(&document).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_unbuilt_gazetteer_is_configuration_error() {
        let config = config();
        let coordinator = spotlink::build_coordinator(
            &config,
            Gazetteer::unbuilt(),
            AnnotationGraph::new(),
        )
        .unwrap();
        let outcome = coordinator.process(&scenario()).await;

        assert!(matches!(
            outcome.failure(),
            Some(FailureReason::ConfigurationError(_))
        ));
        assert!(matches!(
            coordinator.state("doc-1"),
            Some(DocumentState::Failed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_recover_transient_failures() {
        #[derive(Debug, Default)]
        struct FlakyOracle {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl EntityScoringOracle for FlakyOracle {
            async fn score(
                &self,
                request: &ScoringRequest,
            ) -> Result<Vec<EntityCandidate>, OracleError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(OracleError::Timeout(Duration::from_secs(1)));
                }
                Ok(vec![candidate(
                    &format!("dbr:{}", request.mention_text),
                    0.5,
                )])
            }

            fn name(&self) -> &str {
                "flaky"
            }
        }

        let mut config = config();
        config.pipeline.retry = RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(1),
        };
        let oracle = Arc::new(FlakyOracle::default());
        let coordinator = coordinator_with(oracle.clone(), config);
        let document = Document::with_id("doc-4", "Berlin is big.").language("en");
        let outcome = coordinator.process(&document).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    }
}

#[cfg(test)]
mod ordering_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_flush_follows_start_offsets() {
        // Later mentions answer first.
        let oracle = ScriptedOracle::default()
            .answer("Obama", vec![candidate("dbr:Barack_Obama", 0.9)])
            .answer("Angela Merkel", vec![candidate("dbr:Angela_Merkel", 0.9)])
            .answer("Berlin", vec![candidate("dbr:Berlin", 0.8)])
            .delay("Obama", Duration::from_millis(300))
            .delay("Angela Merkel", Duration::from_millis(200))
            .delay("Berlin", Duration::from_millis(10));
        let coordinator = coordinator_with(Arc::new(oracle), config());
        let outcome = coordinator.process(&scenario()).await;

        let starts: Vec<usize> = coordinator
            .graph()
            .annotations("doc-1")
            .iter()
            .map(|a| a.start())
            .collect();
        assert_eq!(starts.len(), 3);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(outcome.annotations.len(), 3);
    }
}

#[cfg(test)]
mod cancellation_tests {
    use super::*;

    /// Oracle that cancels the run when asked about one mention.
    #[derive(Debug)]
    struct CancellingOracle {
        token: CancellationToken,
        trigger: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EntityScoringOracle for CancellingOracle {
        async fn score(
            &self,
            request: &ScoringRequest,
        ) -> Result<Vec<EntityCandidate>, OracleError> {
            self.seen.lock().unwrap().push(request.mention_text.clone());
            if request.mention_text == self.trigger {
                self.token.cancel();
            }
            Ok(vec![candidate(&format!("dbr:{}", request.mention_text), 0.9)])
        }

        fn name(&self) -> &str {
            "cancelling"
        }
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let coordinator = local_coordinator();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = coordinator
            .process_with_cancel(&scenario(), &token)
            .await;
        assert_eq!(outcome.failure(), Some(&FailureReason::Cancelled));
        assert!(outcome.annotations.is_empty());
        assert!(coordinator.graph().annotations("doc-1").is_empty());
    }

    #[tokio::test]
    async fn test_flushed_annotations_survive_cancellation() {
        let token = CancellationToken::new();
        let oracle = Arc::new(CancellingOracle {
            token: token.clone(),
            trigger: "Angela Merkel".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let config = ConfigBuilder::testing()
            .with_concurrency(1, 1)
            .build()
            .unwrap();
        let coordinator = coordinator_with(oracle.clone(), config);

        let outcome = coordinator.process_with_cancel(&scenario(), &token).await;

        assert_eq!(outcome.failure(), Some(&FailureReason::Cancelled));
        assert_eq!(outcome.annotations.len(), 1);
        assert_eq!(outcome.annotations[0].mention.surface_form, "Obama");
        assert_eq!(coordinator.graph().annotations("doc-1").len(), 1);
        // Berlin was never sent to the oracle.
        assert_eq!(
            *oracle.seen.lock().unwrap(),
            vec!["Obama".to_string(), "Angela Merkel".to_string()]
        );
    }
}

#[cfg(test)]
mod capability_tests {
    use super::*;

    #[test]
    fn test_can_enhance() {
        let coordinator = local_coordinator();

        let english = Document::with_id("a", SCENARIO).language("EN-us");
        assert_eq!(coordinator.can_enhance(&english), EnhancementCapability::Async);

        let untagged = Document::with_id("b", SCENARIO);
        assert_eq!(
            coordinator.can_enhance(&untagged),
            EnhancementCapability::Unsupported
        );

        let german = Document::with_id("c", SCENARIO).language("de");
        assert_eq!(
            coordinator.can_enhance(&german),
            EnhancementCapability::Unsupported
        );

        let blank = Document::with_id("d", "   ").language("en");
        assert_eq!(
            coordinator.can_enhance(&blank),
            EnhancementCapability::Unsupported
        );
    }

    #[test]
    fn test_supported_languages_are_configurable() {
        let config = ConfigBuilder::testing()
            .with_supported_languages(["en", "de"])
            .build()
            .unwrap();
        let coordinator =
            spotlink::build_coordinator(&config, gazetteer(), AnnotationGraph::new()).unwrap();

        let german = Document::with_id("c", SCENARIO).language("de-AT");
        assert_eq!(coordinator.can_enhance(&german), EnhancementCapability::Async);
    }
}

#[cfg(test)]
mod mode_tests {
    use super::*;

    #[tokio::test]
    async fn test_process_existing_links_upstream_annotations() {
        let coordinator = local_coordinator();
        let document = scenario();
        let start = SCENARIO.find("Obama").unwrap();
        coordinator
            .graph()
            .append(
                TextAnnotation::new("doc-1", start, start + 5, "Obama", "upstream.ner")
                    .with_type_hint("Person"),
            )
            .await;

        let outcome = coordinator.process_existing(&document).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.annotations.len(), 1);
        let annotation = &outcome.annotations[0];
        assert_eq!(annotation.selected_entity.entity_id, "dbr:Barack_Obama");
        assert_eq!(annotation.mention.type_hint.as_deref(), Some("Person"));

        // Upstream entries are kept alongside the new annotation.
        assert_eq!(coordinator.graph().len("doc-1"), 2);
        assert_eq!(coordinator.graph().text_annotations("doc-1").len(), 1);
    }

    #[tokio::test]
    async fn test_process_all_keeps_input_order() {
        let coordinator = local_coordinator();
        let documents = vec![
            Document::with_id("a", "Obama spoke.").language("en"),
            Document::with_id("b", "Nothing here.").language("en"),
            Document::with_id("c", "Berlin and Angela Merkel.").language("en"),
        ];

        let outcomes = coordinator.process_all(&documents).await;

        let ids: Vec<&str> = outcomes.iter().map(|o| o.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let counts: Vec<usize> = outcomes.iter().map(|o| o.annotations.len()).collect();
        assert_eq!(counts, vec![1, 0, 2]);
        assert!(outcomes.iter().all(|o| o.is_completed()));

        let states = coordinator.tracker().snapshot();
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|(_, state)| state.is_completed()));
    }
}
