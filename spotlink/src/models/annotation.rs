//! Annotation records written to the annotation graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Mention;

/// Namespace for deterministic annotation identifiers.
const ANNOTATION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_5b3d_4c71_9e0a_d4f2_b817_c35a);

/// A knowledge-base entity proposed for a mention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityCandidate {
    /// Canonical entity identifier
    pub entity_id: String,
    /// Human readable label
    pub label: String,
    /// Optional entity type (e.g. "Person")
    pub type_hint: Option<String>,
    /// Confidence in [0, 1], comparable only across candidates of one mention
    pub score: f32,
}

impl EntityCandidate {
    /// Create a new candidate without a type hint.
    pub fn new(entity_id: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self {
            entity_id: entity_id.into(),
            label: label.into(),
            type_hint: None,
            score,
        }
    }

    /// Attach a type hint.
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Whether the score is a usable confidence value.
    pub fn has_valid_score(&self) -> bool {
        self.score.is_finite() && (0.0..=1.0).contains(&self.score)
    }
}

/// The persisted outcome of linking one mention to one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    /// Deterministic identifier (document, span, producer)
    pub id: Uuid,
    /// Document the annotation belongs to
    pub document_id: String,
    /// The linked mention
    pub mention: Mention,
    /// The top-scoring candidate
    pub selected_entity: EntityCandidate,
    /// Candidates in oracle order, bounded in length, always containing the selection
    pub all_candidates: Vec<EntityCandidate>,
    /// When the annotation was produced
    pub extraction_timestamp: DateTime<Utc>,
    /// Engine that asserted the annotation
    pub producer_id: String,
}

impl Annotation {
    /// Derive the identifier an annotation for this span and producer will carry.
    pub fn derive_id(document_id: &str, start: usize, end: usize, producer_id: &str) -> Uuid {
        let name = format!("{document_id}\u{1f}{start}\u{1f}{end}\u{1f}{producer_id}");
        Uuid::new_v5(&ANNOTATION_NAMESPACE, name.as_bytes())
    }

    /// Start offset of the linked mention.
    pub fn start(&self) -> usize {
        self.mention.start
    }

    /// Get a formatted string representation of the annotation.
    pub fn format(&self) -> String {
        format!(
            "{} => {} [{}] (score: {:.2}, candidates: {}, producer: {})",
            self.mention.surface_form,
            self.selected_entity.entity_id,
            self.selected_entity.label,
            self.selected_entity.score,
            self.all_candidates.len(),
            self.producer_id
        )
    }
}

/// An upstream assertion that a span mentions something.
///
/// Written by engines earlier in the chain; the disambiguation engine reads
/// type hints from these and can link them directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextAnnotation {
    /// Deterministic identifier (document, span, producer)
    pub id: Uuid,
    /// Document the annotation belongs to
    pub document_id: String,
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Selected text at the span
    pub selected_text: String,
    /// Selection context, if the producer recorded one
    pub context: Option<String>,
    /// Asserted entity type
    pub type_hint: Option<String>,
    /// Engine that asserted the span
    pub producer_id: String,
    /// When the span was asserted
    pub timestamp: DateTime<Utc>,
}

impl TextAnnotation {
    /// Create a text annotation for a span of the given text.
    pub fn new(
        document_id: impl Into<String>,
        start: usize,
        end: usize,
        selected_text: impl Into<String>,
        producer_id: impl Into<String>,
    ) -> Self {
        let document_id = document_id.into();
        let producer_id = producer_id.into();
        Self {
            id: Annotation::derive_id(&document_id, start, end, &producer_id),
            document_id,
            start,
            end,
            selected_text: selected_text.into(),
            context: None,
            type_hint: None,
            producer_id,
            timestamp: Utc::now(),
        }
    }

    /// Attach an asserted type.
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Attach the selection context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
