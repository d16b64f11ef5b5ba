//! Enhancement pipeline coordination.
//!
//! The [`EnhancementCoordinator`] runs spotting and disambiguation for each
//! document, tracks its [`DocumentState`], applies the per-mention
//! [`RetryPolicy`] and decides when oracle failures fail the whole document.
//!
//! Callers check [`EnhancementCoordinator::can_enhance`] before invoking
//! [`EnhancementCoordinator::process`]:
//!
//! ```no_run
//! # async fn run(coordinator: spotlink::pipeline::EnhancementCoordinator) {
//! use spotlink::models::Document;
//! use spotlink::pipeline::EnhancementCapability;
//!
//! let document = Document::new("President Obama is meeting Angela Merkel.").language("en");
//! if coordinator.can_enhance(&document) == EnhancementCapability::Async {
//!     let outcome = coordinator.process(&document).await;
//!     for annotation in &outcome.annotations {
//!         println!("{}", annotation.format());
//!     }
//! }
//! # }
//! ```

mod cancel;
mod coordinator;
mod retry;
mod state;

pub use cancel::CancellationToken;
pub use coordinator::{
    DocumentOutcome, EnhancementCapability, EnhancementCoordinator, SkipReason, SkippedMention,
};
pub use retry::RetryPolicy;
pub use state::{DocumentState, FailureReason, InvalidTransition, StateTracker};

use serde::{Deserialize, Serialize};

/// Configuration for the enhancement coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Primary language subtags the engine accepts (case-insensitive)
    pub supported_languages: Vec<String>,
    /// Maximum documents processed at once by `process_all`
    pub max_concurrent_documents: usize,
    /// Retry policy for recoverable oracle failures
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            supported_languages: vec!["en".to_string()],
            max_concurrent_documents: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Check if a primary language subtag is supported.
    pub fn supports_language(&self, primary: &str) -> bool {
        self.supported_languages
            .iter()
            .any(|language| language.eq_ignore_ascii_case(primary))
    }
}
