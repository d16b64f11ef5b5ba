//! # Spotlink
//!
//! Entity linking over free text. Spotlink finds spans of a document that
//! mention known real-world entities (spotting, driven by a gazetteer of
//! surface forms) and decides which entity each span refers to
//! (disambiguation, delegated to a local or remote scoring oracle). Results
//! are written as annotations to an append-only annotation graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use spotlink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let automaton = GazetteerBuilder::new()
//!         .entity(EntityRecord::new("dbr:Barack_Obama", "Barack Obama").type_hint("Person").prior(0.9))
//!         .alias("Obama", "dbr:Barack_Obama")
//!         .entity(EntityRecord::new("dbr:Berlin", "Berlin").type_hint("Place").prior(0.8))
//!         .build()?;
//!
//!     let spotlink = Spotlink::for_testing(automaton).await?;
//!     let document = Document::new("President Obama is visiting Berlin.").language("en");
//!
//!     let outcome = spotlink.enhance(&document).await?;
//!     for annotation in &outcome.annotations {
//!         println!("{}", annotation.format());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Gazetteer**: build-once token trie over surface forms, loadable from a
//!   checksummed artifact
//! - **Spotting**: longest-match scan producing mentions with context
//! - **Disambiguation**: oracle-backed candidate ranking and selection
//! - **Pipeline**: per-document state machine, retries, partial-failure policy
//! - **Graph**: append-only, single-writer-per-document annotation store

pub mod config;
pub mod disambiguation;
pub mod gazetteer;
pub mod graph;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod simple;
pub mod spotting;

pub use simple::Spotlink;

use std::sync::Arc;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::simple::Spotlink;

    pub use crate::{build_coordinator, init};

    pub use crate::config::{ConfigBuilder, ConfigLoader, LogLevel, SpotlinkConfig};

    pub use crate::gazetteer::{
        EntityRecord, Gazetteer, GazetteerArtifact, GazetteerAutomaton, GazetteerBuilder,
        LookupError, MatchConfig,
    };

    pub use crate::spotting::{ContextWindow, SpottingConfig, SpottingEngine};

    pub use crate::disambiguation::{
        DisambiguationEngine, EntityScoringOracle, FixedClock, LocalOracle, OracleError,
        RemoteOracle, ScoringRequest,
    };

    pub use crate::pipeline::{
        CancellationToken, DocumentOutcome, DocumentState, EnhancementCapability,
        EnhancementCoordinator, FailureReason,
    };

    pub use crate::graph::AnnotationGraph;

    pub use crate::models::{Annotation, Document, EntityCandidate, Mention, TextAnnotation};

    pub use crate::{Result, SpotlinkError};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Spotlink operations
#[derive(Debug, thiserror::Error)]
pub enum SpotlinkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Gazetteer error
    #[error("Gazetteer error: {0}")]
    Lookup(#[from] crate::gazetteer::LookupError),

    /// Oracle error
    #[error("Oracle error: {0}")]
    Oracle(#[from] crate::disambiguation::OracleError),

    /// Mention does not fit its document
    #[error("Invalid mention: {0}")]
    InvalidMention(#[from] crate::models::InvalidMention),

    /// Annotation graph error
    #[error("Graph error: {0}")]
    Graph(#[from] crate::graph::GraphError),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),

    /// Document cannot be enhanced
    #[error(
        "Document '{document_id}' cannot be enhanced. It needs non-blank text and a language tag listed in pipeline.supported_languages"
    )]
    Unsupported {
        /// The rejected document
        document_id: String,
    },
}

impl From<crate::config::ConfigError> for SpotlinkError {
    fn from(err: crate::config::ConfigError) -> Self {
        SpotlinkError::Configuration(err.to_string())
    }
}

/// Result type for Spotlink operations
pub type Result<T> = std::result::Result<T, SpotlinkError>;

/// Initialize Spotlink with the provided configuration
///
/// Sets up logging, loads the gazetteer artifact if one is configured (the
/// gazetteer otherwise stays unbuilt until installed) and wires the engines
/// into a coordinator.
///
/// # Examples
///
/// ```rust,no_run
/// use spotlink::prelude::*;
///
/// async fn example() -> Result<()> {
///     let config = ConfigBuilder::production()
///         .with_gazetteer_artifact("./gazetteer.json")
///         .with_remote_oracle("http://localhost:2222/rest/candidates")
///         .build()?;
///
///     let spotlink = init(config).await?;
///     let document = Document::new("Angela Merkel lives in Berlin.").language("en");
///     let outcome = spotlink.enhance(&document).await?;
///     Ok(())
/// }
/// ```
pub async fn init(config: config::SpotlinkConfig) -> Result<Spotlink> {
    let logging = logging::init(&config.logging)?;
    config::validate_config(&config)?;

    let gazetteer = match &config.gazetteer.artifact {
        Some(path) => gazetteer::Gazetteer::load(
            path,
            Arc::new(spotting::RegexTokenizer::new()),
            config.gazetteer.matching.clone(),
        )?,
        None => gazetteer::Gazetteer::unbuilt(),
    };

    Spotlink::assemble(config, gazetteer, logging)
}

/// Wire spotting, disambiguation and the pipeline over a gazetteer and graph.
pub fn build_coordinator(
    config: &config::SpotlinkConfig,
    gazetteer: gazetteer::Gazetteer,
    graph: graph::AnnotationGraph,
) -> Result<pipeline::EnhancementCoordinator> {
    let oracle = disambiguation::create_oracle(&config.oracle, &gazetteer)?;
    let spotter = spotting::SpottingEngine::new(gazetteer, config.spotting.clone());
    let disambiguator = disambiguation::DisambiguationEngine::new(
        oracle,
        graph.clone(),
        config.disambiguation.clone(),
    );

    Ok(pipeline::EnhancementCoordinator::new(
        spotter,
        disambiguator,
        graph,
        config.pipeline.clone(),
    ))
}
