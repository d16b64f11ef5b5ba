//! Simplified Spotlink API
//!
//! A single handle owning the gazetteer, the annotation graph and the
//! coordinator, for applications that do not need to wire engines by hand.

use crate::config::{ConfigBuilder, SpotlinkConfig};
use crate::gazetteer::{Gazetteer, GazetteerAutomaton};
use crate::graph::AnnotationGraph;
use crate::logging::LoggingGuard;
use crate::models::{Annotation, Document};
use crate::pipeline::{
    CancellationToken, DocumentOutcome, EnhancementCapability, EnhancementCoordinator,
};
use crate::{Result, SpotlinkError};

/// Simplified Spotlink interface
///
/// # Examples
///
/// ```rust,no_run
/// use spotlink::Spotlink;
/// use spotlink::models::Document;
///
/// async fn example() -> spotlink::Result<()> {
///     let spotlink = Spotlink::new().await?;
///     let document = Document::new("Angela Merkel lives in Berlin.").language("en");
///     let outcome = spotlink.enhance(&document).await?;
///     println!("{} annotations", outcome.annotations.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Spotlink {
    config: SpotlinkConfig,
    gazetteer: Gazetteer,
    graph: AnnotationGraph,
    coordinator: EnhancementCoordinator,
    _logging: LoggingGuard,
}

impl Spotlink {
    /// Create a Spotlink instance from configuration files and environment
    ///
    /// Reads `spotlink.{toml,yaml,json}`, `.spotlink/config.*` and the user
    /// config directory, then `SPOTLINK_*` environment variables.
    pub async fn new() -> Result<Self> {
        let config = crate::config::ConfigLoader::new()
            .load_default_files()
            .load_env()
            .extract()?;
        crate::init(config).await
    }

    /// Create a Spotlink instance optimized for testing, serving an already
    /// built automaton through the local oracle
    pub async fn for_testing(automaton: GazetteerAutomaton) -> Result<Self> {
        let config = ConfigBuilder::testing().build()?;
        Self::with_gazetteer(config, Gazetteer::from_automaton(automaton)).await
    }

    /// Create a Spotlink instance over a caller-provided gazetteer
    pub async fn with_gazetteer(config: SpotlinkConfig, gazetteer: Gazetteer) -> Result<Self> {
        let logging = crate::logging::init(&config.logging)?;
        crate::config::validate_config(&config)?;
        Self::assemble(config, gazetteer, logging)
    }

    pub(crate) fn assemble(
        config: SpotlinkConfig,
        gazetteer: Gazetteer,
        logging: LoggingGuard,
    ) -> Result<Self> {
        let graph = AnnotationGraph::new();
        let coordinator = crate::build_coordinator(&config, gazetteer.clone(), graph.clone())?;
        Ok(Self {
            config,
            gazetteer,
            graph,
            coordinator,
            _logging: logging,
        })
    }

    /// Install the automaton into a still-unbuilt gazetteer
    ///
    /// Returns `false` if one was already installed.
    pub fn install_gazetteer(&self, automaton: GazetteerAutomaton) -> bool {
        self.gazetteer.install(automaton)
    }

    /// Check and enhance a document
    ///
    /// Fails with [`SpotlinkError::Unsupported`] when the document cannot be
    /// enhanced; otherwise returns the outcome, which may itself be `Failed`.
    pub async fn enhance(&self, document: &Document) -> Result<DocumentOutcome> {
        self.enhance_with_cancel(document, &CancellationToken::new())
            .await
    }

    /// Check and enhance a document, stopping early if `cancel` fires
    pub async fn enhance_with_cancel(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<DocumentOutcome> {
        if self.coordinator.can_enhance(document) == EnhancementCapability::Unsupported {
            return Err(SpotlinkError::Unsupported {
                document_id: document.id.clone(),
            });
        }
        Ok(self.coordinator.process_with_cancel(document, cancel).await)
    }

    /// Annotations recorded for a document
    pub fn annotations(&self, document_id: &str) -> Vec<Annotation> {
        self.graph.annotations(document_id)
    }

    /// The coordinator, for advanced usage
    pub fn coordinator(&self) -> &EnhancementCoordinator {
        &self.coordinator
    }

    /// The annotation graph
    pub fn graph(&self) -> &AnnotationGraph {
        &self.graph
    }

    /// The gazetteer slot
    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Active configuration
    pub fn config(&self) -> &SpotlinkConfig {
        &self.config
    }
}
