//! Builder for gazetteer automata.

use super::artifact::{ArtifactPayload, RedirectRecord, SurfaceFormRecord};
use super::{EntityRecord, GazetteerAutomaton, LookupError, MatchConfig};
use crate::spotting::{RegexTokenizer, Tokenizer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Builder for creating gazetteer automata.
///
/// Aliases and redirects are resolved when [`build`](Self::build) runs, so a
/// surface form registered against a redirected id ends up pointing at the
/// canonical entity.
///
/// # Example
///
/// ```
/// use spotlink::gazetteer::{EntityRecord, GazetteerBuilder};
///
/// let automaton = GazetteerBuilder::new()
///     .entity(EntityRecord::new("E1", "Angela Merkel").prior(0.9))
///     .alias("Merkel", "E1")
///     .build()
///     .unwrap();
/// assert_eq!(automaton.surface_form_count(), 2);
/// ```
#[derive(Debug)]
pub struct GazetteerBuilder {
    tokenizer: Arc<dyn Tokenizer>,
    config: MatchConfig,
    entities: Vec<EntityRecord>,
    surface_forms: Vec<SurfaceFormRecord>,
    redirects: Vec<RedirectRecord>,
}

impl GazetteerBuilder {
    /// Create a new builder using the default tokenizer and match config.
    pub fn new() -> Self {
        Self {
            tokenizer: Arc::new(RegexTokenizer::new()),
            config: MatchConfig::default(),
            entities: Vec::new(),
            surface_forms: Vec::new(),
            redirects: Vec::new(),
        }
    }

    /// Create a builder pre-populated from an artifact payload.
    pub fn from_payload(payload: ArtifactPayload) -> Self {
        Self {
            entities: payload.entities,
            surface_forms: payload.surface_forms,
            redirects: payload.redirects,
            ..Self::new()
        }
    }

    /// Set the tokenizer used to split surface forms.
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Set the matching configuration.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an entity and its label as a surface form.
    pub fn entity(mut self, record: EntityRecord) -> Self {
        self.surface_forms
            .push(SurfaceFormRecord::new(record.label.clone(), [record.id.clone()]));
        self.entities.push(record);
        self
    }

    /// Register an entity without adding its label as a surface form.
    pub fn entity_record(mut self, record: EntityRecord) -> Self {
        self.entities.push(record);
        self
    }

    /// Register an additional surface form for an entity.
    pub fn alias(mut self, surface: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_id: String = entity_id.into();
        self.surface_forms
            .push(SurfaceFormRecord::new(surface, [entity_id]));
        self
    }

    /// Redirect one entity id to another.
    pub fn redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.push(RedirectRecord {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Snapshot of the raw builder contents, suitable for sealing as an artifact.
    pub fn payload(&self) -> ArtifactPayload {
        ArtifactPayload {
            entities: self.entities.clone(),
            surface_forms: self.surface_forms.clone(),
            redirects: self.redirects.clone(),
        }
    }

    /// Validate the raw contents without building.
    pub fn validate(&self) -> Result<(), LookupError> {
        self.resolve().map(|_| ())
    }

    /// Follow redirect chains and map surface forms to entity indices.
    fn resolve(&self) -> Result<(Vec<EntityRecord>, Vec<(String, Vec<u32>)>), LookupError> {
        let mut index: HashMap<&str, u32> = HashMap::new();
        for (idx, entity) in self.entities.iter().enumerate() {
            if entity.id.trim().is_empty() {
                return Err(LookupError::Malformed("entity with empty id".to_string()));
            }
            if !entity.prior.is_finite() || !(0.0..=1.0).contains(&entity.prior) {
                return Err(LookupError::Malformed(format!(
                    "entity '{}' has prior {} outside [0, 1]",
                    entity.id, entity.prior
                )));
            }
            if index.insert(entity.id.as_str(), idx as u32).is_some() {
                return Err(LookupError::Malformed(format!(
                    "duplicate entity id '{}'",
                    entity.id
                )));
            }
        }

        let mut redirects: HashMap<&str, &str> = HashMap::new();
        for redirect in &self.redirects {
            if redirects
                .insert(redirect.from.as_str(), redirect.to.as_str())
                .is_some()
            {
                return Err(LookupError::Malformed(format!(
                    "entity '{}' is redirected more than once",
                    redirect.from
                )));
            }
        }

        // Every chain must end at a known entity, referenced or not.
        let mut resolved: HashMap<&str, u32> = HashMap::new();
        for redirect in &self.redirects {
            let mut chain: Vec<&str> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut current = redirect.from.as_str();
            let target = loop {
                if let Some(&idx) = resolved.get(current) {
                    break idx;
                }
                if !seen.insert(current) {
                    return Err(LookupError::Malformed(format!(
                        "redirect cycle through '{}'",
                        redirect.from
                    )));
                }
                match redirects.get(current) {
                    Some(&next) => {
                        chain.push(current);
                        current = next;
                    }
                    None => {
                        break index.get(current).copied().ok_or_else(|| {
                            LookupError::Malformed(format!(
                                "redirect '{}' ends at unknown entity '{current}'",
                                redirect.from
                            ))
                        })?;
                    }
                }
            };
            for id in chain {
                resolved.insert(id, target);
            }
        }

        let canonical = |id: &str| -> Result<u32, LookupError> {
            if let Some(&idx) = resolved.get(id) {
                return Ok(idx);
            }
            index.get(id).copied().ok_or_else(|| {
                LookupError::Malformed(format!("unknown entity '{id}'"))
            })
        };

        let mut surfaces = Vec::with_capacity(self.surface_forms.len());
        for record in &self.surface_forms {
            if record.surface.trim().is_empty() {
                return Err(LookupError::Malformed("empty surface form".to_string()));
            }
            if record.entity_ids.is_empty() {
                return Err(LookupError::Malformed(format!(
                    "surface form '{}' references no entities",
                    record.surface
                )));
            }
            let mut refs = Vec::with_capacity(record.entity_ids.len());
            for id in &record.entity_ids {
                let idx = canonical(id)?;
                if !refs.contains(&idx) {
                    refs.push(idx);
                }
            }
            surfaces.push((record.surface.clone(), refs));
        }

        Ok((self.entities.clone(), surfaces))
    }

    /// Build the automaton.
    pub fn build(self) -> Result<GazetteerAutomaton, LookupError> {
        let (entities, surfaces) = self.resolve()?;
        debug!(
            "Building gazetteer automaton: {} entities, {} surface forms, {} redirects",
            entities.len(),
            surfaces.len(),
            self.redirects.len()
        );
        GazetteerAutomaton::assemble(self.tokenizer, self.config, entities, surfaces)
    }
}

impl Default for GazetteerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
