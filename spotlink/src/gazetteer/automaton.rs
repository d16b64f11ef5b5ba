//! Token trie and longest-match traversal.

use super::{EntityRecord, LookupError, MatchConfig};
use crate::models::MatchKind;
use crate::spotting::{Token, Tokenizer};
use std::collections::HashMap;
use std::sync::Arc;

/// Trie node. Edges are kept sorted by token id for binary search.
#[derive(Debug, Clone, Default)]
struct Node {
    edges: Vec<(u32, u32)>,
    outputs: Vec<u32>,
}

impl Node {
    fn child(&self, token: u32) -> Option<u32> {
        self.edges
            .binary_search_by_key(&token, |&(t, _)| t)
            .ok()
            .map(|idx| self.edges[idx].1)
    }
}

/// A surface form stored at a trie node.
#[derive(Debug, Clone)]
struct SurfaceEntry {
    text: String,
    /// Tokens in their original casing
    tokens: Vec<String>,
    entities: Vec<u32>,
}

/// A surface form found in a token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerMatch {
    /// Index of the first matched token
    pub start_token: usize,
    /// Index one past the last matched token
    pub end_token: usize,
    /// Start byte offset in the source text
    pub start: usize,
    /// End byte offset in the source text
    pub end: usize,
    /// Stored surface form that matched
    pub surface_form: String,
    /// Canonical label of the first entity
    pub label: String,
    /// Canonical entity ids, redirects already resolved
    pub entity_ids: Vec<String>,
    /// How the surface form matched
    pub kind: MatchKind,
}

impl GazetteerMatch {
    /// Number of tokens covered by the match.
    pub fn token_len(&self) -> usize {
        self.end_token - self.start_token
    }
}

/// Read-only automaton over entity surface forms.
pub struct GazetteerAutomaton {
    tokenizer: Arc<dyn Tokenizer>,
    config: MatchConfig,
    /// Case-folded token text to token id
    vocabulary: HashMap<String, u32>,
    /// Token id to case-folded text
    token_texts: Vec<String>,
    nodes: Vec<Node>,
    surface_forms: Vec<SurfaceEntry>,
    entities: Vec<EntityRecord>,
    entity_index: HashMap<String, u32>,
}

impl std::fmt::Debug for GazetteerAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazetteerAutomaton")
            .field("tokenizer", &self.tokenizer.name())
            .field("config", &self.config)
            .field("entities", &self.entities.len())
            .field("surface_forms", &self.surface_forms.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

fn fold(token: &str) -> String {
    token.to_lowercase()
}

fn kind_rank(kind: &MatchKind) -> (u8, u8) {
    match kind {
        MatchKind::Exact => (0, 0),
        MatchKind::CaseFolded => (1, 0),
        MatchKind::Fuzzy { edits } => (2, *edits),
        MatchKind::Asserted => (3, 0),
    }
}

impl GazetteerAutomaton {
    /// Assemble the trie from validated entities and resolved surface forms.
    ///
    /// Each surface form carries indices into `entities`.
    pub(super) fn assemble(
        tokenizer: Arc<dyn Tokenizer>,
        config: MatchConfig,
        entities: Vec<EntityRecord>,
        surfaces: Vec<(String, Vec<u32>)>,
    ) -> Result<Self, LookupError> {
        let entity_index = entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| (entity.id.clone(), idx as u32))
            .collect();

        let mut automaton = Self {
            tokenizer,
            config,
            vocabulary: HashMap::new(),
            token_texts: Vec::new(),
            nodes: vec![Node::default()],
            surface_forms: Vec::new(),
            entities,
            entity_index,
        };

        for (text, entity_refs) in surfaces {
            automaton.insert(text, entity_refs)?;
        }

        Ok(automaton)
    }

    fn intern(&mut self, folded: String) -> u32 {
        if let Some(&id) = self.vocabulary.get(&folded) {
            return id;
        }
        let id = self.token_texts.len() as u32;
        self.token_texts.push(folded.clone());
        self.vocabulary.insert(folded, id);
        id
    }

    fn insert(&mut self, text: String, entity_refs: Vec<u32>) -> Result<(), LookupError> {
        let tokens = self.tokenizer.tokenize(&text, None);
        if tokens.is_empty() {
            return Err(LookupError::Malformed(format!(
                "surface form '{text}' contains no tokens"
            )));
        }

        let mut node = 0usize;
        for token in &tokens {
            let id = self.intern(fold(&token.text));
            let next = self.nodes.len() as u32;
            let edges = &mut self.nodes[node].edges;
            node = match edges.binary_search_by_key(&id, |&(t, _)| t) {
                Ok(idx) => edges[idx].1 as usize,
                Err(pos) => {
                    edges.insert(pos, (id, next));
                    self.nodes.push(Node::default());
                    next as usize
                }
            };
        }

        let original: Vec<String> = tokens.into_iter().map(|t| t.text).collect();

        // Same spelling registered twice: merge entity lists.
        let existing = self.nodes[node]
            .outputs
            .iter()
            .copied()
            .find(|&idx| self.surface_forms[idx as usize].tokens == original);
        if let Some(idx) = existing {
            let entry = &mut self.surface_forms[idx as usize];
            for entity in entity_refs {
                if !entry.entities.contains(&entity) {
                    entry.entities.push(entity);
                }
            }
            return Ok(());
        }

        let idx = self.surface_forms.len() as u32;
        self.surface_forms.push(SurfaceEntry {
            text,
            tokens: original,
            entities: entity_refs,
        });
        self.nodes[node].outputs.push(idx);
        Ok(())
    }

    /// Tokenize text with the tokenizer the automaton was built with.
    pub fn tokenize(&self, text: &str, language: Option<&str>) -> Vec<Token> {
        self.tokenizer.tokenize(text, language)
    }

    /// Matching configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Look up an entity by canonical id.
    pub fn entity(&self, id: &str) -> Option<&EntityRecord> {
        self.entity_index
            .get(id)
            .map(|&idx| &self.entities[idx as usize])
    }

    /// All entities, in build order.
    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Number of distinct surface forms.
    pub fn surface_form_count(&self) -> usize {
        self.surface_forms.len()
    }

    /// Number of trie nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn entity_ids(&self, refs: impl IntoIterator<Item = u32>) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for idx in refs {
            let id = &self.entities[idx as usize].id;
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Entities registered under a surface form.
    ///
    /// Follows the exact token path of the (case-folded) text. Exact-case
    /// spellings take precedence; other casings are only returned when case
    /// folding is enabled.
    pub fn lookup_surface(&self, text: &str) -> Vec<EntityRecord> {
        let tokens = self.tokenizer.tokenize(text, None);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut node = 0u32;
        for token in &tokens {
            let Some(id) = self.vocabulary.get(&fold(&token.text)) else {
                return Vec::new();
            };
            let Some(child) = self.nodes[node as usize].child(*id) else {
                return Vec::new();
            };
            node = child;
        }

        let originals: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        self.classify(node, &originals, 0)
            .map(|(_, _, refs)| {
                self.entity_ids(refs)
                    .iter()
                    .filter_map(|id| self.entity(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decide how a node's outputs matched the given document tokens.
    ///
    /// Returns the match kind, the representative surface form and the entity refs.
    fn classify(&self, node: u32, originals: &[&str], edits: u8) -> Option<(MatchKind, &str, Vec<u32>)> {
        let outputs = &self.nodes[node as usize].outputs;
        if outputs.is_empty() {
            return None;
        }

        if edits > 0 {
            let refs = outputs
                .iter()
                .flat_map(|&idx| self.surface_forms[idx as usize].entities.iter().copied())
                .collect();
            let text = &self.surface_forms[outputs[0] as usize].text;
            return Some((MatchKind::Fuzzy { edits }, text.as_str(), refs));
        }

        let exact: Vec<&SurfaceEntry> = outputs
            .iter()
            .map(|&idx| &self.surface_forms[idx as usize])
            .filter(|entry| {
                entry.tokens.len() == originals.len()
                    && entry.tokens.iter().zip(originals).all(|(a, b)| a == b)
            })
            .collect();

        if let Some(first) = exact.first() {
            let refs = exact
                .iter()
                .flat_map(|entry| entry.entities.iter().copied())
                .collect();
            return Some((MatchKind::Exact, first.text.as_str(), refs));
        }

        if self.config.case_insensitive {
            let refs = outputs
                .iter()
                .flat_map(|&idx| self.surface_forms[idx as usize].entities.iter().copied())
                .collect();
            let text = &self.surface_forms[outputs[0] as usize].text;
            return Some((MatchKind::CaseFolded, text.as_str(), refs));
        }

        None
    }

    /// Every surface form starting at token `start`, longest first.
    ///
    /// Among matches of equal length exact matches come before case-folded
    /// ones, which come before fuzzy ones (fewest edits first).
    pub fn matches_at(&self, tokens: &[Token], start: usize) -> Vec<GazetteerMatch> {
        if start >= tokens.len() {
            return Vec::new();
        }

        let max_edits = if self.config.fuzzy {
            self.config.max_edit_distance
        } else {
            0
        };

        // (end_token, node) -> fewest edits reaching it
        let mut reached: HashMap<(usize, u32), u8> = HashMap::new();
        let mut stack: Vec<(u32, usize, u8)> = vec![(0, start, 0)];

        while let Some((node, pos, edits)) = stack.pop() {
            if pos > start {
                let best = reached.entry((pos, node)).or_insert(edits);
                if edits < *best {
                    *best = edits;
                }
            }
            if pos >= tokens.len() {
                continue;
            }

            let folded = fold(&tokens[pos].text);
            let exact_id = self.vocabulary.get(&folded).copied();
            let current = &self.nodes[node as usize];

            if let Some(child) = exact_id.and_then(|id| current.child(id)) {
                stack.push((child, pos + 1, edits));
            }

            if max_edits > edits && folded.chars().count() >= self.config.min_fuzzy_token_chars {
                for &(token_id, child) in &current.edges {
                    if Some(token_id) == exact_id {
                        continue;
                    }
                    let candidate = &self.token_texts[token_id as usize];
                    if candidate.chars().count() < self.config.min_fuzzy_token_chars {
                        continue;
                    }
                    let distance = strsim::levenshtein(&folded, candidate);
                    if distance > 0 && edits as usize + distance <= max_edits as usize {
                        stack.push((child, pos + 1, edits + distance as u8));
                    }
                }
            }
        }

        let mut matches: Vec<GazetteerMatch> = reached
            .into_iter()
            .filter_map(|((end_token, node), edits)| {
                let originals: Vec<&str> = tokens[start..end_token]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect();
                let (kind, surface, refs) = self.classify(node, &originals, edits)?;
                let entity_ids = self.entity_ids(refs);
                let label = entity_ids
                    .first()
                    .and_then(|id| self.entity(id))
                    .map(|entity| entity.label.clone())?;
                Some(GazetteerMatch {
                    start_token: start,
                    end_token,
                    start: tokens[start].start,
                    end: tokens[end_token - 1].end,
                    surface_form: surface.to_string(),
                    label,
                    entity_ids,
                    kind,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.end_token
                .cmp(&a.end_token)
                .then_with(|| kind_rank(&a.kind).cmp(&kind_rank(&b.kind)))
                .then_with(|| a.surface_form.cmp(&b.surface_form))
        });
        matches
    }

    /// The longest surface form starting at token `start`.
    pub fn longest_match(&self, tokens: &[Token], start: usize) -> Option<GazetteerMatch> {
        self.matches_at(tokens, start).into_iter().next()
    }
}
