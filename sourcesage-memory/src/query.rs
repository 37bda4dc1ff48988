//! Query filters and statistics
//!
//! Every query is a full scan in registry insertion order. Filters are
//! combined with logical AND; an unset filter matches everything.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which side of a relation to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Relations where the entity is the source
    Outgoing,
    /// Relations where the entity is the target
    Incoming,
    /// Either side
    #[default]
    Both,
}

impl Direction {
    pub fn includes_outgoing(self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }

    pub fn includes_incoming(self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }
}

/// Name filter: an unanchored regex search, or a plain substring when the
/// pattern is not a valid regex
#[derive(Debug, Clone)]
pub enum NamePattern {
    Regex(Regex),
    Substring(String),
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Self::Regex(regex),
            Err(e) => {
                log::debug!(
                    "Name pattern {:?} is not a regex ({}), using substring match",
                    pattern,
                    e
                );
                Self::Substring(pattern.to_string())
            }
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(name),
            Self::Substring(needle) => name.contains(needle.as_str()),
        }
    }
}

/// Compile an optional pattern
pub(crate) fn compile(pattern: Option<&str>) -> Option<NamePattern> {
    pattern.map(NamePattern::new)
}

/// Criteria for `KnowledgeGraph::query_entities`
#[derive(Debug, Clone, Default)]
pub struct EntityQuery {
    pub entity_type: Option<String>,
    pub language: Option<String>,
    pub name_pattern: Option<String>,
    /// Scanning stops once this many entities matched. Unset means the
    /// graph's configured default limit.
    pub limit: Option<usize>,
}

impl EntityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Record counts for a knowledge graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_entities: usize,
    pub total_relations: usize,
    pub total_patterns: usize,
    pub total_style_conventions: usize,
    pub entities_by_type: IndexMap<String, usize>,
    /// Entities without a language are not counted here
    pub entities_by_language: IndexMap<String, usize>,
    pub relations_by_type: IndexMap<String, usize>,
    pub patterns_by_language: IndexMap<String, usize>,
}

pub(crate) fn bump(counts: &mut IndexMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}
