//! Knowledge graph of code entities
//!
//! Holds four registries (entities, relations, patterns, style conventions)
//! that share one identifier counter. Registries keep insertion order, and
//! every lookup other than by id is a linear scan in that order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{StoreConfig, DEFAULT_MAX_CONTEXT_DEPTH, DEFAULT_QUERY_LIMIT};
use crate::error::{MemoryError, Result};
use crate::id::{IdAllocator, CONVENTION_PREFIX, ENTITY_PREFIX, PATTERN_PREFIX, RELATION_PREFIX};
use crate::query::{self, Direction, EntityQuery, GraphStats};
use crate::record::{
    ConventionDraft, Entity, EntityDraft, EntityUpdate, Metadata, Pattern, PatternDraft, Relation,
    StyleConvention,
};

/// An entity together with its relations and, depending on depth, its
/// related entities expanded recursively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContext {
    pub entity: Entity,
    pub relations: Vec<Relation>,
    /// Keyed by entity id, in the order the relations were found
    #[serde(default)]
    pub related: IndexMap<String, EntityContext>,
}

impl EntityContext {
    fn leaf(entity: Entity) -> Self {
        Self {
            entity,
            relations: Vec::new(),
            related: IndexMap::new(),
        }
    }
}

/// In-memory knowledge graph
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    pub(crate) entities: IndexMap<String, Entity>,
    pub(crate) relations: IndexMap<String, Relation>,
    pub(crate) patterns: IndexMap<String, Pattern>,
    pub(crate) style_conventions: IndexMap<String, StyleConvention>,
    pub(crate) ids: IdAllocator,
    pub(crate) max_context_depth: usize,
    pub(crate) default_query_limit: usize,
    pub(crate) pretty_snapshots: bool,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            relations: IndexMap::new(),
            patterns: IndexMap::new(),
            style_conventions: IndexMap::new(),
            ids: IdAllocator::default(),
            max_context_depth: DEFAULT_MAX_CONTEXT_DEPTH,
            default_query_limit: DEFAULT_QUERY_LIMIT,
            pretty_snapshots: true,
        }
    }
}

impl KnowledgeGraph {
    /// Create an empty graph with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph using the bounds from `config`
    pub fn with_config(config: &StoreConfig) -> Self {
        let mut graph = Self::new();
        graph.apply_config(config);
        graph
    }

    /// Adopt the bounds from `config` without touching stored records
    pub fn apply_config(&mut self, config: &StoreConfig) {
        self.max_context_depth = config.max_context_depth;
        self.default_query_limit = config.default_query_limit;
        self.pretty_snapshots = config.pretty_snapshots;
    }

    // ==========================================
    // Entities
    // ==========================================

    /// Register an entity and return its id
    pub fn add_entity(&mut self, draft: EntityDraft) -> String {
        let id = self.ids.allocate(ENTITY_PREFIX);
        let entity = draft.into_entity(id.clone());
        self.entities.insert(id.clone(), entity);
        id
    }

    /// Overwrite some fields of an entity.
    ///
    /// Returns false if `id` is unknown.
    pub fn update_entity(&mut self, id: &str, update: EntityUpdate) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => {
                update.apply(entity);
                true
            }
            None => false,
        }
    }

    /// Append an observation unless the entity already has it.
    ///
    /// Returns false if `id` is unknown. Re-adding an existing observation
    /// succeeds without changing the entity.
    pub fn add_observation(&mut self, id: &str, observation: impl Into<String>) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let observation = observation.into();
        if !entity.has_observation(&observation) {
            entity.observations.push(observation);
            entity.touch();
        }
        true
    }

    /// Get an entity by id
    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Entities with exactly this name, optionally of one type
    pub fn find_entity(&self, name: &str, entity_type: Option<&str>) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| e.name == name)
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .collect()
    }

    /// Filtered scan over entities.
    ///
    /// Scanning stops at `query.limit` matches (the configured default limit
    /// when unset), so which entities make the cut depends on insertion order.
    pub fn query_entities(&self, query: &EntityQuery) -> Vec<&Entity> {
        let limit = query.limit.unwrap_or(self.default_query_limit);
        let name_pattern = query::compile(query.name_pattern.as_deref());
        let mut results = Vec::new();

        for entity in self.entities.values() {
            if results.len() >= limit {
                break;
            }
            if let Some(ref entity_type) = query.entity_type {
                if &entity.entity_type != entity_type {
                    continue;
                }
            }
            if let Some(ref language) = query.language {
                if entity.language.as_ref() != Some(language) {
                    continue;
                }
            }
            if let Some(ref pattern) = name_pattern {
                if !pattern.is_match(&entity.name) {
                    continue;
                }
            }
            results.push(entity);
        }

        results
    }

    /// All entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    // ==========================================
    // Relations
    // ==========================================

    /// Relate two existing entities.
    ///
    /// Fails with `MissingEndpoint` if either id is not a known entity.
    pub fn add_relation(
        &mut self,
        from_id: &str,
        to_id: &str,
        relation_type: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> Result<String> {
        for endpoint in [from_id, to_id] {
            if !self.entities.contains_key(endpoint) {
                log::debug!(
                    "Rejected relation {} -> {}: unknown entity {}",
                    from_id,
                    to_id,
                    endpoint
                );
                return Err(MemoryError::missing_endpoint(from_id, to_id, endpoint));
            }
        }

        let id = self.ids.allocate(RELATION_PREFIX);
        let relation = Relation {
            id: id.clone(),
            relation_type: relation_type.into(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            metadata: metadata.unwrap_or_default(),
            created_at: crate::temporal::now(),
        };
        self.relations.insert(id.clone(), relation);
        Ok(id)
    }

    /// Get a relation by id
    pub fn get_relation(&self, id: &str) -> Option<&Relation> {
        self.relations.get(id)
    }

    /// Relations touching `entity_id` on the requested side
    pub fn get_relations(
        &self,
        entity_id: &str,
        relation_type: Option<&str>,
        direction: Direction,
    ) -> Vec<&Relation> {
        self.relations
            .values()
            .filter(|r| relation_type.map_or(true, |t| r.relation_type == t))
            .filter(|r| {
                (direction.includes_outgoing() && r.from_id == entity_id)
                    || (direction.includes_incoming() && r.to_id == entity_id)
            })
            .collect()
    }

    /// Entities at the other end of `get_relations`.
    ///
    /// Relations whose other endpoint no longer resolves are skipped. An
    /// entity related twice appears twice.
    pub fn get_related_entities(
        &self,
        entity_id: &str,
        relation_type: Option<&str>,
        direction: Direction,
    ) -> Vec<&Entity> {
        self.get_relations(entity_id, relation_type, direction)
            .into_iter()
            .filter_map(|r| self.entities.get(r.other_endpoint(entity_id)))
            .collect()
    }

    /// All relations in insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    // ==========================================
    // Patterns and style conventions
    // ==========================================

    /// Register a pattern and return its id
    pub fn add_pattern(&mut self, draft: PatternDraft) -> String {
        let id = self.ids.allocate(PATTERN_PREFIX);
        self.patterns.insert(id.clone(), draft.into_pattern(id.clone()));
        id
    }

    pub fn get_pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    /// Patterns matching name and language exactly (either may be omitted)
    pub fn find_patterns(&self, name: Option<&str>, language: Option<&str>) -> Vec<&Pattern> {
        self.patterns
            .values()
            .filter(|p| name.map_or(true, |n| p.name == n))
            .filter(|p| language.map_or(true, |l| p.language.as_deref() == Some(l)))
            .collect()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    /// Register a style convention and return its id
    pub fn add_style_convention(&mut self, draft: ConventionDraft) -> String {
        let id = self.ids.allocate(CONVENTION_PREFIX);
        self.style_conventions
            .insert(id.clone(), draft.into_convention(id.clone()));
        id
    }

    pub fn get_style_convention(&self, id: &str) -> Option<&StyleConvention> {
        self.style_conventions.get(id)
    }

    /// Conventions matching name and language exactly (either may be omitted)
    pub fn find_style_conventions(
        &self,
        name: Option<&str>,
        language: Option<&str>,
    ) -> Vec<&StyleConvention> {
        self.style_conventions
            .values()
            .filter(|c| name.map_or(true, |n| c.name == n))
            .filter(|c| language.map_or(true, |l| c.language.as_deref() == Some(l)))
            .collect()
    }

    pub fn style_conventions(&self) -> impl Iterator<Item = &StyleConvention> {
        self.style_conventions.values()
    }

    // ==========================================
    // Context expansion
    // ==========================================

    /// An entity, its direct relations, and related entities up to `depth` hops.
    ///
    /// - depth 0: no related entities
    /// - depth 1: related entities as leaves (entity only, no relations)
    /// - depth n: each related entity expanded with depth n - 1
    ///
    /// `depth` is clamped to the configured maximum. An entity already on the
    /// current expansion path is included as a leaf instead of being expanded
    /// again, so relation cycles cannot recurse.
    pub fn get_entity_context(&self, id: &str, depth: usize) -> Option<EntityContext> {
        let clamped = depth.min(self.max_context_depth);
        if clamped < depth {
            log::debug!(
                "Context depth {} for {} clamped to {}",
                depth,
                id,
                self.max_context_depth
            );
        }
        let mut path = Vec::new();
        self.expand_context(id, clamped, &mut path)
    }

    fn expand_context(
        &self,
        id: &str,
        depth: usize,
        path: &mut Vec<String>,
    ) -> Option<EntityContext> {
        let entity = self.entities.get(id)?;
        let mut context = EntityContext {
            entity: entity.clone(),
            relations: self
                .get_relations(id, None, Direction::Both)
                .into_iter()
                .cloned()
                .collect(),
            related: IndexMap::new(),
        };

        if depth == 0 {
            return Some(context);
        }

        path.push(id.to_string());
        for related in self.get_related_entities(id, None, Direction::Both) {
            if context.related.contains_key(&related.id) {
                continue;
            }
            let on_path = path.iter().any(|p| p == &related.id);
            let nested = if depth > 1 && !on_path {
                self.expand_context(&related.id, depth - 1, path)
            } else {
                None
            };
            let nested = nested.unwrap_or_else(|| EntityContext::leaf(related.clone()));
            context.related.insert(related.id.clone(), nested);
        }
        path.pop();

        Some(context)
    }

    // ==========================================
    // Whole-graph operations
    // ==========================================

    /// Drop every record. The id counter keeps going so ids are never reused.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.relations.clear();
        self.patterns.clear();
        self.style_conventions.clear();
        log::info!("Knowledge graph cleared");
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.relations.is_empty()
            && self.patterns.is_empty()
            && self.style_conventions.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn style_convention_count(&self) -> usize {
        self.style_conventions.len()
    }

    /// Record counts by registry, type and language
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_entities: self.entities.len(),
            total_relations: self.relations.len(),
            total_patterns: self.patterns.len(),
            total_style_conventions: self.style_conventions.len(),
            ..Default::default()
        };

        for entity in self.entities.values() {
            query::bump(&mut stats.entities_by_type, &entity.entity_type);
            if let Some(ref language) = entity.language {
                query::bump(&mut stats.entities_by_language, language);
            }
        }
        for relation in self.relations.values() {
            query::bump(&mut stats.relations_by_type, &relation.relation_type);
        }
        for pattern in self.patterns.values() {
            if let Some(ref language) = pattern.language {
                query::bump(&mut stats.patterns_by_language, language);
            }
        }

        stats
    }
}
