//! Knowledge graph record types and drafts
//!
//! Records are what the graph stores. Drafts are what callers hand to the
//! graph: everything except the identifier and timestamps, which the graph
//! assigns on insert.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::temporal::{self, timestamp};

/// Free-form key/value metadata, kept in insertion order
pub type Metadata = IndexMap<String, serde_json::Value>;

/// A named code construct (class, function, module, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    #[serde(rename = "entity_id", alias = "id")]
    pub id: String,
    pub name: String,
    /// Free-form type tag: "class", "function", "module", ...
    #[serde(alias = "type")]
    pub entity_type: String,
    pub summary: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub updated_at: DateTime<Utc>,
    /// Free-text facts, in the order they were recorded
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    /// Start a new entity draft
    pub fn draft(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        summary: impl Into<String>,
    ) -> EntityDraft {
        EntityDraft::new(name, entity_type, summary)
    }

    /// Whether this entity already records `observation`
    pub fn has_observation(&self, observation: &str) -> bool {
        self.observations.iter().any(|o| o == observation)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = temporal::now();
    }
}

/// Everything needed to register an entity
#[derive(Debug, Clone, Default)]
pub struct EntityDraft {
    name: String,
    entity_type: String,
    summary: String,
    signature: Option<String>,
    language: Option<String>,
    metadata: Metadata,
    observations: Vec<String>,
}

impl EntityDraft {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// Set the signature
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Set the language
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Add one metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the metadata map
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add an observation (duplicates are dropped)
    pub fn observation(mut self, observation: impl Into<String>) -> Self {
        let observation = observation.into();
        if !self.observations.contains(&observation) {
            self.observations.push(observation);
        }
        self
    }

    pub(crate) fn into_entity(self, id: String) -> Entity {
        let now = temporal::now();
        let mut observations: Vec<String> = Vec::with_capacity(self.observations.len());
        for o in self.observations {
            if !observations.contains(&o) {
                observations.push(o);
            }
        }
        Entity {
            id,
            name: self.name,
            entity_type: self.entity_type,
            summary: self.summary,
            signature: self.signature,
            language: self.language,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
            observations,
        }
    }
}

/// Partial overwrite of an entity's fields.
///
/// The identifier is not part of the update and can never change.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    pub name: Option<String>,
    pub entity_type: Option<String>,
    pub summary: Option<String>,
    /// `Some(None)` clears the signature
    pub signature: Option<Option<String>>,
    /// `Some(None)` clears the language
    pub language: Option<Option<String>>,
    pub metadata: Option<Metadata>,
    pub observations: Option<Vec<String>>,
}

impl EntityUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn signature(mut self, signature: Option<String>) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = Some(language);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn observations(mut self, observations: Vec<String>) -> Self {
        self.observations = Some(observations);
        self
    }

    pub(crate) fn apply(self, entity: &mut Entity) {
        if let Some(name) = self.name {
            entity.name = name;
        }
        if let Some(entity_type) = self.entity_type {
            entity.entity_type = entity_type;
        }
        if let Some(summary) = self.summary {
            entity.summary = summary;
        }
        if let Some(signature) = self.signature {
            entity.signature = signature;
        }
        if let Some(language) = self.language {
            entity.language = language;
        }
        if let Some(metadata) = self.metadata {
            entity.metadata = metadata;
        }
        if let Some(observations) = self.observations {
            entity.observations = observations;
        }
        entity.touch();
    }
}

/// A directed, typed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "relation_id", alias = "id")]
    pub id: String,
    /// "calls", "inherits", "imports", ...
    #[serde(alias = "type")]
    pub relation_type: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub created_at: DateTime<Utc>,
}

impl Relation {
    /// The endpoint that is not `entity_id`.
    ///
    /// For a self-relation both endpoints are `entity_id`.
    pub fn other_endpoint(&self, entity_id: &str) -> &str {
        if self.from_id == entity_id {
            &self.to_id
        } else {
            &self.from_id
        }
    }
}

/// A recurring code idiom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "pattern_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to register a pattern
#[derive(Debug, Clone, Default)]
pub struct PatternDraft {
    name: String,
    description: String,
    language: Option<String>,
    example: Option<String>,
    metadata: Metadata,
}

impl PatternDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn into_pattern(self, id: String) -> Pattern {
        let now = temporal::now();
        Pattern {
            id,
            name: self.name,
            description: self.description,
            language: self.language,
            example: self.example,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A naming or formatting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConvention {
    #[serde(rename = "convention_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "temporal::now")]
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to register a style convention
#[derive(Debug, Clone, Default)]
pub struct ConventionDraft {
    name: String,
    description: String,
    language: Option<String>,
    examples: Vec<String>,
    metadata: Metadata,
}

impl ConventionDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Append one example
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn into_convention(self, id: String) -> StyleConvention {
        let now = temporal::now();
        StyleConvention {
            id,
            name: self.name,
            description: self.description,
            language: self.language,
            examples: self.examples,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_draft_builds_entity() {
        let entity = Entity::draft("Parser", "class", "Parses tokens")
            .signature("class Parser(Base)")
            .language("python")
            .meta("path", "src/parser.py")
            .observation("uses recursive descent")
            .into_entity("entity_0".into());

        assert_eq!(entity.id, "entity_0");
        assert_eq!(entity.signature.as_deref(), Some("class Parser(Base)"));
        assert_eq!(entity.language.as_deref(), Some("python"));
        assert_eq!(entity.metadata["path"], json!("src/parser.py"));
        assert_eq!(entity.observations, vec!["uses recursive descent"]);
        assert_eq!(entity.created_at, entity.updated_at);
    }

    #[test]
    fn test_entity_draft_drops_duplicate_observations() {
        let entity = Entity::draft("f", "function", "")
            .observation("pure")
            .observation("pure")
            .observation("fast")
            .into_entity("entity_1".into());
        assert_eq!(entity.observations, vec!["pure", "fast"]);
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut entity = Entity::draft("Old", "class", "before")
            .signature("class Old")
            .into_entity("entity_2".into());

        EntityUpdate::new()
            .summary("after")
            .signature(None)
            .apply(&mut entity);

        assert_eq!(entity.id, "entity_2");
        assert_eq!(entity.name, "Old");
        assert_eq!(entity.summary, "after");
        assert!(entity.signature.is_none());
        assert!(entity.updated_at >= entity.created_at);
    }

    #[test]
    fn test_other_endpoint() {
        let relation = Relation {
            id: "relation_3".into(),
            relation_type: "calls".into(),
            from_id: "entity_0".into(),
            to_id: "entity_1".into(),
            metadata: Metadata::new(),
            created_at: temporal::now(),
        };
        assert_eq!(relation.other_endpoint("entity_0"), "entity_1");
        assert_eq!(relation.other_endpoint("entity_1"), "entity_0");
    }

    #[test]
    fn test_entity_field_names_are_stable() {
        let entity = Entity::draft("Foo", "class", "s").into_entity("entity_0".into());
        let value = serde_json::to_value(&entity).unwrap();
        for key in [
            "entity_id",
            "name",
            "entity_type",
            "summary",
            "signature",
            "language",
            "metadata",
            "created_at",
            "updated_at",
            "observations",
        ] {
            assert!(value.get(key).is_some(), "missing field {key}");
        }
    }

    #[test]
    fn test_entity_reads_legacy_record() {
        let legacy = json!({
            "entity_id": "entity_4",
            "name": "load",
            "entity_type": "function",
            "summary": "Loads config",
            "signature": null,
            "language": "python",
            "metadata": {"args": ["path"]},
            "created_at": 1700000000.25,
            "updated_at": 1700000100.0,
            "observations": ["reads from disk"]
        });
        let entity: Entity = serde_json::from_value(legacy).unwrap();
        assert_eq!(entity.id, "entity_4");
        assert_eq!(entity.created_at.timestamp(), 1_700_000_000);
        assert_eq!(entity.metadata["args"], json!(["path"]));
    }

    #[test]
    fn test_relation_accepts_old_field_names() {
        let relation: Relation = serde_json::from_value(json!({
            "id": "relation_9",
            "type": "imports",
            "from_id": "entity_0",
            "to_id": "entity_1"
        }))
        .unwrap();
        assert_eq!(relation.id, "relation_9");
        assert_eq!(relation.relation_type, "imports");
        assert!(relation.metadata.is_empty());
    }

    #[test]
    fn test_convention_draft_keeps_example_order() {
        let convention = ConventionDraft::new("snake_case", "functions use snake_case")
            .language("rust")
            .example("fn load_config()")
            .example("fn parse_args()")
            .into_convention("convention_5".into());
        assert_eq!(
            convention.examples,
            vec!["fn load_config()", "fn parse_args()"]
        );
    }
}
