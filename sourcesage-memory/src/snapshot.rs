//! Knowledge graph snapshots
//!
//! A snapshot is the whole graph as one JSON document:
//!
//! ```text
//! {
//!   "entities":          { "entity_0": {...}, ... },
//!   "relations":         { "relation_2": {...}, ... },
//!   "patterns":          { ... },
//!   "style_conventions": { ... },
//!   "_next_id":          3
//! }
//! ```
//!
//! It is the only durable artifact, so field names are kept stable. Missing
//! collections load as empty and a missing counter loads as 0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{MemoryError, Result};
use crate::graph::KnowledgeGraph;
use crate::id::IdAllocator;
use crate::record::{Entity, Pattern, Relation, StyleConvention};

/// Serializable form of a knowledge graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub entities: IndexMap<String, Entity>,
    #[serde(default)]
    pub relations: IndexMap<String, Relation>,
    #[serde(default)]
    pub patterns: IndexMap<String, Pattern>,
    #[serde(default)]
    pub style_conventions: IndexMap<String, StyleConvention>,
    #[serde(rename = "_next_id", alias = "next_id", default)]
    pub next_id: u64,
}

/// Keep each record's own id in line with the key it is stored under
fn rekey<T>(
    records: IndexMap<String, T>,
    id_of: impl Fn(&mut T) -> &mut String,
) -> IndexMap<String, T> {
    records
        .into_iter()
        .map(|(key, mut record)| {
            let id = id_of(&mut record);
            if *id != key {
                log::warn!("Snapshot record {} claims id {}, using {}", key, id, key);
                *id = key.clone();
            }
            (key, record)
        })
        .collect()
}

impl KnowledgeGraph {
    /// Capture every record and the id counter
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            entities: self.entities.clone(),
            relations: self.relations.clone(),
            patterns: self.patterns.clone(),
            style_conventions: self.style_conventions.clone(),
            next_id: self.ids.peek(),
        }
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// The counter is raised past every identifier in the snapshot, so ids
    /// generated afterwards cannot collide with loaded ones.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut ids = IdAllocator::starting_at(snapshot.next_id);
        let keys = snapshot
            .entities
            .keys()
            .chain(snapshot.relations.keys())
            .chain(snapshot.patterns.keys())
            .chain(snapshot.style_conventions.keys());
        for key in keys {
            ids.observe(key);
        }

        Self {
            entities: rekey(snapshot.entities, |e| &mut e.id),
            relations: rekey(snapshot.relations, |r| &mut r.id),
            patterns: rekey(snapshot.patterns, |p| &mut p.id),
            style_conventions: rekey(snapshot.style_conventions, |c| &mut c.id),
            ids,
            ..Self::default()
        }
    }

    /// Serialize the graph to a JSON string
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.to_snapshot();
        let json = if self.pretty_snapshots {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        Ok(json)
    }

    /// Rebuild a graph from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the snapshot to `path`, creating parent directories as needed.
    ///
    /// The file is overwritten in place.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| MemoryError::io(parent, e))?;
            }
        }

        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| MemoryError::io(path, e))?;

        log::info!(
            "Saved knowledge graph to {} ({} entities, {} relations)",
            path.display(),
            self.entity_count(),
            self.relation_count()
        );
        Ok(())
    }

    /// Load a snapshot from `path`.
    ///
    /// - no file: `SnapshotNotFound`
    /// - invalid UTF-8, unreadable JSON or wrong shape: `MalformedSnapshot`
    /// - any other read failure: `Io`
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MemoryError::SnapshotNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(MemoryError::io(path, e)),
        };

        // Bad UTF-8 surfaces here as a JSON error, not an IO one
        let snapshot: GraphSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| MemoryError::MalformedSnapshot {
                path: path.to_path_buf(),
                source,
            })?;
        let graph = Self::from_snapshot(snapshot);

        log::info!(
            "Loaded knowledge graph from {} ({} entities, {} relations)",
            path.display(),
            graph.entity_count(),
            graph.relation_count()
        );
        Ok(graph)
    }

    /// Like `load_from_file`, but a missing file gives an empty graph.
    ///
    /// Malformed snapshots and IO failures are still errors.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load_from_file(path.as_ref()) {
            Ok(graph) => Ok(graph),
            Err(e) if e.is_not_found() => {
                log::info!(
                    "No knowledge graph at {}, starting empty",
                    path.as_ref().display()
                );
                Ok(Self::new())
            }
            Err(e) => {
                if e.is_malformed() {
                    log::warn!("Refusing to replace corrupt knowledge graph: {}", e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use crate::record::{ConventionDraft, EntityUpdate, PatternDraft};
    use serde_json::json;
    use tempfile::TempDir;

    fn populated() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        let foo = graph.add_entity(
            Entity::draft("Foo", "class", "Foo class")
                .signature("class Foo")
                .language("python")
                .meta("bases", json!(["Base"]))
                .observation("has no state"),
        );
        let bar = graph.add_entity(Entity::draft("bar", "function", "bar fn"));
        graph.add_relation(&foo, &bar, "calls", None).unwrap();
        graph.add_pattern(
            PatternDraft::new("context manager", "with blocks")
                .language("python")
                .example("with open(p) as f:"),
        );
        graph.add_style_convention(
            ConventionDraft::new("snake_case", "function names")
                .example("def load()")
                .meta("enforced", true),
        );
        graph.update_entity(&bar, EntityUpdate::new().summary("bar function"));
        graph
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let graph = populated();
        let restored = KnowledgeGraph::from_snapshot(graph.to_snapshot());

        assert_eq!(restored.to_snapshot(), graph.to_snapshot());
        assert_eq!(restored.ids.peek(), graph.ids.peek());
    }

    #[test]
    fn test_json_round_trip() {
        let graph = populated();
        let json = graph.to_json().unwrap();
        let restored = KnowledgeGraph::from_json(&json).unwrap();

        assert_eq!(restored.to_snapshot(), graph.to_snapshot());
        let foo = restored.find_entity("Foo", Some("class"))[0];
        let related = restored.get_related_entities(&foo.id, None, Direction::Outgoing);
        assert_eq!(related[0].name, "bar");
    }

    #[test]
    fn test_new_ids_do_not_collide_after_restore() {
        let graph = populated();
        let mut restored = KnowledgeGraph::from_snapshot(graph.to_snapshot());

        let id = restored.add_entity(Entity::draft("Baz", "class", ""));
        assert!(graph.get_entity(&id).is_none());
        assert!(graph.get_relation(&id).is_none());
        assert_eq!(restored.entity_count(), 3);
    }

    #[test]
    fn test_stale_counter_is_raised() {
        let mut snapshot = populated().to_snapshot();
        snapshot.next_id = 0;

        let mut graph = KnowledgeGraph::from_snapshot(snapshot);
        let id = graph.add_entity(Entity::draft("Late", "class", ""));
        assert_eq!(id, "entity_5");
    }

    #[test]
    fn test_snapshot_document_shape() {
        let value = serde_json::to_value(populated().to_snapshot()).unwrap();
        assert_eq!(value["_next_id"], json!(5));
        assert!(value["entities"]["entity_0"].is_object());
        assert_eq!(value["relations"]["relation_2"]["relation_type"], json!("calls"));
        assert!(value["patterns"]["pattern_3"].is_object());
        assert!(value["style_conventions"]["convention_4"].is_object());
    }

    #[test]
    fn test_loads_legacy_document() {
        let legacy = json!({
            "entities": {
                "entity_0": {
                    "entity_id": "entity_0",
                    "name": "Server",
                    "entity_type": "class",
                    "summary": "MCP server",
                    "signature": "class Server",
                    "language": "python",
                    "metadata": {},
                    "created_at": 1712000000.123,
                    "updated_at": 1712000050.0,
                    "observations": []
                }
            },
            "relations": {},
            "patterns": {},
            "style_conventions": {},
            "_next_id": 1
        });

        let graph = KnowledgeGraph::from_json(&legacy.to_string()).unwrap();
        assert_eq!(graph.entity_count(), 1);
        assert_eq!(graph.get_entity("entity_0").unwrap().name, "Server");
        assert_eq!(graph.ids.peek(), 1);
    }

    #[test]
    fn test_empty_document_loads_empty_graph() {
        let graph = KnowledgeGraph::from_json("{}").unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.ids.peek(), 0);
    }

    #[test]
    fn test_rekeys_mismatched_record_ids() {
        let mut snapshot = populated().to_snapshot();
        let entity = snapshot.entities.get_mut("entity_0").unwrap();
        entity.id = "entity_999".into();

        let graph = KnowledgeGraph::from_snapshot(snapshot);
        assert_eq!(graph.get_entity("entity_0").unwrap().id, "entity_0");
    }

    #[test]
    fn test_save_and_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("dir").join("knowledge.json");

        let graph = populated();
        graph.save_to_file(&path).unwrap();
        assert!(path.exists());

        let loaded = KnowledgeGraph::load_from_file(&path).unwrap();
        assert_eq!(loaded.to_snapshot(), graph.to_snapshot());
    }

    #[test]
    fn test_save_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("knowledge.json");

        populated().save_to_file(&path).unwrap();
        KnowledgeGraph::new().save_to_file(&path).unwrap();

        let loaded = KnowledgeGraph::load_from_file(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.json");

        let err = KnowledgeGraph::load_from_file(&path).unwrap_err();
        assert!(err.is_not_found());

        let graph = KnowledgeGraph::load_or_default(&path).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("knowledge.json");
        fs::write(&path, "{\"entities\": [1, 2").unwrap();

        let err = KnowledgeGraph::load_from_file(&path).unwrap_err();
        assert!(err.is_malformed());
        assert!(KnowledgeGraph::load_or_default(&path).unwrap_err().is_malformed());
    }

    #[test]
    fn test_load_invalid_utf8_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("knowledge.json");

        fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();
        let err = KnowledgeGraph::load_from_file(&path).unwrap_err();
        assert!(err.is_malformed(), "{err}");

        // valid JSON framing around a bad byte inside a string
        let mut bytes = br#"{"entities": {"entity_0": {"name": ""#.to_vec();
        bytes.push(0xc3);
        bytes.extend_from_slice(br#""}}}"#);
        fs::write(&path, bytes).unwrap();
        let err = KnowledgeGraph::load_from_file(&path).unwrap_err();
        assert!(err.is_malformed(), "{err}");
        assert!(!matches!(err, MemoryError::Io { .. }));
    }

    #[test]
    fn test_load_wrong_shape_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("knowledge.json");
        fs::write(&path, r#"{"entities": {"entity_0": {"name": 5}}}"#).unwrap();

        assert!(KnowledgeGraph::load_from_file(&path).unwrap_err().is_malformed());
    }

    #[test]
    fn test_load_directory_is_io_error() {
        let temp = TempDir::new().unwrap();

        let err = KnowledgeGraph::load_from_file(temp.path()).unwrap_err();
        assert!(matches!(err, MemoryError::Io { .. }));
    }
}
