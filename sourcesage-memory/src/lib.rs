//! SourceSage Memory Layer
//!
//! Code knowledge memory for AI coding assistants: a knowledge graph of code
//! entities, their relations, recurring patterns and style conventions, plus a
//! hierarchy of code nodes from project down to single lines.
//!
//! ## Features
//!
//! - **Knowledge graph** - Entities with observations, typed relations, and context expansion
//! - **Patterns and conventions** - Named recurring snippets and style rules per language
//! - **Code hierarchy** - Project/module/class/function/block/line tree with ancestry queries
//! - **JSON snapshots** - Whole-graph persistence that keeps identifiers unique across reloads
//!
//! ## Example
//!
//! ```ignore
//! use sourcesage_memory::{EntityDraft, SharedGraph, StoreConfig};
//!
//! let graph = SharedGraph::open(&StoreConfig::persistent("knowledge.json"))?;
//!
//! let foo = graph.mutate(|g| g.add_entity(EntityDraft::new("Foo", "class", "A sample class")))?;
//! let bar = graph.mutate(|g| g.add_entity(EntityDraft::new("bar", "function", "Helper")))?;
//! graph.mutate(|g| g.add_relation(&foo, &bar, "calls", None))??;
//!
//! let context = graph.read(|g| g.get_entity_context(&foo, 2));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod id;
pub mod query;
pub mod record;
pub mod shared;
pub mod snapshot;
pub mod temporal;

// Re-exports for convenience
pub use config::StoreConfig;
pub use error::{MemoryError, Result};
pub use graph::{EntityContext, KnowledgeGraph};
pub use hierarchy::{CodeNode, HierarchyLevel, HierarchyStore, NodeDraft, NodeSummary};
pub use query::{Direction, EntityQuery, GraphStats, NamePattern};
pub use record::{
    ConventionDraft, Entity, EntityDraft, EntityUpdate, Metadata, Pattern, PatternDraft, Relation,
    StyleConvention,
};
pub use shared::{SharedGraph, SharedHierarchy};
pub use snapshot::GraphSnapshot;
