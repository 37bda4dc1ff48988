//! Thread-safe handles around the stores
//!
//! Each store sits behind its own `parking_lot::RwLock`, so any number of
//! readers can run at once and a mutation is exclusive. A `SharedGraph`
//! opened with a storage path writes a snapshot after every mutation.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{MemoryError, Result};
use crate::graph::KnowledgeGraph;
use crate::hierarchy::HierarchyStore;
use crate::query::GraphStats;

/// Knowledge graph shared between threads
#[derive(Debug, Clone)]
pub struct SharedGraph {
    graph: Arc<RwLock<KnowledgeGraph>>,
    storage_path: Option<PathBuf>,
}

impl SharedGraph {
    /// Open the graph described by `config`.
    ///
    /// With a storage path, the snapshot there is loaded (or an empty graph is
    /// used if there is none yet). Malformed snapshots are an error.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let mut graph = match &config.storage_path {
            Some(path) => KnowledgeGraph::load_or_default(path)?,
            None => KnowledgeGraph::new(),
        };
        graph.apply_config(config);

        log::info!(
            "Knowledge graph opened ({} entities, {} relations, storage: {:?})",
            graph.entity_count(),
            graph.relation_count(),
            config.storage_path
        );

        Ok(Self {
            graph: Arc::new(RwLock::new(graph)),
            storage_path: config.storage_path.clone(),
        })
    }

    /// Graph that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            graph: Arc::new(RwLock::new(KnowledgeGraph::new())),
            storage_path: None,
        }
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Run `f` under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&KnowledgeGraph) -> R) -> R {
        f(&self.graph.read())
    }

    /// Run `f` under the write lock, then persist if a storage path is set.
    ///
    /// The mutation stays applied in memory even if the save fails.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut KnowledgeGraph) -> R) -> Result<R> {
        let mut graph = self.graph.write();
        let result = f(&mut graph);
        if let Some(path) = &self.storage_path {
            graph.save_to_file(path)?;
        }
        Ok(result)
    }

    /// Append an observation, failing if the entity is unknown
    pub fn add_observation(&self, entity_id: &str, observation: impl Into<String>) -> Result<()> {
        let observation = observation.into();
        if self.mutate(|g| g.add_observation(entity_id, observation))? {
            Ok(())
        } else {
            Err(MemoryError::entity_not_found(entity_id))
        }
    }

    pub fn stats(&self) -> GraphStats {
        self.read(KnowledgeGraph::stats)
    }

    /// Write the current snapshot. A no-op for in-memory graphs.
    pub fn save(&self) -> Result<()> {
        match &self.storage_path {
            Some(path) => self.graph.read().save_to_file(path),
            None => Ok(()),
        }
    }

    /// Discard every record and persist the empty graph
    pub fn clear(&self) -> Result<()> {
        self.mutate(KnowledgeGraph::clear)
    }
}

/// Code hierarchy shared between threads. Held in memory only.
#[derive(Debug, Clone, Default)]
pub struct SharedHierarchy {
    store: Arc<RwLock<HierarchyStore>>,
}

impl SharedHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R>(&self, f: impl FnOnce(&HierarchyStore) -> R) -> R {
        f(&self.store.read())
    }

    pub fn mutate<R>(&self, f: impl FnOnce(&mut HierarchyStore) -> R) -> R {
        f(&mut self.store.write())
    }

    pub fn clear(&self) {
        self.store.write().clear();
    }
}
