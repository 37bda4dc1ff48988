//! Store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default upper bound on context expansion depth
pub const DEFAULT_MAX_CONTEXT_DEPTH: usize = 3;

/// Default number of results for entity queries
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file for the knowledge graph (None keeps it in memory only)
    pub storage_path: Option<PathBuf>,
    /// Requested context depths above this are clamped
    pub max_context_depth: usize,
    /// Limit for entity queries that do not set one
    pub default_query_limit: usize,
    /// Pretty-print snapshot JSON
    pub pretty_snapshots: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            max_context_depth: DEFAULT_MAX_CONTEXT_DEPTH,
            default_query_limit: DEFAULT_QUERY_LIMIT,
            pretty_snapshots: true,
        }
    }
}

impl StoreConfig {
    /// In-memory config with default bounds
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Config that persists the graph at `path`
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_max_context_depth(mut self, depth: usize) -> Self {
        self.max_context_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.storage_path.is_none());
        assert_eq!(config.max_context_depth, DEFAULT_MAX_CONTEXT_DEPTH);
        assert_eq!(config.default_query_limit, DEFAULT_QUERY_LIMIT);
        assert!(config.pretty_snapshots);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"storage_path": "/data/knowledge.json"}"#).unwrap();
        assert_eq!(
            config.storage_path,
            Some(PathBuf::from("/data/knowledge.json"))
        );
        assert_eq!(config.max_context_depth, DEFAULT_MAX_CONTEXT_DEPTH);
    }

    #[test]
    fn test_persistent_builder() {
        let config = StoreConfig::persistent("k.json").with_max_context_depth(1);
        assert_eq!(config.storage_path, Some(PathBuf::from("k.json")));
        assert_eq!(config.max_context_depth, 1);
    }
}
