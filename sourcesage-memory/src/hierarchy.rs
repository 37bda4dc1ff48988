//! Hierarchical code memory
//!
//! A tree of code nodes from project down to single lines. Each node keeps its
//! parent id and the set of its children's ids; the store keeps the set of
//! roots. Structure is fixed at insertion: there is no move or reparent.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::id::{IdAllocator, NODE_PREFIX};
use crate::query;
use crate::record::Metadata;

/// Granularity of a node, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HierarchyLevel {
    /// Project-wide structure and dependencies
    Project,
    /// Imports and exports of one module
    Module,
    /// Methods and attributes
    Class,
    /// Signature and purpose
    Function,
    /// Loops, conditionals and other blocks
    Block,
    /// Single implementation lines
    Line,
}

/// A node in the code hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    #[serde(rename = "node_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub level: HierarchyLevel,
    /// "module", "class", "function", "method", ...
    pub node_type: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children_ids: IndexSet<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Full source, only kept where it is worth the space
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub style_markers: Metadata,
}

/// Everything needed to add a node
#[derive(Debug, Clone)]
pub struct NodeDraft {
    name: String,
    level: HierarchyLevel,
    node_type: String,
    parent_id: Option<String>,
    signature: Option<String>,
    summary: Option<String>,
    metadata: Metadata,
    content: Option<String>,
    style_markers: Metadata,
}

impl NodeDraft {
    pub fn new(
        name: impl Into<String>,
        level: HierarchyLevel,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            level,
            node_type: node_type.into(),
            parent_id: None,
            signature: None,
            summary: None,
            metadata: Metadata::new(),
            content: None,
            style_markers: Metadata::new(),
        }
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn style_marker(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.style_markers.insert(key.into(), value.into());
        self
    }

    fn into_node(self, id: String) -> CodeNode {
        CodeNode {
            id,
            name: self.name,
            level: self.level,
            node_type: self.node_type,
            parent_id: self.parent_id,
            children_ids: IndexSet::new(),
            signature: self.signature,
            summary: self.summary,
            metadata: self.metadata,
            content: self.content,
            style_markers: self.style_markers,
        }
    }
}

/// Flattened view of a node with its parent's and children's names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub level: HierarchyLevel,
    pub signature: Option<String>,
    pub summary: Option<String>,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub metadata: Metadata,
}

/// Tree of code nodes
#[derive(Debug, Clone, Default)]
pub struct HierarchyStore {
    nodes: IndexMap<String, CodeNode>,
    roots: IndexSet<String>,
    ids: IdAllocator,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id.
    ///
    /// If the draft names a parent that exists, the node is added to that
    /// parent's children. If it names no parent, or one that does not exist,
    /// the node becomes a root. A dangling `parent_id` is kept on the node.
    pub fn add_node(&mut self, draft: NodeDraft) -> String {
        let id = self.ids.allocate(NODE_PREFIX);
        let node = draft.into_node(id.clone());

        match node.parent_id.as_deref() {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent) => {
                    parent.children_ids.insert(id.clone());
                }
                None => {
                    log::debug!(
                        "Parent {} of {} ({}) not found, registering as root",
                        parent_id,
                        id,
                        node.name
                    );
                    self.roots.insert(id.clone());
                }
            },
            None => {
                self.roots.insert(id.clone());
            }
        }

        self.nodes.insert(id.clone(), node);
        id
    }

    pub fn get_node(&self, id: &str) -> Option<&CodeNode> {
        self.nodes.get(id)
    }

    /// Children of a node; empty for unknown nodes
    pub fn get_children(&self, id: &str) -> Vec<&CodeNode> {
        match self.nodes.get(id) {
            Some(node) => node
                .children_ids
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Parent of a node; None for roots, orphans and unknown nodes
    pub fn get_parent(&self, id: &str) -> Option<&CodeNode> {
        let parent_id = self.nodes.get(id)?.parent_id.as_deref()?;
        self.nodes.get(parent_id)
    }

    /// Ancestors from the parent up to the root, nearest first.
    ///
    /// Stops at a parentless node or an unresolvable parent. Parent links that
    /// loop back on themselves are cut at the first repeat.
    pub fn get_ancestors(&self, id: &str) -> Vec<&CodeNode> {
        let mut ancestors = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let Some(mut current) = self.nodes.get(id) else {
            return ancestors;
        };
        seen.insert(current.id.as_str());

        while let Some(parent_id) = current.parent_id.as_deref() {
            if ancestors.len() >= self.nodes.len() || !seen.insert(parent_id) {
                log::warn!("Cycle in parent links above {}, stopping at {}", id, current.id);
                break;
            }
            match self.nodes.get(parent_id) {
                Some(parent) => {
                    ancestors.push(parent);
                    current = parent;
                }
                None => break,
            }
        }

        ancestors
    }

    /// Every node below `id`, breadth first
    pub fn get_descendants(&self, id: &str) -> Vec<&CodeNode> {
        let mut descendants = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);
        let mut queue: VecDeque<&CodeNode> = self.get_children(id).into();

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }
            descendants.push(node);
            queue.extend(self.get_children(&node.id));
        }

        descendants
    }

    /// Nodes matching every given filter, in insertion order
    pub fn query(
        &self,
        level: Option<HierarchyLevel>,
        node_type: Option<&str>,
        name_pattern: Option<&str>,
    ) -> Vec<&CodeNode> {
        let name_pattern = query::compile(name_pattern);
        self.nodes
            .values()
            .filter(|n| level.map_or(true, |l| n.level == l))
            .filter(|n| node_type.map_or(true, |t| n.node_type == t))
            .filter(|n| name_pattern.as_ref().map_or(true, |p| p.is_match(&n.name)))
            .collect()
    }

    /// The node's own fields plus its parent's name and its children's names
    pub fn summarize_node(&self, id: &str) -> Option<NodeSummary> {
        let node = self.nodes.get(id)?;
        Some(NodeSummary {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            level: node.level,
            signature: node.signature.clone(),
            summary: node.summary.clone(),
            parent: self.get_parent(id).map(|p| p.name.clone()),
            children: self
                .get_children(id)
                .into_iter()
                .map(|c| c.name.clone())
                .collect(),
            metadata: node.metadata.clone(),
        })
    }

    /// Root nodes in insertion order
    pub fn roots(&self) -> Vec<&CodeNode> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Whether `id` is listed among the roots. True for orphans whose
    /// declared parent was missing when they were added.
    pub fn is_root(&self, id: &str) -> bool {
        self.roots.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node. The id counter keeps going.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        log::info!("Hierarchy cleared");
    }
}
