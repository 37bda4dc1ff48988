//! Identifier generation
//!
//! Every store owns one counter. Identifiers take the form `{prefix}_{n}` and
//! the counter only moves forward, so an identifier is never handed out twice
//! by the same store, even after `clear()`.

use serde::{Deserialize, Serialize};

/// Identifier prefix for entities
pub const ENTITY_PREFIX: &str = "entity";
/// Identifier prefix for relations
pub const RELATION_PREFIX: &str = "relation";
/// Identifier prefix for patterns
pub const PATTERN_PREFIX: &str = "pattern";
/// Identifier prefix for style conventions
pub const CONVENTION_PREFIX: &str = "convention";
/// Identifier prefix for hierarchy nodes
pub const NODE_PREFIX: &str = "node";

/// Monotonic identifier allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Start counting from `next`
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Allocate the next identifier with the given prefix
    pub fn allocate(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next);
        self.next += 1;
        id
    }

    /// Value the next allocation will use
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Make sure the counter is past an identifier that already exists.
    ///
    /// Identifiers without a numeric suffix are ignored.
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = numeric_suffix(id) {
            self.next = self.next.max(n.saturating_add(1));
        }
    }
}

/// Parse the `n` out of `prefix_n`
pub fn numeric_suffix(id: &str) -> Option<u64> {
    let (_, suffix) = id.rsplit_once('_')?;
    suffix.parse().ok()
}
