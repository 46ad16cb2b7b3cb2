//! Core data types used throughout the prefstore library
//!
//! This module contains the plain data structures shared between the live
//! tree, the codecs and the sync engine.
//!
//! ## Overview
//!
//! - **Leaf data**: [`Entry`] - a single key/value pair
//! - **Persistence boundary**: [`TreeSnapshot`], [`NodeSnapshot`] - the
//!   transient, ordered representation a codec decodes into and encodes from
//! - **Operation results**: [`SyncStats`], [`StoreStats`]
//!
//! ## Examples
//!
//! ```rust
//! use prefstore::types::{Entry, NodeSnapshot, TreeSnapshot};
//!
//! let snapshot = TreeSnapshot {
//!     entries: vec![Entry::new("theme", "dark")],
//!     children: vec![NodeSnapshot {
//!         name: "window".to_string(),
//!         entries: vec![Entry::new("width", "800")],
//!         children: vec![],
//!     }],
//! };
//! assert_eq!(snapshot.node_count(), 2);
//! assert_eq!(snapshot.entry_count(), 2);
//! ```

use serde::{Deserialize, Serialize};

/// A single key/value pair owned by a node
///
/// The value is absent when the entry is a tombstone. Tombstones only exist
/// in memory when a legacy document carried a `null` value; they are never
/// written back out. An empty string is a real value, distinct from absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    /// Key, unique within the owning node (case-sensitive)
    pub key: String,
    /// Value, or `None` for a tombstone
    #[serde(default)]
    pub value: Option<String>,
}

impl Entry {
    /// Create an entry holding `value`
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Create a tombstone for `key`
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Current value, or `None` if absent
    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Overwrite the value in place, returning the previous one
    pub fn set(&mut self, value: impl Into<String>) -> Option<String> {
        self.value.replace(value.into())
    }

    /// Whether this entry carries a value
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// A non-root node at the persistence boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSnapshot {
    /// Name of this node, unique among its siblings
    pub name: String,
    /// Entries of this node
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Nested child nodes
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Create an empty node snapshot named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::count_nodes).sum::<usize>()
    }

    fn count_entries(&self) -> usize {
        self.entries.len()
            + self
                .children
                .iter()
                .map(NodeSnapshot::count_entries)
                .sum::<usize>()
    }
}

/// Decoded/encoded representation of a whole preference tree
///
/// Pure data with no identity: it only exists while a document is being
/// decoded into a live tree or a live tree is being encoded into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Entries of the root node
    pub entries: Vec<Entry>,
    /// Children of the root node
    pub children: Vec<NodeSnapshot>,
}

impl TreeSnapshot {
    /// Whether the snapshot holds no entries and no children
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }

    /// Number of nodes, the root included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::count_nodes).sum::<usize>()
    }

    /// Number of entries across all nodes
    pub fn entry_count(&self) -> usize {
        self.entries.len()
            + self
                .children
                .iter()
                .map(NodeSnapshot::count_entries)
                .sum::<usize>()
    }
}

/// Statistics about what a sync changed in the live tree
///
/// # Examples
///
/// ```rust
/// # use prefstore::types::SyncStats;
/// let stats = SyncStats {
///     entries_added: 2,
///     entries_updated: 1,
///     entries_removed: 0,
///     nodes_created: 1,
/// };
/// assert!(stats.has_changes());
/// assert_eq!(stats.total_changes(), 4);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Keys that existed only in the file
    pub entries_added: usize,
    /// Keys whose live value was overwritten by a different file value
    pub entries_updated: usize,
    /// Keys removed because the file carried a tombstone for them
    pub entries_removed: usize,
    /// Nodes that existed only in the file
    pub nodes_created: usize,
}

impl SyncStats {
    /// Check if the merge changed anything
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Sum of all changes
    pub fn total_changes(&self) -> usize {
        self.entries_added + self.entries_updated + self.entries_removed + self.nodes_created
    }
}

/// Size of a live tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of live nodes, the root included
    pub node_count: usize,
    /// Number of entries carrying a value
    pub entry_count: usize,
}
