//! Merge of a freshly loaded file tree into the live tree
//!
//! [`SyncEngine`] reconciles an `incoming` tree, materialized from the
//! backing file, into the live tree a store has been mutating. The merge is
//! one-directional and has no common ancestor:
//!
//! - **File wins** for every key the file mentions: its value overwrites the
//!   live value. A tombstone in the file removes the live key.
//! - **Memory wins** for everything the file does not mention: live-only keys
//!   and live-only nodes are left untouched.
//! - **Structure is additive**: nodes present only in the file are created
//!   in the live tree, then merged recursively.
//!
//! The roots of both trees correspond by construction, so the walk starts
//! there and root-level entries take part like any other node's.
//!
//! ## Example
//!
//! ```rust
//! use prefstore::sync::SyncEngine;
//! use prefstore::tree::Tree;
//!
//! let mut live = Tree::new();
//! let app = live.ensure_path("app");
//! live.node_mut(app).unwrap().put("a", "1");
//! live.node_mut(app).unwrap().put("b", "x");
//!
//! let mut incoming = Tree::new();
//! let app_in = incoming.ensure_path("app");
//! incoming.node_mut(app_in).unwrap().put("a", "2");
//! let extra = incoming.ensure_path("app.extra");
//! incoming.node_mut(extra).unwrap().put("c", "3");
//!
//! let stats = SyncEngine::merge(&mut live, &incoming);
//! assert_eq!(stats.entries_updated, 1);
//! assert_eq!(stats.nodes_created, 1);
//! assert_eq!(live.node(app).unwrap().get("a"), Some("2"));
//! assert_eq!(live.node(app).unwrap().get("b"), Some("x"));
//! ```

use crate::tree::{NodeId, Tree};
use crate::types::SyncStats;
use tracing::{debug, trace};

/// Recursive file-wins, additive merge
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncEngine;

impl SyncEngine {
    /// Merge `incoming` into `live`, starting at both roots
    pub fn merge(live: &mut Tree, incoming: &Tree) -> SyncStats {
        let mut stats = SyncStats::default();
        Self::merge_node(live, Tree::ROOT, incoming, Tree::ROOT, &mut stats);
        debug!(
            "Sync merged: {} added, {} updated, {} removed, {} nodes created",
            stats.entries_added, stats.entries_updated, stats.entries_removed, stats.nodes_created
        );
        stats
    }

    fn merge_node(
        live: &mut Tree,
        live_id: NodeId,
        incoming: &Tree,
        incoming_id: NodeId,
        stats: &mut SyncStats,
    ) {
        let Some(source) = incoming.node(incoming_id) else {
            return;
        };

        if let Some(target) = live.node_mut(live_id) {
            for entry in source.entries() {
                match entry.get() {
                    Some(value) => match target.put(&entry.key, value) {
                        None => stats.entries_added += 1,
                        Some(previous) if previous != value => {
                            trace!("'{}' overwritten by file value", entry.key);
                            stats.entries_updated += 1;
                        }
                        Some(_) => {}
                    },
                    None => {
                        if target.remove(&entry.key).is_some() {
                            stats.entries_removed += 1;
                        }
                    }
                }
            }
        }

        for (name, incoming_child) in source.children() {
            let existed = live
                .node(live_id)
                .and_then(|node| node.child(name))
                .is_some();
            let Some(live_child) = live.get_or_create_child(live_id, name) else {
                return;
            };
            if !existed {
                stats.nodes_created += 1;
            }
            Self::merge_node(live, live_child, incoming, incoming_child, stats);
        }
    }
}
