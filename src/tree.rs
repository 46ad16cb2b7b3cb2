//! Arena-backed preference tree
//!
//! This module holds the live, in-memory shape of one preference tree. Every
//! vertex lives in a slot of a single arena and is addressed by a [`NodeId`].
//! Parents own their children through the id map; children keep a plain
//! back-reference to their parent id, used for path reconstruction and
//! removal.
//!
//! ## Structure
//!
//! ```text
//! slot 0: ""        (root, parent: none)
//! slot 1: "app"     (parent: 0)
//! slot 2: "window"  (parent: 1)
//! slot 3: (freed)   removed nodes leave an empty slot behind
//! ```
//!
//! Slots are never reused, so a stale [`NodeId`] for a removed node can be
//! detected instead of silently aliasing a newer node.
//!
//! ## Thread Safety
//!
//! `Tree` is not thread-safe. [`Store`](crate::Store) wraps it in a
//! `parking_lot::RwLock`.

use crate::path;
use crate::types::{Entry, NodeSnapshot, StoreStats, TreeSnapshot};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Stable index of a node within its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One vertex of the tree: its entries, its children and a parent link
#[derive(Debug, Clone)]
pub struct NodeData {
    name: String,
    entries: BTreeMap<String, Entry>,
    children: BTreeMap<String, NodeId>,
    parent: Option<NodeId>,
}

impl NodeData {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            parent,
        }
    }

    /// Name of this node (empty for the root)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent of this node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Value stored under `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Entry::get)
    }

    /// Store `value` under `key`, overwriting in place
    ///
    /// Returns the previous value, `None` if the key was new or a tombstone.
    pub fn put(&mut self, key: &str, value: &str) -> Option<String> {
        trace!("put {}={}", key, value);
        match self.entries.get_mut(key) {
            Some(entry) => entry.set(value),
            None => {
                self.entries.insert(key.to_string(), Entry::new(key, value));
                None
            }
        }
    }

    /// Physically remove `key`; removing an absent key is a no-op
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key).and_then(|entry| entry.value)
    }

    /// Keys that carry a value, sorted
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_present())
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Names of the direct children, sorted
    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    /// Id of the direct child called `name`
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// All entries, tombstones included
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// All direct children as `(name, id)` pairs
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Remove every entry of this node, returning how many carried a value
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.values().filter(|e| e.is_present()).count();
        self.entries.clear();
        removed
    }

    fn present_entry_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_present()).count()
    }
}

/// The live preference tree
///
/// The arena grows with every node ever created, not with the live count.
/// Removal empties a slot but never hands it out again, so a loop that keeps
/// creating and removing nodes leaves one empty slot per removed node until
/// the store is reloaded.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Option<NodeData>>,
    live: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Id of the root node, present in every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Create a tree holding only an empty root
    pub fn new() -> Self {
        Self {
            slots: vec![Some(NodeData::new("", None))],
            live: 1,
        }
    }

    /// Materialize a snapshot into a fresh tree
    ///
    /// Entries are copied verbatim, tombstones included, and every snapshot
    /// child becomes a live child registered under its name.
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> Self {
        let mut tree = Self::new();
        tree.materialize(Self::ROOT, &snapshot.entries, &snapshot.children);
        debug!(
            "Materialized tree with {} nodes and {} entries",
            tree.live,
            snapshot.entry_count()
        );
        tree
    }

    fn materialize(&mut self, id: NodeId, entries: &[Entry], children: &[NodeSnapshot]) {
        if let Some(node) = self.node_mut(id) {
            for entry in entries {
                node.entries.insert(entry.key.clone(), entry.clone());
            }
        }
        for child in children {
            if let Some(child_id) = self.get_or_create_child(id, &child.name) {
                self.materialize(child_id, &child.entries, &child.children);
            }
        }
    }

    /// Dematerialize the whole tree into a snapshot
    ///
    /// Tombstones are omitted. Entries come out sorted by key and children
    /// sorted by name, so equal trees always produce equal snapshots.
    pub fn snapshot(&self) -> TreeSnapshot {
        let (entries, children) = self.dematerialize(Self::ROOT);
        TreeSnapshot { entries, children }
    }

    fn dematerialize(&self, id: NodeId) -> (Vec<Entry>, Vec<NodeSnapshot>) {
        let Some(node) = self.node(id) else {
            return (Vec::new(), Vec::new());
        };
        let entries = node
            .entries
            .values()
            .filter(|entry| entry.is_present())
            .cloned()
            .collect();
        let children = node
            .children
            .iter()
            .map(|(name, child_id)| {
                let (entries, children) = self.dematerialize(*child_id);
                NodeSnapshot {
                    name: name.clone(),
                    entries,
                    children,
                }
            })
            .collect();
        (entries, children)
    }

    /// Borrow a node, `None` if it was removed
    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutably borrow a node, `None` if it was removed
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Return the child called `name`, creating an empty one if missing
    ///
    /// This is the only way children come into existence. Returns `None`
    /// only when `parent` itself is no longer live.
    pub fn get_or_create_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let existing = self.node(parent)?.child(name);
        Some(existing.unwrap_or_else(|| self.insert_child(parent, name)))
    }

    // Caller guarantees `parent` is live and has no child called `name`.
    fn insert_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(NodeData::new(name, Some(parent))));
        self.live += 1;
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(name.to_string(), id);
        }
        debug!("Created node '{}' {} under {}", name, id, parent);
        id
    }

    /// Resolve `path` from the root, creating missing nodes on the way
    ///
    /// The root is never removed, so this always succeeds.
    pub fn ensure_path(&mut self, path: &str) -> NodeId {
        let mut current = Self::ROOT;
        for segment in path::segments(path) {
            current = match self.node(current).and_then(|node| node.child(segment)) {
                Some(child) => child,
                None => self.insert_child(current, segment),
            };
        }
        current
    }

    /// Resolve `path` relative to `from` without creating anything
    pub fn resolve(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let mut current = from;
        self.node(current)?;
        for segment in path::segments(path) {
            current = self.node(current)?.child(segment)?;
        }
        Some(current)
    }

    /// Resolve `path` relative to `from`, creating missing nodes on the way
    pub fn resolve_or_create(&mut self, from: NodeId, path: &str) -> Option<NodeId> {
        let mut current = from;
        self.node(current)?;
        for segment in path::segments(path) {
            current = self.get_or_create_child(current, segment)?;
        }
        Some(current)
    }

    /// Absolute `/`-separated path of a live node
    pub fn absolute_path(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            names.push(current.name.as_str());
            current = self.node(parent)?;
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    /// Clear a node's entries and children in place
    ///
    /// Descendants are released from the arena. The node itself stays
    /// registered with its parent; dropping that reference is [`Tree::detach`].
    pub fn remove_self(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.entries.clear();
        let children: Vec<NodeId> = std::mem::take(&mut node.children).into_values().collect();
        for child in children {
            self.release(child);
        }
        true
    }

    fn release(&mut self, id: NodeId) {
        let Some(node) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.live -= 1;
        for child in node.children.into_values() {
            self.release(child);
        }
    }

    /// Drop `parent`'s reference to its child `name` and release the child
    pub fn detach(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let child = self.node_mut(parent)?.children.remove(name)?;
        self.release(child);
        Some(child)
    }

    /// Remove a non-root node: clear it, then detach it from its parent
    ///
    /// Returns `false` for the root or for a node that is already gone.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some((parent, name)) = self
            .node(id)
            .and_then(|node| node.parent.map(|parent| (parent, node.name.clone())))
        else {
            return false;
        };
        self.remove_self(id);
        self.detach(parent, &name).is_some()
    }

    /// Number of live nodes and of entries carrying a value
    pub fn stats(&self) -> StoreStats {
        let entry_count: usize = self
            .slots
            .iter()
            .flatten()
            .map(NodeData::present_entry_count)
            .sum();
        StoreStats {
            node_count: self.live,
            entry_count,
        }
    }
}
