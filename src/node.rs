//! Node handles and the four-verb [`Preferences`] contract
//!
//! A [`Node`] is a cheap, cloneable handle to one vertex of a store's live
//! tree. It holds the store's shared state, the node's arena id and its
//! absolute path; every operation takes the tree lock for its own duration.
//!
//! Handles outlive nothing: once the node is removed from its tree, every
//! operation on a handle to it fails with [`PrefsError::NodeRemoved`].
//! Handles to the same node compare equal, whichever path spelling they
//! were obtained with.

use crate::error::{PrefsError, Result};
use crate::path;
use crate::store::{Store, StoreShared};
use crate::tree::{NodeData, NodeId, Tree};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// The get/put/remove/node contract shared by every preference node
///
/// Only the four verbs are required; the typed helpers are built on them.
/// Missing keys are never errors: readers yield `None` and the typed
/// helpers treat values that fail to parse the same way.
pub trait Preferences {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key is a no-op
    fn remove(&self, key: &str) -> Result<()>;

    /// Descendant at the relative `path`, creating missing nodes
    fn node(&self, path: &str) -> Result<Node>;

    /// Value stored under `key`, or `default`
    fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Value stored under `key` parsed as `T`
    fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        Ok(self.get(key)?.and_then(|value| value.trim().parse().ok()))
    }

    /// Store the `Display` form of `value` under `key`
    fn put_display<T: fmt::Display>(&self, key: &str, value: T) -> Result<()>
    where
        Self: Sized,
    {
        self.put(key, &value.to_string())
    }

    /// `true`/`false` stored under `key`, case-insensitive
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key)?.and_then(|value| {
            let value = value.trim();
            if value.eq_ignore_ascii_case("true") {
                Some(true)
            } else if value.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }))
    }

    /// Integer stored under `key`
    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get(key)?.and_then(|value| value.trim().parse().ok()))
    }

    /// Float stored under `key`
    fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        Ok(self.get(key)?.and_then(|value| value.trim().parse().ok()))
    }
}

/// Handle to a node of a store's live tree
#[derive(Clone)]
pub struct Node {
    shared: Arc<StoreShared>,
    id: NodeId,
    path: String,
}

impl Node {
    pub(crate) fn new(shared: Arc<StoreShared>, id: NodeId, path: String) -> Self {
        Self { shared, id, path }
    }

    /// Arena id of this node within its store
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether this is the root node of its store
    pub fn is_root(&self) -> bool {
        self.id == Tree::ROOT
    }

    /// Name of this node; empty for the root
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Absolute path: `/` for the root, `/a/b` below it
    pub fn absolute_path(&self) -> &str {
        &self.path
    }

    /// Whether the node is still part of its tree
    pub fn exists(&self) -> bool {
        self.shared.tree.read().contains(self.id)
    }

    /// The store this node belongs to
    pub fn store(&self) -> Store {
        Store::from_shared(self.shared.clone())
    }

    fn removed(&self) -> PrefsError {
        PrefsError::NodeRemoved(self.path.clone())
    }

    fn with_node<T>(&self, f: impl FnOnce(&NodeData) -> T) -> Result<T> {
        let tree = self.shared.tree.read();
        tree.node(self.id).map(f).ok_or_else(|| self.removed())
    }

    fn with_node_mut<T>(&self, f: impl FnOnce(&mut NodeData) -> T) -> Result<T> {
        let mut tree = self.shared.tree.write();
        tree.node_mut(self.id).map(f).ok_or_else(|| self.removed())
    }

    /// Parent of this node; `None` for the root
    pub fn parent(&self) -> Result<Option<Node>> {
        let Some(parent) = self.with_node(NodeData::parent)? else {
            return Ok(None);
        };
        let parent_path = match self.path.rsplit_once('/') {
            Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
            _ => "/".to_string(),
        };
        Ok(Some(Node::new(self.shared.clone(), parent, parent_path)))
    }

    /// Keys carrying a value in this node, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_node(NodeData::keys)
    }

    /// Names of the direct children of this node, sorted
    pub fn child_names(&self) -> Result<Vec<String>> {
        self.with_node(NodeData::child_names)
    }

    /// Remove every entry of this node; children are kept
    pub fn clear(&self) -> Result<()> {
        let cleared = self.with_node_mut(NodeData::clear)?;
        debug!("Cleared {} entries from {}", cleared, self.path);
        Ok(())
    }

    /// Whether a descendant exists at the relative `path`; never creates
    pub fn node_exists(&self, path: &str) -> Result<bool> {
        let tree = self.shared.tree.read();
        if !tree.contains(self.id) {
            return Err(self.removed());
        }
        Ok(tree.resolve(self.id, path).is_some())
    }

    /// Remove this node and its subtree from the tree
    ///
    /// # Errors
    ///
    /// - [`PrefsError::UnsupportedOperation`] on the root
    /// - [`PrefsError::NodeRemoved`] if the node is already gone
    pub fn remove_node(&self) -> Result<()> {
        if self.is_root() {
            return Err(PrefsError::unsupported("the root node cannot be removed"));
        }
        if !self.shared.tree.write().remove_node(self.id) {
            return Err(self.removed());
        }
        debug!("Removed node {}", self.path);
        Ok(())
    }

    /// Flush the store; only valid on the root
    ///
    /// # Errors
    ///
    /// - [`PrefsError::UnsupportedOperation`] on a child node
    pub fn flush(&self) -> Result<()> {
        if !self.is_root() {
            return Err(PrefsError::unsupported(format!(
                "flush() cannot be called on child node {}",
                self.path
            )));
        }
        self.store().flush()
    }

    /// Sync the store; only valid on the root
    ///
    /// # Errors
    ///
    /// - [`PrefsError::UnsupportedOperation`] on a child node
    pub fn sync(&self) -> Result<()> {
        if !self.is_root() {
            return Err(PrefsError::unsupported(format!(
                "sync() cannot be called on child node {}",
                self.path
            )));
        }
        self.store().sync().map(|_| ())
    }
}

impl Preferences for Node {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_node(|node| node.get(key).map(str::to_string))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.with_node_mut(|node| {
            node.put(key, value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_node_mut(|node| {
            node.remove(key);
        })
    }

    fn node(&self, path: &str) -> Result<Node> {
        let id = self
            .shared
            .tree
            .write()
            .resolve_or_create(self.id, path)
            .ok_or_else(|| self.removed())?;
        let child_path = path::normalize(&format!("{}/{}", self.path, path));
        Ok(Node::new(self.shared.clone(), id, child_path))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared) && self.id == other.id
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("id", &self.id)
            .field("store", &self.shared.path)
            .finish()
    }
}
