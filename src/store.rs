//! File-backed preference store
//!
//! A [`Store`] is the root of one complete preference tree, bound to exactly
//! one backing file. It owns the live [`Tree`], performs the initial load,
//! and is the only thing that ever writes the backing file.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──> load (decode + materialize, or empty when the file is missing)
//!            │
//!            ▼
//!   put / remove / node / remove_node  (mutate the live tree)
//!            │
//!            ├──> flush: dematerialize -> encode -> atomic write
//!            └──> sync:  read file -> materialize -> merge -> flush
//! ```
//!
//! ## Thread Safety
//!
//! A store is cheap to clone and safe to share between threads:
//! - the live tree sits behind a `parking_lot::RwLock`
//! - `load`, `flush` and the file-read step of `sync` run under a per-store
//!   I/O mutex, so no two of them overlap on the same store
//!
//! The I/O mutex is always taken before the tree lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use prefstore::{JsonCodec, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open(".preferences/app.json", Box::new(JsonCodec::default()))?;
//! store.put("window.size", "width", "800");
//! assert_eq!(store.get("window/size", "width").as_deref(), Some("800"));
//! store.flush()?;
//! # Ok(())
//! # }
//! ```

use crate::codec::TreeCodec;
use crate::error::{PrefsError, Result};
use crate::node::Node;
use crate::path;
use crate::sync::SyncEngine;
use crate::tree::{NodeData, Tree};
use crate::types::{StoreStats, SyncStats, TreeSnapshot};
use crate::utils;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// State shared by a store and every node handle taken from it
pub(crate) struct StoreShared {
    /// Backing file
    pub(crate) path: PathBuf,
    /// Codec for the backing file
    pub(crate) codec: Box<dyn TreeCodec>,
    /// Live tree
    pub(crate) tree: RwLock<Tree>,
    /// Serializes load, flush and sync
    io_lock: Mutex<()>,
}

/// Root of a preference tree bound to one backing file
#[derive(Clone)]
pub struct Store {
    shared: Arc<StoreShared>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Store")
            .field("path", &self.shared.path)
            .field("codec", &self.shared.codec.name())
            .field("nodes", &stats.node_count)
            .field("entries", &stats.entry_count)
            .finish()
    }
}

impl Store {
    /// Open the store backed by `path`
    ///
    /// Loads the backing file when it exists; otherwise the store starts as
    /// an empty root. Nothing is written until [`Store::flush`] or
    /// [`Store::sync`].
    ///
    /// # Errors
    ///
    /// - [`PrefsError::Format`] if the file exists but fails decoding
    /// - [`PrefsError::Io`] if the file exists but cannot be read
    #[instrument(skip_all, fields(codec = codec.name()))]
    pub fn open(path: impl Into<PathBuf>, codec: Box<dyn TreeCodec>) -> Result<Self> {
        let shared = StoreShared {
            path: path.into(),
            codec,
            tree: RwLock::new(Tree::new()),
            io_lock: Mutex::new(()),
        };
        let store = Self {
            shared: Arc::new(shared),
        };
        store.load()?;

        let stats = store.stats();
        info!(
            "Opened store {:?} ({} nodes, {} entries)",
            store.shared.path, stats.node_count, stats.entry_count
        );
        Ok(store)
    }

    pub(crate) fn from_shared(shared: Arc<StoreShared>) -> Self {
        Self { shared }
    }

    fn load(&self) -> Result<()> {
        let io = self.shared.io_lock.lock();
        let tree = match self.read_snapshot(&io)? {
            Some(snapshot) => Tree::from_snapshot(&snapshot),
            None => {
                debug!("No backing file at {:?}, starting empty", self.shared.path);
                Tree::new()
            }
        };
        *self.shared.tree.write() = tree;
        Ok(())
    }

    /// Read and decode the backing file; `None` if it does not exist
    fn read_snapshot(&self, _io: &MutexGuard<'_, ()>) -> Result<Option<TreeSnapshot>> {
        let bytes = match fs::read(&self.shared.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match self.shared.codec.decode(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Backing file {:?} failed to decode: {}", self.shared.path, e);
                Err(e.into())
            }
        }
    }

    /// Dematerialize, encode and atomically write the live tree
    fn write_tree(&self, _io: &MutexGuard<'_, ()>) -> Result<usize> {
        let snapshot = self.shared.tree.read().snapshot();
        let bytes = self.shared.codec.encode(&snapshot)?;
        utils::atomic_write(&self.shared.path, &bytes)?;
        Ok(bytes.len())
    }

    /// Write the entire live tree to the backing file
    ///
    /// This is the only path that writes the backing file. With a
    /// deterministic codec, two flushes without an intervening mutation
    /// produce byte-identical files.
    ///
    /// # Errors
    ///
    /// - [`PrefsError::Io`] if the file cannot be written
    #[instrument(skip(self), fields(path = ?self.shared.path))]
    pub fn flush(&self) -> Result<()> {
        let io = self.shared.io_lock.lock();
        let written = self.write_tree(&io)?;
        info!("Flushed {} bytes", written);
        Ok(())
    }

    /// Merge the backing file into the live tree, then flush
    ///
    /// The file is re-read independently of the live tree and merged with
    /// [`SyncEngine`]: file values win on conflicting keys, everything the
    /// file does not mention is kept. A missing backing file merges nothing.
    ///
    /// # Errors
    ///
    /// - [`PrefsError::Format`] if the file fails decoding; the live tree is
    ///   left untouched
    /// - [`PrefsError::Io`] if reading or writing fails
    #[instrument(skip(self), fields(path = ?self.shared.path))]
    pub fn sync(&self) -> Result<SyncStats> {
        let io = self.shared.io_lock.lock();
        let stats = match self.read_snapshot(&io)? {
            Some(snapshot) => {
                let incoming = Tree::from_snapshot(&snapshot);
                let mut live = self.shared.tree.write();
                SyncEngine::merge(&mut live, &incoming)
            }
            None => {
                debug!("No backing file yet, nothing to merge");
                SyncStats::default()
            }
        };
        let written = self.write_tree(&io)?;
        info!(
            "Synced {} changes, wrote {} bytes",
            stats.total_changes(),
            written
        );
        Ok(stats)
    }

    /// Backing file of this store
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Name of the codec used for the backing file
    pub fn codec_name(&self) -> &'static str {
        self.shared.codec.name()
    }

    /// Handle to the root node
    pub fn root(&self) -> Node {
        Node::new(self.shared.clone(), Tree::ROOT, "/".to_string())
    }

    /// Handle to the node at `path`, creating missing nodes
    ///
    /// `.` and `/` are interchangeable separators, so `node("a.b")` and
    /// `node("a/b")` return the same node. Every path-addressed operation
    /// except [`Store::node_exists`] and [`Store::remove_node`] creates the
    /// nodes it addresses the same way.
    pub fn node(&self, path: &str) -> Node {
        let id = self.shared.tree.write().ensure_path(path);
        Node::new(self.shared.clone(), id, path::normalize(path))
    }

    /// Whether a node exists at `path`; never creates anything
    pub fn node_exists(&self, path: &str) -> bool {
        self.shared.tree.read().resolve(Tree::ROOT, path).is_some()
    }

    /// Value of `key` in the node at `path`, creating the node if missing
    pub fn get(&self, path: &str, key: &str) -> Option<String> {
        let mut tree = self.shared.tree.write();
        let id = tree.ensure_path(path);
        tree.node(id)?.get(key).map(str::to_string)
    }

    /// Value of `key` in the node at `path`, or `default`
    pub fn get_or(&self, path: &str, key: &str, default: &str) -> String {
        self.get(path, key).unwrap_or_else(|| default.to_string())
    }

    /// Store `value` under `key` in the node at `path`, creating the node
    pub fn put(&self, path: &str, key: &str, value: &str) {
        let mut tree = self.shared.tree.write();
        let id = tree.ensure_path(path);
        if let Some(node) = tree.node_mut(id) {
            node.put(key, value);
        }
    }

    /// Remove `key` from the node at `path`; a missing key is a no-op
    pub fn remove(&self, path: &str, key: &str) {
        let mut tree = self.shared.tree.write();
        let id = tree.ensure_path(path);
        if let Some(node) = tree.node_mut(id) {
            node.remove(key);
        }
    }

    /// Keys carrying a value in the node at `path`, sorted
    pub fn keys(&self, path: &str) -> Vec<String> {
        let mut tree = self.shared.tree.write();
        let id = tree.ensure_path(path);
        tree.node(id).map(NodeData::keys).unwrap_or_default()
    }

    /// Names of the direct children of the node at `path`, sorted
    pub fn children_names(&self, path: &str) -> Vec<String> {
        let mut tree = self.shared.tree.write();
        let id = tree.ensure_path(path);
        tree.node(id).map(NodeData::child_names).unwrap_or_default()
    }

    /// Remove the node at `path` together with its subtree
    ///
    /// Removing a path that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// - [`PrefsError::UnsupportedOperation`] if `path` addresses the root
    pub fn remove_node(&self, path: &str) -> Result<()> {
        if path::segments(path).next().is_none() {
            return Err(PrefsError::unsupported("the root node cannot be removed"));
        }
        let mut tree = self.shared.tree.write();
        if let Some(id) = tree.resolve(Tree::ROOT, path) {
            tree.remove_node(id);
            debug!("Removed node {}", path::normalize(path));
        }
        Ok(())
    }

    /// Dematerialized copy of the live tree
    pub fn snapshot(&self) -> TreeSnapshot {
        self.shared.tree.read().snapshot()
    }

    /// Node and entry counts of the live tree
    pub fn stats(&self) -> StoreStats {
        self.shared.tree.read().stats()
    }

    /// Encode the live tree without writing it
    pub fn export(&self) -> Result<Vec<u8>> {
        self.shared.codec.encode(&self.snapshot())
    }
}
