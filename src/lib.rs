//! # prefstore - Hierarchical, file-backed preferences
//!
//! A persistent key/value preference store organized as a tree of named
//! nodes, each node holding string entries and child nodes. Every tree is
//! backed by one file that it loads from, flushes to, and syncs with.
//!
//! ## Overview
//!
//! prefstore gives applications a preferences tree they can:
//! - Address by path, with `.` and `/` as interchangeable separators
//! - Read and write through a small get/put/remove/node contract
//! - Flush in full to a backing file, atomically
//! - Sync with a backing file another process may have changed, merging
//!   file-wins on conflicting keys and keeping everything else
//! - Scope per application (system) or per user, one store each
//!
//! ## Architecture
//!
//! - **Live tree**: an arena of nodes addressed by stable [`NodeId`]s; parents
//!   own their children by id, children point back by id
//! - **Snapshots**: a [`TreeSnapshot`] is the transient, ordered form a
//!   [`TreeCodec`] decodes into and encodes from
//! - **Codecs**: [`JsonCodec`] (default) and [`BinaryCodec`] (bincode + LZ4)
//! - **Sync**: [`SyncEngine`] merges a freshly decoded file tree into the
//!   live tree
//! - **Registry**: [`PreferencesRegistry`] hands out one [`Store`] per
//!   [`Scope`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prefstore::{Preferences, RegistryBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new().directory("./.preferences").build();
//! let prefs = registry.system_root()?;
//!
//! // Missing nodes are created on first use
//! let window = prefs.node("ui.window")?;
//! window.put_display("width", 1280)?;
//! assert_eq!(window.get_i64("width")?, Some(1280));
//!
//! // Same node, other separator
//! assert_eq!(prefs.node("ui/window")?, window);
//!
//! // Only the root may flush or sync
//! prefs.flush()?;
//! assert!(window.flush().is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with a Store Directly
//!
//! ```rust,no_run
//! use prefstore::{JsonCodec, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open("settings.json", Box::new(JsonCodec::default()))?;
//! store.put("editor", "theme", "dark");
//!
//! // Pick up changes written by another process, then persist the merge
//! let stats = store.sync()?;
//! println!("{} keys changed by the file", stats.total_changes());
//! # Ok(())
//! # }
//! ```
//!
//! ## Sync Semantics
//!
//! Sync is a one-directional merge with no common ancestor:
//! - the file wins for every key it mentions
//! - memory wins for every key and node the file does not mention
//! - nodes only present in the file are created in memory
//!
//! The merged tree is then flushed, so it becomes the new durable state.
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, PrefsError>`. Missing keys and
//! missing nodes are never errors. Errors fall into two families, checked
//! with [`PrefsError::is_storage_error`] (I/O, malformed files) and
//! [`PrefsError::is_programmer_error`] (root-only operations on a child,
//! handles to removed nodes).
//!
//! ## Module Organization
//!
//! - [`store`]: backing-file binding, load/flush/sync, path API
//! - [`node`]: node handles and the [`Preferences`] trait
//! - [`registry`]: scoped stores and the process-wide registry
//! - [`codec`], [`binary`]: document codecs and schema validation
//! - [`tree`], [`sync`]: the live tree and the merge
//! - [`config`], [`error`], [`types`], [`path`]: supporting types

// Public API modules
pub mod binary;
pub mod codec;
pub mod config;
pub mod error;
pub mod node;
pub mod path;
pub mod registry;
pub mod store;
pub mod sync;
pub mod tree;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use binary::BinaryCodec;
pub use codec::{JsonCodec, TreeCodec};
pub use config::{CodecKind, PreferencesConfig};
pub use error::{FormatError, PrefsError, Result};
pub use node::{Node, Preferences};
pub use registry::{PreferencesRegistry, RegistryBuilder, Scope};
pub use store::Store;
pub use sync::SyncEngine;
pub use tree::{NodeId, Tree};
pub use types::*;
