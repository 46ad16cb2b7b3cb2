//! Codecs between backing-file bytes and [`TreeSnapshot`]s
//!
//! A codec turns the bytes of a backing file into a [`TreeSnapshot`] and
//! back. Decoding includes schema validation: a document that parses but
//! breaks the schema is rejected with a [`FormatError`] exactly like one
//! that does not parse at all. The core never repairs a document.
//!
//! ## Document Schema
//!
//! ```text
//! {
//!   "version": 1,
//!   "entries":  [ { "key": "theme", "value": "dark" } ],
//!   "children": [
//!     { "name": "window",
//!       "entries":  [ { "key": "width", "value": "800" } ],
//!       "children": [] }
//!   ]
//! }
//! ```
//!
//! Rules enforced on decode:
//! - `version` must equal [`FORMAT_VERSION`]
//! - unknown fields are rejected
//! - keys are unique within a node, child names are unique within a node
//! - child names are non-empty and contain neither `.` nor `/`
//!
//! A `null` value is accepted as a legacy tombstone. Encoders never emit one.
//!
//! Two codecs ship with the crate: [`JsonCodec`] (human-editable, the
//! default) and [`BinaryCodec`](crate::binary::BinaryCodec).

use crate::error::{FormatError, Result};
use crate::path;
use crate::types::{Entry, NodeSnapshot, TreeSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Document format version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// Conversion between backing-file bytes and tree snapshots
pub trait TreeCodec: Send + Sync + fmt::Debug {
    /// Short codec name for logs
    fn name(&self) -> &'static str;

    /// File extension used for backing files written by this codec
    fn extension(&self) -> &'static str;

    /// Parse and validate a document
    fn decode(&self, bytes: &[u8]) -> std::result::Result<TreeSnapshot, FormatError>;

    /// Serialize a snapshot; deterministic for equal snapshots
    fn encode(&self, snapshot: &TreeSnapshot) -> Result<Vec<u8>>;
}

/// Owned wire form, used for decoding
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Document {
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) entries: Vec<Entry>,
    #[serde(default)]
    pub(crate) children: Vec<NodeSnapshot>,
}

/// Borrowed wire form, used for encoding without cloning the snapshot
#[derive(Debug, Serialize)]
pub(crate) struct DocumentRef<'a> {
    pub(crate) version: u32,
    pub(crate) entries: &'a [Entry],
    pub(crate) children: &'a [NodeSnapshot],
}

impl<'a> DocumentRef<'a> {
    pub(crate) fn new(snapshot: &'a TreeSnapshot) -> Self {
        Self {
            version: FORMAT_VERSION,
            entries: &snapshot.entries,
            children: &snapshot.children,
        }
    }
}

impl Document {
    /// Check the version and schema rules, yielding the snapshot
    pub(crate) fn into_snapshot(self) -> std::result::Result<TreeSnapshot, FormatError> {
        if self.version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }
        let snapshot = TreeSnapshot {
            entries: self.entries,
            children: self.children,
        };
        validate(&snapshot)?;
        Ok(snapshot)
    }
}

/// Validate the structural rules of a snapshot
///
/// # Errors
///
/// - [`FormatError::DuplicateKey`] if a node repeats a key
/// - [`FormatError::DuplicateChild`] if a node repeats a child name
/// - [`FormatError::InvalidChildName`] for empty names or names with separators
pub fn validate(snapshot: &TreeSnapshot) -> std::result::Result<(), FormatError> {
    validate_node("/", &snapshot.entries, &snapshot.children)
}

fn validate_node(
    node_path: &str,
    entries: &[Entry],
    children: &[NodeSnapshot],
) -> std::result::Result<(), FormatError> {
    let mut keys = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !keys.insert(entry.key.as_str()) {
            return Err(FormatError::DuplicateKey {
                node: node_path.to_string(),
                key: entry.key.clone(),
            });
        }
    }

    let mut names = HashSet::with_capacity(children.len());
    for child in children {
        if !path::is_valid_name(&child.name) {
            return Err(FormatError::InvalidChildName {
                node: node_path.to_string(),
                child: child.name.clone(),
            });
        }
        if !names.insert(child.name.as_str()) {
            return Err(FormatError::DuplicateChild {
                node: node_path.to_string(),
                child: child.name.clone(),
            });
        }
        validate_node(&path::join(node_path, &child.name), &child.entries, &child.children)?;
    }
    Ok(())
}

/// JSON codec, the default backing-file format
///
/// # Examples
///
/// ```rust
/// use prefstore::codec::{JsonCodec, TreeCodec};
/// use prefstore::types::{Entry, TreeSnapshot};
///
/// let codec = JsonCodec::default();
/// let snapshot = TreeSnapshot {
///     entries: vec![Entry::new("theme", "dark")],
///     children: vec![],
/// };
/// let bytes = codec.encode(&snapshot).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pretty: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonCodec {
    /// Create a JSON codec; `pretty` selects indented output
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl TreeCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<TreeSnapshot, FormatError> {
        let document: Document =
            serde_json::from_slice(bytes).map_err(|e| FormatError::Malformed(e.to_string()))?;
        document.into_snapshot()
    }

    fn encode(&self, snapshot: &TreeSnapshot) -> Result<Vec<u8>> {
        let document = DocumentRef::new(snapshot);
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }
}
