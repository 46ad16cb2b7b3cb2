//! Compact binary codec for preference documents
//!
//! This codec stores the same document as [`JsonCodec`](crate::codec::JsonCodec)
//! in bincode form, LZ4-compressed once it is large enough to benefit.
//!
//! ## Format
//!
//! Every document starts with a 4-byte magic header:
//! - `PRFZ`: an LZ4 block with its uncompressed size prepended follows
//! - `PRFB`: the bincode body follows uncompressed
//!
//! Bodies smaller than [`MIN_COMPRESS_SIZE`] are always stored raw; LZ4
//! framing overhead outweighs the savings there. Both forms decode with
//! every codec instance, whatever its own compression setting.
//!
//! ## Examples
//!
//! ```rust
//! use prefstore::binary::BinaryCodec;
//! use prefstore::codec::TreeCodec;
//! use prefstore::types::{Entry, TreeSnapshot};
//!
//! let codec = BinaryCodec::default();
//! let snapshot = TreeSnapshot {
//!     entries: vec![Entry::new("volume", "11")],
//!     children: vec![],
//! };
//! let bytes = codec.encode(&snapshot).unwrap();
//! assert_eq!(&bytes[..4], b"PRFB");
//! assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
//! ```

use crate::codec::{Document, DocumentRef, TreeCodec};
use crate::error::{FormatError, Result};
use crate::types::TreeSnapshot;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use tracing::trace;

/// Magic header for LZ4-compressed bodies
pub const COMPRESSED_MAGIC: &[u8; 4] = b"PRFZ";

/// Magic header for raw bodies
pub const RAW_MAGIC: &[u8; 4] = b"PRFB";

/// Bodies below this size are never compressed
pub const MIN_COMPRESS_SIZE: usize = 512;

/// bincode + LZ4 codec
#[derive(Debug, Clone, Copy)]
pub struct BinaryCodec {
    compress: bool,
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self { compress: true }
    }
}

impl BinaryCodec {
    /// Create a binary codec; `compress` enables LZ4 for large bodies
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    fn should_compress(&self, body_len: usize) -> bool {
        self.compress && body_len >= MIN_COMPRESS_SIZE
    }

    /// Whether `bytes` carries the compressed header
    pub fn is_compressed(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && &bytes[..4] == COMPRESSED_MAGIC
    }
}

impl TreeCodec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn extension(&self) -> &'static str {
        "prefs"
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<TreeSnapshot, FormatError> {
        if bytes.len() < 4 {
            return Err(FormatError::BadHeader(bytes.to_vec()));
        }
        let (magic, payload) = bytes.split_at(4);

        let decompressed;
        let body = if magic == COMPRESSED_MAGIC {
            decompressed = decompress_size_prepended(payload)
                .map_err(|e| FormatError::Malformed(format!("LZ4: {}", e)))?;
            trace!("Decompressed {} -> {} bytes", payload.len(), decompressed.len());
            decompressed.as_slice()
        } else if magic == RAW_MAGIC {
            payload
        } else {
            return Err(FormatError::BadHeader(magic.to_vec()));
        };

        let (document, consumed): (Document, usize) =
            bincode::serde::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| FormatError::Malformed(e.to_string()))?;
        if consumed != body.len() {
            return Err(FormatError::Malformed(format!(
                "{} trailing bytes after document",
                body.len() - consumed
            )));
        }
        document.into_snapshot()
    }

    fn encode(&self, snapshot: &TreeSnapshot) -> Result<Vec<u8>> {
        let body = bincode::serde::encode_to_vec(DocumentRef::new(snapshot), bincode::config::standard())?;

        let mut out = Vec::with_capacity(body.len() + 8);
        if self.should_compress(body.len()) {
            out.extend_from_slice(COMPRESSED_MAGIC);
            out.extend_from_slice(&compress_prepend_size(&body));
        } else {
            out.extend_from_slice(RAW_MAGIC);
            out.extend_from_slice(&body);
        }
        trace!("Encoded {} body bytes into {} bytes", body.len(), out.len());
        Ok(out)
    }
}
