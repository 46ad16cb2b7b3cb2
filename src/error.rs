//! Error types for the prefstore library
//!
//! This module defines all error types that can occur while reading, mutating
//! and persisting a preference tree. Errors fall into two families:
//!
//! - **Storage errors**: I/O failures and malformed backing files. These are
//!   surfaced from `load`, `flush` and `sync` and the caller decides whether
//!   to retry. Nothing is retried or repaired automatically.
//! - **Programmer errors**: calling a root-only operation on a child node, or
//!   using a handle to a node that has been removed.
//!
//! Missing keys and missing children are never errors.

use thiserror::Error;

/// Type alias for Results in the prefstore library
pub type Result<T> = std::result::Result<T, PrefsError>;

/// A backing file that does not conform to the preferences document schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Bytes could not be parsed at all
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Document declares a format version this build does not understand
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// The same key appears twice within one node
    #[error("duplicate key '{key}' in node '{node}'")]
    DuplicateKey {
        /// Absolute path of the offending node
        node: String,
        /// Repeated key
        key: String,
    },

    /// The same child name appears twice within one node
    #[error("duplicate child '{child}' in node '{node}'")]
    DuplicateChild {
        /// Absolute path of the offending node
        node: String,
        /// Repeated child name
        child: String,
    },

    /// A child name is empty or contains a path separator
    #[error("invalid child name '{child}' in node '{node}'")]
    InvalidChildName {
        /// Absolute path of the offending node
        node: String,
        /// Rejected child name
        child: String,
    },

    /// Binary document does not start with a known magic header
    #[error("bad header: {0:?}")]
    BadHeader(Vec<u8>),
}

/// Main error type for all prefstore operations
#[derive(Debug, Error)]
pub enum PrefsError {
    /// I/O errors while reading or writing the backing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors during bincode serialization
    #[error("Bincode error: {0}")]
    Bincode(String),

    /// Backing file failed schema validation
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Root-only operation invoked on a child node
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Handle refers to a node that has been removed from its tree
    #[error("Node has been removed: {0}")]
    NodeRemoved(String),

    /// Other storage failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<bincode::error::EncodeError> for PrefsError {
    fn from(err: bincode::error::EncodeError) -> Self {
        PrefsError::Bincode(err.to_string())
    }
}

impl From<tempfile::PersistError> for PrefsError {
    fn from(err: tempfile::PersistError) -> Self {
        PrefsError::Io(err.error)
    }
}

impl PrefsError {
    /// Create a storage error with a custom message
    pub fn storage(msg: impl Into<String>) -> Self {
        PrefsError::Storage(msg.into())
    }

    /// Create an unsupported-operation error with a custom message
    pub fn unsupported(msg: impl Into<String>) -> Self {
        PrefsError::UnsupportedOperation(msg.into())
    }

    /// Check if this error belongs to the storage family
    ///
    /// Storage errors come from the backing file: I/O failures and documents
    /// that fail decoding. Callers choose their own retry policy for these.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PrefsError::Io(_)
                | PrefsError::Json(_)
                | PrefsError::Bincode(_)
                | PrefsError::Format(_)
                | PrefsError::Storage(_)
        )
    }

    /// Check if this error indicates misuse of the API
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            PrefsError::UnsupportedOperation(_) | PrefsError::NodeRemoved(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            PrefsError::Format(err) => {
                format!(
                    "The preferences file is not valid ({}). Fix or move it aside; it is never repaired automatically.",
                    err
                )
            }
            PrefsError::UnsupportedOperation(msg) => {
                format!("{}. Only the root node of a store can do this.", msg)
            }
            PrefsError::NodeRemoved(path) => {
                format!("Node '{}' was removed. Look it up again to recreate it.", path)
            }
            PrefsError::Io(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                "Permission denied writing preferences. Check the preferences directory permissions.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
