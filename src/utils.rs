//! Utility functions for prefstore
//!
//! ### File Operations
//! - Atomic file writing (temporary file in the target directory, then rename)
//!
//! ### Identity
//! - Username discovery and normalization for user-scoped stores

use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to `path` so the final rename never
/// crosses a filesystem boundary. Readers observe either the old content or
/// the new content, never a partial write.
///
/// # Errors
///
/// - [`PrefsError::Io`](crate::PrefsError::Io) if the temporary file cannot be
///   created or written, or if the rename fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// Normalize a username for use in a backing-file name
///
/// Spaces are removed and the result is lowercased.
///
/// ```rust
/// use prefstore::utils::normalize_username;
///
/// assert_eq!(normalize_username("Jane Doe"), "janedoe");
/// ```
pub fn normalize_username(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a normalized username can be embedded in a backing-file name
///
/// Rejects empty names and names holding path separators or control
/// characters, which would otherwise escape the preferences directory.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c == '/' || c == '\\' || c.is_control())
}

/// Name of the user running this process, normalized
///
/// Reads `USER`, then `USERNAME`; falls back to `default` when neither holds
/// a valid username.
pub fn current_username() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|name| normalize_username(&name))
        .find(|name| is_valid_username(name))
        .unwrap_or_else(|| "default".to_string())
}
