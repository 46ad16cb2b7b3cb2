//! Configuration for preference registries
//!
//! [`PreferencesConfig`] says where backing files live and which codec
//! writes them. It can be built in code, through
//! [`RegistryBuilder`](crate::registry::RegistryBuilder), or from the
//! environment:
//!
//! | variable           | effect                               |
//! |--------------------|--------------------------------------|
//! | `PREFSTORE_DIR`    | preferences directory                |
//! | `PREFSTORE_FORMAT` | backing-file format, `json`/`binary` |

use crate::binary::BinaryCodec;
use crate::codec::{JsonCodec, TreeCodec};
use crate::error::{PrefsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable overriding the preferences directory
pub const ENV_DIR: &str = "PREFSTORE_DIR";

/// Environment variable overriding the backing-file format
pub const ENV_FORMAT: &str = "PREFSTORE_FORMAT";

/// Default preferences directory, relative to the working directory
pub const DEFAULT_DIRECTORY: &str = ".preferences";

/// Backing-file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Human-editable JSON
    #[default]
    Json,
    /// bincode, LZ4-compressed when large
    Binary,
}

impl CodecKind {
    /// Instantiate the codec; `pretty` only affects JSON
    pub fn codec(self, pretty: bool) -> Box<dyn TreeCodec> {
        match self {
            CodecKind::Json => Box::new(JsonCodec::new(pretty)),
            CodecKind::Binary => Box::new(BinaryCodec::default()),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Json => write!(f, "json"),
            CodecKind::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = PrefsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(CodecKind::Json),
            "binary" | "bin" => Ok(CodecKind::Binary),
            other => Err(PrefsError::InvalidConfiguration(format!(
                "unknown format '{}' (expected json or binary)",
                other
            ))),
        }
    }
}

/// Where and how a registry stores its backing files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Directory holding every backing file
    pub directory: PathBuf,
    /// Backing-file format
    pub format: CodecKind,
    /// Indent JSON output
    pub pretty: bool,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            format: CodecKind::default(),
            pretty: true,
        }
    }
}

impl PreferencesConfig {
    /// Defaults with `PREFSTORE_DIR` and `PREFSTORE_FORMAT` applied
    ///
    /// # Errors
    ///
    /// - [`PrefsError::InvalidConfiguration`] if `PREFSTORE_FORMAT` names an
    ///   unknown format
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_DIR).filter(|dir| !dir.is_empty()) {
            config.directory = PathBuf::from(dir);
        }
        if let Some(format) = lookup(ENV_FORMAT).filter(|format| !format.is_empty()) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Codec for backing files under this configuration
    pub fn codec(&self) -> Box<dyn TreeCodec> {
        self.format.codec(self.pretty)
    }

    /// Full path of the backing file with the given stem
    ///
    /// The extension is the one the configured codec declares.
    pub fn file_path(&self, stem: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", stem, self.codec().extension()))
    }
}
