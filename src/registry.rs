//! Scoped store registry
//!
//! A [`PreferencesRegistry`] hands out at most one [`Store`] per [`Scope`]:
//! one for the system scope and one per user. Stores are opened lazily on
//! first request and cached for the registry's lifetime.
//!
//! ## Backing files
//!
//! | scope               | file stem                    |
//! |---------------------|------------------------------|
//! | `System`            | `application-preferences`    |
//! | `User("alice")`     | `user-preferences-alice`     |
//!
//! The extension follows the configured format (`.json` or `.prefs`).
//!
//! ## Process-wide registry
//!
//! [`global()`] returns a registry shared by the whole process, configured
//! from the environment on first use. [`init_global()`] configures it
//! explicitly and must run before anything touches [`global()`].
//!
//! ```rust,no_run
//! use prefstore::{registry, Preferences};
//!
//! # fn main() -> Result<(), prefstore::PrefsError> {
//! let prefs = registry::global()?.user_root()?;
//! prefs.node("editor")?.put("font", "Fira Code")?;
//! prefs.flush()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{CodecKind, PreferencesConfig};
use crate::error::{PrefsError, Result};
use crate::node::Node;
use crate::store::Store;
use crate::utils;
use dashmap::DashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Which store of a registry is addressed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Preferences shared by every user of the application
    System,
    /// Preferences of one user, identified by normalized username
    User(String),
}

impl Scope {
    /// User scope for `name`, normalized like a backing-file name
    pub fn user(name: &str) -> Self {
        Scope::User(utils::normalize_username(name))
    }

    /// Stem of the backing file for this scope
    pub fn file_stem(&self) -> String {
        match self {
            Scope::System => "application-preferences".to_string(),
            Scope::User(name) => format!("user-preferences-{}", name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::System => write!(f, "system"),
            Scope::User(name) => write!(f, "user:{}", name),
        }
    }
}

/// One store per scope, opened lazily
pub struct PreferencesRegistry {
    config: PreferencesConfig,
    stores: DashMap<Scope, Store>,
}

impl fmt::Debug for PreferencesRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesRegistry")
            .field("config", &self.config)
            .field("cached", &self.stores.len())
            .finish()
    }
}

impl PreferencesRegistry {
    /// Create a registry; nothing touches the disk until a store is requested
    pub fn new(config: PreferencesConfig) -> Self {
        Self {
            config,
            stores: DashMap::new(),
        }
    }

    /// Configuration of this registry
    pub fn config(&self) -> &PreferencesConfig {
        &self.config
    }

    /// Backing file used for `scope`
    pub fn path_for(&self, scope: &Scope) -> PathBuf {
        self.config.file_path(&scope.file_stem())
    }

    /// Store for `scope`, opening it on first request
    ///
    /// Concurrent first requests for the same scope open the backing file
    /// once and all receive the same store.
    ///
    /// # Errors
    ///
    /// - [`PrefsError::Io`] if the preferences directory cannot be created
    /// - any error of [`Store::open`]; nothing is cached in that case
    pub fn store(&self, scope: Scope) -> Result<Store> {
        if let Some(store) = self.stores.get(&scope) {
            debug!("Registry cache hit for {}", scope);
            return Ok(store.clone());
        }

        fs::create_dir_all(&self.config.directory)?;
        let path = self.path_for(&scope);
        let store = self
            .stores
            .entry(scope)
            .or_try_insert_with(|| Store::open(path, self.config.codec()))?;
        Ok(store.clone())
    }

    /// Root node of the system store
    pub fn system_root(&self) -> Result<Node> {
        Ok(self.store(Scope::System)?.root())
    }

    /// Root node of the current user's store
    pub fn user_root(&self) -> Result<Node> {
        self.user_root_for(&utils::current_username())
    }

    /// Root node of the store for user `name`
    ///
    /// # Errors
    ///
    /// - [`PrefsError::InvalidConfiguration`] if `name` normalizes to an
    ///   empty string or would place the backing file outside the
    ///   preferences directory
    pub fn user_root_for(&self, name: &str) -> Result<Node> {
        let scope = Scope::user(name);
        if let Scope::User(normalized) = &scope {
            if !utils::is_valid_username(normalized) {
                return Err(PrefsError::InvalidConfiguration(format!(
                    "'{}' is not a usable username",
                    name
                )));
            }
        }
        Ok(self.store(scope)?.root())
    }

    /// Scopes whose store is currently open, sorted
    pub fn cached_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.stores.iter().map(|e| e.key().clone()).collect();
        scopes.sort();
        scopes
    }

    /// Flush every open store, returning how many were written
    ///
    /// Every store is attempted; the first failure is returned afterwards.
    pub fn flush_all(&self) -> Result<usize> {
        let stores: Vec<(Scope, Store)> = self
            .stores
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut flushed = 0;
        let mut first_error = None;
        for (scope, store) in stores {
            match store.flush() {
                Ok(()) => flushed += 1,
                Err(e) => {
                    warn!("Failed to flush {} store: {}", scope, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Flushed {} stores", flushed);
                Ok(flushed)
            }
        }
    }
}

/// Builder for [`PreferencesRegistry`]
///
/// # Examples
///
/// ```rust
/// use prefstore::{CodecKind, RegistryBuilder};
///
/// let registry = RegistryBuilder::new()
///     .directory("/tmp/my-app/prefs")
///     .format(CodecKind::Binary)
///     .build();
/// assert_eq!(registry.config().format, CodecKind::Binary);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    config: PreferencesConfig,
}

impl RegistryBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: PreferencesConfig) -> Self {
        Self { config }
    }

    /// Directory holding the backing files
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = directory.into();
        self
    }

    /// Backing-file format
    pub fn format(mut self, format: CodecKind) -> Self {
        self.config.format = format;
        self
    }

    /// Indent JSON output
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    /// Build the registry
    pub fn build(self) -> PreferencesRegistry {
        PreferencesRegistry::new(self.config)
    }
}

static GLOBAL: OnceLock<PreferencesRegistry> = OnceLock::new();

/// The process-wide registry, configured from the environment on first use
///
/// # Errors
///
/// - [`PrefsError::InvalidConfiguration`] if the environment holds an
///   invalid setting on first use
pub fn global() -> Result<&'static PreferencesRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let config = PreferencesConfig::from_env()?;
    Ok(GLOBAL.get_or_init(|| PreferencesRegistry::new(config)))
}

/// Configure the process-wide registry explicitly
///
/// # Errors
///
/// - [`PrefsError::InvalidConfiguration`] if the global registry has
///   already been initialized
pub fn init_global(config: PreferencesConfig) -> Result<&'static PreferencesRegistry> {
    GLOBAL
        .set(PreferencesRegistry::new(config))
        .map_err(|_| {
            PrefsError::InvalidConfiguration("global registry is already initialized".to_string())
        })?;
    global()
}
