//! Integration tests for prefstore
//!
//! Exercises realistic scenarios: several writers sharing one backing file,
//! long random operation sequences checked against a simple model, and the
//! registry working over a real directory.

use ::prefstore::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::info;

/// Flat model of a tree: `(normalized path, key) -> value`
pub type Model = BTreeMap<(String, String), String>;

/// Test harness owning a temporary preferences directory
pub struct PrefsTestHarness {
    pub temp_dir: TempDir,
    pub registry: PreferencesRegistry,
    pub rng: StdRng,
    pub operation_log: Vec<TestOperation>,
}

#[derive(Debug, Clone)]
pub enum TestOperation {
    Put { path: String, key: String, value: String },
    Remove { path: String, key: String },
    RemoveNode { path: String },
    Flush,
}

impl PrefsTestHarness {
    /// Create a harness with a JSON registry
    pub fn new(seed: u64) -> Self {
        Self::with_format(seed, CodecKind::Json)
    }

    /// Create a harness with the given backing-file format
    pub fn with_format(seed: u64, format: CodecKind) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let registry = RegistryBuilder::new()
            .directory(temp_dir.path())
            .format(format)
            .build();
        Self {
            temp_dir,
            registry,
            rng: StdRng::seed_from_u64(seed),
            operation_log: Vec::new(),
        }
    }

    /// Directory holding the backing files
    pub fn directory(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// A fresh store over the system backing file, bypassing the registry cache
    pub fn independent_store(&self) -> Store {
        let config = self.registry.config();
        Store::open(self.registry.path_for(&Scope::System), config.codec()).unwrap()
    }

    /// Rewrite the system backing file through `edit`, as a user with an editor would
    pub fn hand_edit(&self, edit: impl FnOnce(String) -> String) -> anyhow::Result<()> {
        let path = self.registry.path_for(&Scope::System);
        let content = fs::read_to_string(&path)?;
        fs::write(&path, edit(content))?;
        Ok(())
    }

    /// Random node path of depth 0..=3, using both separators
    pub fn random_path(&mut self) -> String {
        let depth = self.rng.random_range(0..=3);
        let separator = if self.rng.random_bool(0.5) { "." } else { "/" };
        (0..depth)
            .map(|_| format!("n{}", self.rng.random_range(0..4)))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Apply `count` random operations to `store` and to `model`
    pub fn run_random_operations(&mut self, store: &Store, model: &mut Model, count: usize) {
        for _ in 0..count {
            let path = self.random_path();
            let normalized = path::normalize(&path);
            let key = format!("k{}", self.rng.random_range(0..5));

            let op = match self.rng.random_range(0..10) {
                0..=5 => {
                    let value = format!("v{}", self.rng.random_range(0..1000));
                    store.put(&path, &key, &value);
                    model.insert((normalized, key.clone()), value.clone());
                    TestOperation::Put { path, key, value }
                }
                6..=7 => {
                    store.remove(&path, &key);
                    model.remove(&(normalized, key.clone()));
                    TestOperation::Remove { path, key }
                }
                8 if !path.is_empty() => {
                    store.remove_node(&path).unwrap();
                    let prefix = format!("{}/", normalized);
                    model.retain(|(p, _), _| p != &normalized && !p.starts_with(&prefix));
                    TestOperation::RemoveNode { path }
                }
                _ => {
                    store.flush().unwrap();
                    TestOperation::Flush
                }
            };
            self.operation_log.push(op);
        }
    }
}

/// Collect every present entry of `store` into a model
pub fn model_of(store: &Store) -> Model {
    fn walk(store: &Store, path: &str, model: &mut Model) {
        for key in store.keys(path) {
            if let Some(value) = store.get(path, &key) {
                model.insert((path.to_string(), key), value);
            }
        }
        for child in store.children_names(path) {
            let child_path = if path == "/" {
                format!("/{}", child)
            } else {
                format!("{}/{}", path, child)
            };
            walk(store, &child_path, model);
        }
    }

    let mut model = Model::new();
    walk(store, "/", &mut model);
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_operations_match_model() {
        for format in [CodecKind::Json, CodecKind::Binary] {
            let mut harness = PrefsTestHarness::with_format(7, format);
            let store = harness.registry.store(Scope::System).unwrap();
            let mut model = Model::new();

            harness.run_random_operations(&store, &mut model, 500);
            assert_eq!(model_of(&store), model);

            store.flush().unwrap();
            let reopened = harness.independent_store();
            assert_eq!(model_of(&reopened), model);
            info!(
                "{}: {} operations, {} entries",
                format,
                harness.operation_log.len(),
                model.len()
            );
        }
    }

    #[test]
    fn test_three_writers_converge() {
        let harness = PrefsTestHarness::new(11);
        let writers: Vec<Store> = (0..3).map(|_| harness.independent_store()).collect();

        for (i, writer) in writers.iter().enumerate() {
            writer.put("shared", "owner", &format!("writer{}", i));
            writer.put(&format!("private.w{}", i), "id", &i.to_string());
            writer.sync().unwrap();
        }
        // A second round lets the early writers see later additions
        for writer in &writers {
            writer.sync().unwrap();
        }

        let expected = writers[2].snapshot();
        for writer in &writers {
            assert_eq!(writer.snapshot(), expected);
        }
        // The file wins every conflict, so the first flushed value sticks
        assert_eq!(writers[2].get("shared", "owner").as_deref(), Some("writer0"));
        assert_eq!(writers[0].children_names("private").len(), 3);
    }

    #[test]
    fn test_sync_picks_up_hand_edit() {
        let harness = PrefsTestHarness::new(3);
        let root = harness.registry.system_root().unwrap();
        root.node("editor").unwrap().put("font", "mono").unwrap();
        root.flush().unwrap();

        harness
            .hand_edit(|content| content.replace("\"mono\"", "\"serif\""))
            .unwrap();

        root.sync().unwrap();
        assert_eq!(
            root.node("editor").unwrap().get("font").unwrap().as_deref(),
            Some("serif")
        );
    }

    #[test]
    fn test_system_and_user_stores_are_independent() {
        let harness = PrefsTestHarness::new(5);
        let system = harness.registry.system_root().unwrap();
        let erin = harness.registry.user_root_for("Erin").unwrap();

        system.put("scope", "system").unwrap();
        erin.put("scope", "erin").unwrap();
        assert_eq!(harness.registry.flush_all().unwrap(), 2);

        let files: Vec<String> = fs::read_dir(harness.directory())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(files.contains(&"application-preferences.json".to_string()));
        assert!(files.contains(&"user-preferences-erin.json".to_string()));

        let other = RegistryBuilder::new().directory(harness.directory()).build();
        assert_eq!(
            other.user_root_for("erin").unwrap().get("scope").unwrap().as_deref(),
            Some("erin")
        );
        assert_eq!(
            other.system_root().unwrap().get("scope").unwrap().as_deref(),
            Some("system")
        );
    }
}
