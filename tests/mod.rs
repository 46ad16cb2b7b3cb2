//! Main test module for prefstore
//!
//! This module includes all test suites:
//! - Integration tests for multi-store and multi-writer scenarios
//! - Property-based tests for the tree and sync invariants
//! - Concurrency tests for shared stores and registries

pub mod concurrency;
pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::prefstore::*;
    use std::fs;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Store {
        Store::open(dir.path().join("prefs.json"), Box::new(JsonCodec::default())).unwrap()
    }

    #[test]
    fn test_empty_store_flush() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.flush().unwrap();

        let written = fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("\"version\": 1"));
        assert!(open(&dir).snapshot().is_empty());
    }

    #[test]
    fn test_unicode_keys_and_values() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let pairs = [
            ("язык", "русский"),
            ("语言", "中文"),
            ("言語", "日本語"),
            ("emoji", "🚀🌟💾"),
            ("quote\"key", "line\nbreak"),
        ];
        for (key, value) in &pairs {
            store.put("intl", key, value);
        }
        store.flush().unwrap();

        let reopened = open(&dir);
        for (key, value) in &pairs {
            assert_eq!(reopened.get("intl", key).as_deref(), Some(*value));
        }
    }

    #[test]
    fn test_keys_may_contain_separators() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        // Keys are opaque; only node paths are split
        store.put("app", "window.width", "800");
        store.put("app", "a/b", "1");
        store.flush().unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.get("app", "window.width").as_deref(), Some("800"));
        assert_eq!(reopened.get("app", "a/b").as_deref(), Some("1"));
        assert_eq!(reopened.children_names("app"), Vec::<String>::new());
    }

    #[test]
    fn test_empty_value_distinct_from_absent() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put("", "blank", "");
        store.flush().unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.get("", "blank").as_deref(), Some(""));
        assert_eq!(reopened.get("", "missing"), None);
    }

    #[test]
    fn test_deep_paths() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let path: Vec<String> = (0..64).map(|i| format!("level{}", i)).collect();
        let path = path.join(".");
        store.put(&path, "depth", "64");
        store.flush().unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.get(&path.replace('.', "/"), "depth").as_deref(), Some("64"));
        assert_eq!(reopened.stats().node_count, 65);
    }

    #[test]
    fn test_case_sensitive_keys() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put("", "Key", "upper");
        store.put("", "key", "lower");
        assert_eq!(store.get("", "Key").as_deref(), Some("upper"));
        assert_eq!(store.get("", "key").as_deref(), Some("lower"));
        assert_eq!(store.keys("").len(), 2);
    }

    #[test]
    fn test_unwritable_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("prefs.json");
        let store = Store::open(&path, Box::new(JsonCodec::default())).unwrap();
        store.put("a", "k", "v");

        let err = store.flush().unwrap_err();
        assert!(err.is_storage_error());

        // The live tree is unaffected by the failed write
        assert_eq!(store.get("a", "k").as_deref(), Some("v"));
    }
}
