//! Property-based testing for prefstore
//!
//! Uses proptest to verify the put/get/remove contract, flush round-trips,
//! flush idempotence and the sync merge rules across randomly generated
//! trees.

use ::prefstore::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

/// Node paths of depth 0..=3 mixing both separators
fn path_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z]{1,6}", 0..=3),
        prop::bool::ANY,
    )
        .prop_map(|(segments, dotted)| segments.join(if dotted { "." } else { "/" }))
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{1,12}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ -~]{0,24}",
        "\\PC{0,12}",
    ]
}

/// A batch of puts
fn puts_strategy() -> impl Strategy<Value = Vec<(String, String, String)>> {
    prop::collection::vec((path_strategy(), key_strategy(), value_strategy()), 0..40)
}

fn open(dir: &TempDir, name: &str) -> Store {
    Store::open(dir.path().join(name), Box::new(JsonCodec::default())).unwrap()
}

fn apply(store: &Store, puts: &[(String, String, String)]) {
    for (path, key, value) in puts {
        store.put(path, key, value);
    }
}

/// Last value written per `(normalized path, key)`
fn last_writes(puts: &[(String, String, String)]) -> BTreeMap<(String, String), String> {
    puts.iter()
        .map(|(p, k, v)| ((path::normalize(p), k.clone()), v.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_put_then_get(path in path_strategy(), key in key_strategy(), value in value_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        store.put(&path, &key, &value);
        prop_assert_eq!(store.get(&path, &key), Some(value.clone()));

        // The other separator addresses the same node
        let swapped: String = path
            .chars()
            .map(|c| match c { '.' => '/', '/' => '.', c => c })
            .collect();
        prop_assert_eq!(store.get(&swapped, &key), Some(value));
    }

    #[test]
    fn prop_put_remove_get(path in path_strategy(), key in key_strategy(), value in value_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        store.put(&path, &key, &value);
        store.remove(&path, &key);
        prop_assert_eq!(store.get(&path, &key), None);
        prop_assert!(!store.keys(&path).contains(&key));
    }

    #[test]
    fn prop_flush_reload_round_trip(puts in puts_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        apply(&store, &puts);
        store.flush().unwrap();

        let reopened = open(&dir, "p.json");
        prop_assert_eq!(reopened.snapshot(), store.snapshot());
        for ((path, key), value) in last_writes(&puts) {
            prop_assert_eq!(reopened.get(&path, &key), Some(value));
        }
    }

    #[test]
    fn prop_flush_is_idempotent(puts in puts_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        apply(&store, &puts);

        store.flush().unwrap();
        let first = fs::read(store.path()).unwrap();
        store.flush().unwrap();
        prop_assert_eq!(fs::read(store.path()).unwrap(), first);
    }

    #[test]
    fn prop_binary_and_json_agree(puts in puts_strategy()) {
        let dir = TempDir::new().unwrap();
        let json = open(&dir, "p.json");
        let binary = Store::open(dir.path().join("p.prefs"), Box::new(BinaryCodec::default())).unwrap();
        apply(&json, &puts);
        apply(&binary, &puts);
        json.flush().unwrap();
        binary.flush().unwrap();

        let json_again = open(&dir, "p.json");
        let binary_again = Store::open(dir.path().join("p.prefs"), Box::new(BinaryCodec::default())).unwrap();
        prop_assert_eq!(json_again.snapshot(), binary_again.snapshot());
    }

    #[test]
    fn prop_sync_file_wins_memory_keeps_rest(local in puts_strategy(), remote in puts_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        apply(&store, &local);

        let other = open(&dir, "p.json");
        apply(&other, &remote);
        other.flush().unwrap();

        store.sync().unwrap();

        // Everything the file mentions wins
        let remote_writes = last_writes(&remote);
        for ((path, key), value) in &remote_writes {
            prop_assert_eq!(store.get(path, key), Some(value.clone()));
        }
        // Everything else keeps its local value
        for ((path, key), value) in last_writes(&local) {
            if !remote_writes.contains_key(&(path.clone(), key.clone())) {
                prop_assert_eq!(store.get(&path, &key), Some(value));
            }
        }
        // Local-only structure survives
        for (path, _, _) in &local {
            prop_assert!(store.node_exists(path));
        }
        // The merge was flushed
        prop_assert_eq!(open(&dir, "p.json").snapshot(), store.snapshot());
    }

    #[test]
    fn prop_sync_twice_changes_nothing(local in puts_strategy(), remote in puts_strategy()) {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "p.json");
        apply(&store, &local);
        let other = open(&dir, "p.json");
        apply(&other, &remote);
        other.flush().unwrap();

        store.sync().unwrap();
        let before = store.snapshot();
        let stats = store.sync().unwrap();
        prop_assert!(!stats.has_changes());
        prop_assert_eq!(store.snapshot(), before);
    }
}
