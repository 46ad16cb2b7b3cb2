//! Concurrency tests for prefstore
//!
//! Many threads sharing one store, flushes racing with mutations, and
//! concurrent first access to registry scopes.

use ::prefstore::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use tracing::info;
use tracing_test::traced_test;

fn open(dir: &TempDir) -> Store {
    Store::open(dir.path().join("prefs.json"), Box::new(JsonCodec::default())).unwrap()
}

#[test]
#[traced_test]
fn test_parallel_writers_on_one_store() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    store.put(&format!("thread{}.bucket{}", t, i % 10), &format!("k{}", i), "v");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.entry_count, threads * per_thread);
    assert_eq!(stats.node_count, 1 + threads + threads * 10);
    info!("{} entries written from {} threads", stats.entry_count, threads);
}

#[test]
#[traced_test]
fn test_flushes_race_with_mutations() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let barrier = Arc::new(Barrier::new(3));

    let writer = {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..500 {
                store.put("counters", &format!("c{}", i % 50), &i.to_string());
            }
        })
    };
    let flushers: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    store.flush().unwrap();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for flusher in flushers {
        flusher.join().unwrap();
    }

    // The final flush captures every write
    store.flush().unwrap();
    let reopened = open(&dir);
    assert_eq!(reopened.snapshot(), store.snapshot());
    assert_eq!(reopened.keys("counters").len(), 50);
}

#[test]
#[traced_test]
fn test_concurrent_syncs_between_stores() {
    let dir = TempDir::new().unwrap();
    let stores: Vec<Store> = (0..4).map(|_| open(&dir)).collect();

    let handles: Vec<_> = stores
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, store)| {
            thread::spawn(move || {
                store.put(&format!("writer{}", i), "id", &i.to_string());
                for _ in 0..10 {
                    store.sync().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // One more round so every store has seen every writer's final flush
    for store in &stores {
        store.sync().unwrap();
    }
    for store in &stores {
        store.sync().unwrap();
    }
    for store in &stores {
        assert_eq!(store.children_names("").len(), 4);
    }
}

#[test]
#[traced_test]
fn test_registry_first_access_race() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(RegistryBuilder::new().directory(dir.path()).build());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let node = if i % 2 == 0 {
                    registry.system_root().unwrap()
                } else {
                    registry.user_root_for("frank").unwrap()
                };
                node.node(&format!("t{}", i)).unwrap().put("ok", "1").unwrap();
                node
            })
        })
        .collect();
    let roots: Vec<Node> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let system = registry.system_root().unwrap();
    let frank = registry.user_root_for("frank").unwrap();
    for (i, root) in roots.iter().enumerate() {
        let expected = if i % 2 == 0 { &system } else { &frank };
        assert_eq!(root, expected);
    }
    assert_eq!(system.child_names().unwrap().len(), 8);
    assert_eq!(frank.child_names().unwrap().len(), 8);
    assert_eq!(registry.cached_scopes().len(), 2);
}

#[test]
#[traced_test]
fn test_handles_race_with_node_removal() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let node = store.node("volatile");

    let remover = {
        let store = store.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                store.remove_node("volatile").unwrap();
                store.node("volatile");
            }
        })
    };
    let writer = thread::spawn(move || {
        let mut removed = 0;
        for i in 0..100 {
            match node.put("k", &i.to_string()) {
                Ok(()) => {}
                Err(PrefsError::NodeRemoved(_)) => removed += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        removed
    });

    remover.join().unwrap();
    let removed = writer.join().unwrap();
    info!("{} writes hit a removed node", removed);
    assert!(store.node_exists("volatile"));
}
