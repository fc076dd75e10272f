//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Merge through the engine
//! - Restart replay fidelity
//! - Concurrent access patterns
//! - Engine lifecycle (open/close)

use std::sync::Arc;
use std::thread;

use caskkv::config::{Config, SyncStrategy};
use caskkv::engine::Engine;
use caskkv::CaskError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(dir: &std::path::Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .sync_strategy(SyncStrategy::EveryWrite) // Sync every write for test reliability
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open(config_for(&data_dir)).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("caskkv.data").exists());
    assert_eq!(engine.log_path(), data_dir.join("caskkv.data").as_path());
    assert_eq!(engine.data_dir(), data_dir.as_path());
    assert!(engine.is_empty());
}

#[test]
fn test_engine_open_path() {
    let temp_dir = TempDir::new().unwrap();

    let engine = Engine::open_path(temp_dir.path()).unwrap();
    engine.put(b"k", b"v").unwrap();

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(
        engine.config().sync_strategy,
        SyncStrategy::EveryNWrites { count: 100 }
    );
}

#[test]
fn test_engine_rejects_zero_sync_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryNWrites { count: 0 })
        .build();

    assert!(matches!(Engine::open(config), Err(CaskError::Config(_))));
}

#[test]
fn test_engine_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"hello", b"world").unwrap();

    assert_eq!(engine.get(b"hello").unwrap(), Some(b"world".to_vec()));
    assert!(engine.contains_key(b"hello"));
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_engine_put_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value1").unwrap();
    engine.put(b"key", b"value2").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), Some(b"value2".to_vec()));
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_engine_empty_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), Some(Vec::new()));
}

#[test]
fn test_engine_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();
    let size_after_put = engine.log_size();

    engine.delete(b"key").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), None);
    assert!(!engine.contains_key(b"key"));
    // Tombstone stays in the log until the next merge
    assert!(engine.log_size() > size_after_put);
}

#[test]
fn test_engine_delete_nonexistent_key_writes_nothing() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"other", b"v").unwrap();
    let size = engine.log_size();

    engine.delete(b"nonexistent").unwrap();

    assert_eq!(engine.log_size(), size);
    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_engine_keys_sorted() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"c", b"3").unwrap();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.delete(b"b").unwrap();

    assert_eq!(engine.keys(), vec![b"a".to_vec(), b"c".to_vec()]);
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_engine_merge_preserves_values() {
    let (_temp, engine) = setup_temp_engine();

    for i in 0..50 {
        engine.put(format!("key{}", i % 10).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
    }
    engine.delete(b"key3").unwrap();

    let before: Vec<_> = engine
        .keys()
        .into_iter()
        .map(|k| (k.clone(), engine.get(&k).unwrap()))
        .collect();
    let size_before = engine.log_size();

    let stats = engine.merge().unwrap();

    assert_eq!(stats.records_scanned, 51);
    assert_eq!(stats.records_kept, 9);
    assert!(engine.log_size() < size_before);
    for (key, value) in before {
        assert_eq!(engine.get(&key).unwrap(), value);
    }
    assert_eq!(engine.get(b"key3").unwrap(), None);
}

#[test]
fn test_engine_merge_twice_is_stable() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();
    engine.put(b"b", b"3").unwrap();

    let first = engine.merge().unwrap();
    let second = engine.merge().unwrap();

    assert_eq!(first.bytes_after, second.bytes_before);
    assert_eq!(second.bytes_after, second.bytes_before);
    assert_eq!(second.records_kept, 2);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn test_engine_writes_after_merge() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();
    engine.merge().unwrap();

    engine.put(b"b", b"3").unwrap();
    engine.delete(b"a").unwrap();

    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn test_engine_removes_stale_merge_file_on_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        engine.put(b"k", b"v").unwrap();
    }
    let merge_path = temp_dir.path().join("caskkv.data.merge");
    std::fs::write(&merge_path, b"half-written merge output").unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert!(!merge_path.exists());
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_engine_restart_replays_state() {
    let temp_dir = TempDir::new().unwrap();

    let keys_before;
    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
        engine.put(b"a", b"3").unwrap();
        engine.put(b"c", b"4").unwrap();
        engine.delete(b"b").unwrap();
        keys_before = engine.keys();
        engine.close().unwrap();
    }

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert_eq!(engine.keys(), keys_before);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"3".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), None);
    assert_eq!(engine.get(b"c").unwrap(), Some(b"4".to_vec()));
}

#[test]
fn test_engine_restart_after_merge() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"a", b"2").unwrap();
        engine.put(b"gone", b"x").unwrap();
        engine.delete(b"gone").unwrap();
        engine.merge().unwrap();
        engine.put(b"b", b"3").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert_eq!(engine.len(), 2);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"3".to_vec()));
    assert_eq!(engine.get(b"gone").unwrap(), None);
}

#[test]
fn test_engine_refuses_corrupt_log() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
    }

    let log_path = temp_dir.path().join("caskkv.data");
    let mut bytes = std::fs::read(&log_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&log_path, &bytes).unwrap();

    let result = Engine::open(config_for(temp_dir.path()));

    assert!(matches!(result, Err(CaskError::CorruptRecord { .. })));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_readers() {
    let (_temp, engine) = setup_temp_engine();
    for i in 0..100 {
        engine.put(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes()).unwrap();
    }
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..100 {
                    let value = engine.get(format!("key{}", i).as_bytes()).unwrap();
                    assert_eq!(value, Some(format!("value{}", i).into_bytes()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_engine_concurrent_writes_and_merges() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_for(temp_dir.path())).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for round in 0..5 {
                    for i in 0..20 {
                        let key = format!("t{}-key{}", t, i);
                        let value = format!("round{}", round);
                        engine.put(key.as_bytes(), value.as_bytes()).unwrap();
                    }
                }
            })
        })
        .collect();

    let merger = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..10 {
                engine.merge().unwrap();
                thread::yield_now();
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    merger.join().unwrap();

    // No write may be lost to a merge running alongside it
    assert_eq!(engine.len(), 80);
    for t in 0..4 {
        for i in 0..20 {
            let key = format!("t{}-key{}", t, i);
            assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(b"round4".to_vec()));
        }
    }

    let keys_before = engine.keys();
    drop(engine);
    let reopened = Engine::open(config_for(temp_dir.path())).unwrap();
    assert_eq!(reopened.keys(), keys_before);
}
