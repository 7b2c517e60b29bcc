//! Thread-safety tests for snapshots and SnapshotCell.
//!
//! These tests require the `snapshot` feature (enabled by default).

#![cfg(feature = "snapshot")]

use rstest::rstest;
use std::ops::ControlFlow;
use std::sync::{Arc, Barrier};
use std::thread;
use treapstore::{ImmutableTable, MutableTable, SnapshotCell};

// =============================================================================
// Send/Sync Tests
// =============================================================================

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[rstest]
fn test_send_sync_bounds() {
    assert_send::<ImmutableTable>();
    assert_sync::<ImmutableTable>();
    assert_send::<MutableTable>();
    assert_send::<SnapshotCell>();
    assert_sync::<SnapshotCell>();
}

// =============================================================================
// Concurrent Reader Tests
// =============================================================================

#[rstest]
fn test_readers_see_consistent_snapshot_while_writer_deletes() {
    let mut writer: MutableTable = (0..512u32).map(|key| (key.to_be_bytes(), key.to_le_bytes())).collect();
    let frozen = writer.snapshot();
    let barrier = Arc::new(Barrier::new(5));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = frozen.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut visited = 0u32;
                let _: ControlFlow<()> = table.for_each(|key, value| {
                    assert_eq!(key.len(), 4);
                    assert_eq!(value, u32::from_be_bytes([key[0], key[1], key[2], key[3]]).to_le_bytes());
                    visited += 1;
                    ControlFlow::Continue(())
                });
                visited
            })
        })
        .collect();

    barrier.wait();
    for key in 0..512u32 {
        writer.delete(key.to_be_bytes());
    }

    for reader in readers {
        assert_eq!(reader.join().expect("Thread panicked"), 512);
    }
    assert!(writer.is_empty());
    assert_eq!(frozen.len(), 512);
}

#[rstest]
fn test_cell_readers_observe_monotonic_versions() {
    let cell = Arc::new(SnapshotCell::new(ImmutableTable::with_seed(3)));

    let reader = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            let mut last_seen = 0;
            for _ in 0..200 {
                let snapshot = cell.load();
                assert!(snapshot.len() >= last_seen);
                assert!(snapshot.check_invariants().is_ok());
                last_seen = snapshot.len();
            }
        })
    };

    for index in 0..200u32 {
        cell.update(|current| current.put(index.to_be_bytes(), "committed"));
    }

    reader.join().expect("Thread panicked");
    assert_eq!(cell.load().len(), 200);
}

#[rstest]
fn test_snapshot_outlives_cell_publication() {
    let cell = SnapshotCell::new(ImmutableTable::new().put("height", "1"));
    let held = cell.load();

    cell.publish(held.put("height", "2"));
    cell.update(|current| current.delete("height"));

    assert_eq!(held.get("height"), Some(&b"1"[..]));
    assert!(!cell.load().has("height"));
}
