//! Property-based tests for the treap tables.
//!
//! These tests check MutableTable and ImmutableTable against a `BTreeMap`
//! model and verify the structural invariants after arbitrary operation
//! sequences using proptest.

use proptest::prelude::*;
use std::collections::BTreeMap;
use treapstore::{ImmutableTable, MutableTable, NODE_OVERHEAD};

// =============================================================================
// Strategies for Generating Test Data
// =============================================================================

/// A single table operation.
#[derive(Debug, Clone)]
enum Operation {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Short keys over a small alphabet, so that operations collide often.
fn arbitrary_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 0..4)
}

fn arbitrary_value() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..8)
}

fn arbitrary_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (arbitrary_key(), arbitrary_value()).prop_map(|(key, value)| Operation::Put(key, value)),
        1 => arbitrary_key().prop_map(Operation::Delete),
    ]
}

fn arbitrary_operations(max_size: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(arbitrary_operation(), 0..max_size)
}

fn apply_to_model(model: &mut BTreeMap<Vec<u8>, Vec<u8>>, operation: &Operation) {
    match operation {
        Operation::Put(key, value) => {
            model.insert(key.clone(), value.clone());
        }
        Operation::Delete(key) => {
            model.remove(key);
        }
    }
}

fn expected_size(model: &BTreeMap<Vec<u8>, Vec<u8>>) -> usize {
    model
        .iter()
        .map(|(key, value)| key.len() + value.len() + NODE_OVERHEAD)
        .sum()
}

fn entries<I, K, V>(iterator: I) -> Vec<(Vec<u8>, Vec<u8>)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    iterator
        .into_iter()
        .map(|(key, value)| (key.as_ref().to_vec(), value.as_ref().to_vec()))
        .collect()
}

// =============================================================================
// Model Equivalence Laws
// =============================================================================

proptest! {
    /// Law: a MutableTable behaves like an ordered map.
    #[test]
    fn prop_mutable_matches_model(seed: u64, operations in arbitrary_operations(64)) {
        let mut table = MutableTable::with_seed(seed);
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for operation in &operations {
            match operation {
                Operation::Put(key, value) => table.put(key, value),
                Operation::Delete(key) => {
                    prop_assert_eq!(table.delete(key), model.contains_key(key));
                }
            }
            apply_to_model(&mut model, operation);
            prop_assert!(table.check_invariants().is_ok());
        }

        prop_assert_eq!(table.len(), model.len());
        prop_assert_eq!(table.size(), expected_size(&model));
        prop_assert_eq!(entries(table.iter()), entries(model.iter()));
    }

    /// Law: an ImmutableTable behaves like an ordered map.
    #[test]
    fn prop_immutable_matches_model(seed: u64, operations in arbitrary_operations(64)) {
        let mut table = ImmutableTable::with_seed(seed);
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for operation in &operations {
            table = match operation {
                Operation::Put(key, value) => table.put(key, value),
                Operation::Delete(key) => table.delete(key),
            };
            apply_to_model(&mut model, operation);
            prop_assert!(table.check_invariants().is_ok());
        }

        prop_assert_eq!(table.len(), model.len());
        prop_assert_eq!(table.size(), expected_size(&model));
        prop_assert_eq!(entries(table.iter()), entries(model.iter()));
    }
}

// =============================================================================
// Get-Put Laws
// =============================================================================

proptest! {
    /// Law: get after put returns the stored value, even when it is empty.
    #[test]
    fn prop_get_put_law(
        operations in arbitrary_operations(32),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let table = build_immutable(&operations).put(&key, &value);
        prop_assert!(table.has(&key));
        prop_assert_eq!(table.get(&key), Some(value.as_slice()));
    }

    /// Law: put does not affect other keys.
    #[test]
    fn prop_get_put_other_law(
        operations in arbitrary_operations(32),
        key1 in arbitrary_key(),
        key2 in arbitrary_key(),
        value in arbitrary_value()
    ) {
        prop_assume!(key1 != key2);
        let table = build_immutable(&operations);
        let updated = table.put(&key1, &value);
        prop_assert_eq!(updated.get(&key2), table.get(&key2));
    }

    /// Law: presence is reported independently of value emptiness.
    #[test]
    fn prop_has_matches_get(operations in arbitrary_operations(32), key in arbitrary_key()) {
        let table = build_immutable(&operations);
        prop_assert_eq!(table.has(&key), table.get(&key).is_some());
    }
}

// =============================================================================
// Delete Laws
// =============================================================================

proptest! {
    /// Law: get after delete returns None.
    #[test]
    fn prop_get_delete_law(operations in arbitrary_operations(32), key in arbitrary_key()) {
        let table = build_immutable(&operations).delete(&key);
        prop_assert_eq!(table.get(&key), None);
    }

    /// Law: delete is idempotent.
    #[test]
    fn prop_delete_idempotent(operations in arbitrary_operations(32), key in arbitrary_key()) {
        let once = build_immutable(&operations).delete(&key);
        let twice = once.delete(&key);
        prop_assert!(twice.ptr_eq(&once));
        prop_assert_eq!(twice.size(), once.size());
    }

    /// Law: deleting an inserted key restores the previous contents.
    #[test]
    fn prop_put_delete_restores(
        operations in arbitrary_operations(32),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let table = build_immutable(&operations);
        prop_assume!(!table.has(&key));
        let restored = table.put(&key, &value).delete(&key);
        prop_assert_eq!(&restored, &table);
        prop_assert_eq!(restored.size(), table.size());
    }
}

// =============================================================================
// Isolation Laws
// =============================================================================

proptest! {
    /// Law: writes to a MutableTable never reach an earlier snapshot.
    #[test]
    fn prop_snapshot_isolation(
        seed: u64,
        before in arbitrary_operations(32),
        after in arbitrary_operations(32)
    ) {
        let mut table = MutableTable::with_seed(seed);
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for operation in &before {
            match operation {
                Operation::Put(key, value) => table.put(key, value),
                Operation::Delete(key) => {
                    table.delete(key);
                }
            }
            apply_to_model(&mut model, operation);
        }

        let frozen = table.snapshot();
        for operation in &after {
            match operation {
                Operation::Put(key, value) => table.put(key, value),
                Operation::Delete(key) => {
                    table.delete(key);
                }
            }
        }

        prop_assert_eq!(entries(frozen.iter()), entries(model.iter()));
        prop_assert_eq!(frozen.size(), expected_size(&model));
        prop_assert!(frozen.check_invariants().is_ok());
        prop_assert!(table.check_invariants().is_ok());
    }

    /// Law: every ImmutableTable version keeps the contents it was built with.
    #[test]
    fn prop_every_version_stays_frozen(seed: u64, operations in arbitrary_operations(80)) {
        let mut versions = vec![ImmutableTable::with_seed(seed)];
        let mut models = vec![BTreeMap::new()];

        for operation in &operations {
            let (Some(current), Some(model)) = (versions.last(), models.last()) else {
                break;
            };
            let next = match operation {
                Operation::Put(key, value) => current.put(key, value),
                Operation::Delete(key) => current.delete(key),
            };
            let mut next_model: BTreeMap<Vec<u8>, Vec<u8>> = model.clone();
            apply_to_model(&mut next_model, operation);
            versions.push(next);
            models.push(next_model);
        }

        for (version, model) in versions.iter().zip(&models) {
            prop_assert_eq!(entries(version.iter()), entries(model.iter()));
            prop_assert_eq!(version.len(), model.len());
            prop_assert_eq!(version.size(), expected_size(model));
            prop_assert!(version.check_invariants().is_ok());
        }
    }

    /// Law: equal seeds and operations give identical shapes, so equal iteration.
    #[test]
    fn prop_seeded_tables_are_equal(seed: u64, operations in arbitrary_operations(32)) {
        let left = build_mutable(seed, &operations);
        let right = build_mutable(seed, &operations);
        prop_assert_eq!(left, right);
    }
}

fn build_mutable(seed: u64, operations: &[Operation]) -> MutableTable {
    let mut table = MutableTable::with_seed(seed);
    for operation in operations {
        match operation {
            Operation::Put(key, value) => table.put(key, value),
            Operation::Delete(key) => {
                table.delete(key);
            }
        }
    }
    table
}

fn build_immutable(operations: &[Operation]) -> ImmutableTable {
    build_mutable(0, operations).into_immutable()
}

// =============================================================================
// Adversarial Order Laws
// =============================================================================

proptest! {
    /// Law: sorted insertion orders, worst case for a plain BST, still keep both orders.
    #[test]
    fn prop_sorted_insertion_keeps_invariants(seed: u64, size in 1u32..512, descending: bool) {
        let mut table = MutableTable::with_seed(seed);
        let mut keys: Vec<u32> = (0..size).collect();
        if descending {
            keys.reverse();
        }
        for key in &keys {
            table.put(key.to_be_bytes(), "");
        }

        prop_assert!(table.check_invariants().is_ok());
        prop_assert_eq!(table.len(), size as usize);
        prop_assert_eq!(table.first().map(|(key, _)| key.to_vec()), Some(0u32.to_be_bytes().to_vec()));
        prop_assert_eq!(table.last().map(|(key, _)| key.to_vec()), Some((size - 1).to_be_bytes().to_vec()));
    }
}
