//! Property-style tests for the ordered index against a `BTreeMap` model.

use std::collections::BTreeMap;

use ag_01_ordered_index::{IndexError, OrderedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn make_key(n: u32) -> Vec<u8> {
    format!("{:08}", n).into_bytes()
}

fn assert_strictly_ascending(index: &OrderedIndex<u32>) {
    let keys: Vec<&[u8]> = index.iter().map(|(key, _)| key).collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "keys out of order: {:?} !< {:?}", pair[0], pair[1]);
    }
}

// =============================================================================
// ORDERING
// =============================================================================

#[test]
fn test_shuffled_inserts_come_back_ascending() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut numbers: Vec<u32> = (1..=1000).collect();
    numbers.shuffle(&mut rng);

    let mut index = OrderedIndex::new();
    for n in &numbers {
        index.put(&make_key(*n), *n).unwrap();
    }

    let values: Vec<u32> = index.to_array().into_iter().map(|(_, v)| *v).collect();
    assert_eq!(values, (1..=1000).collect::<Vec<_>>());
    index.validate().unwrap();
}

#[test]
fn test_random_put_remove_matches_model() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut index = OrderedIndex::new();
    let mut model = BTreeMap::new();

    for _ in 0..5_000 {
        let n = rng.gen_range(0..600u32);
        let key = make_key(n);
        if rng.gen_bool(0.6) {
            let outcome = index.put(&key, n);
            if model.contains_key(&key) {
                assert!(matches!(outcome, Err(IndexError::DuplicateKey { .. })));
            } else {
                outcome.unwrap();
                model.insert(key, n);
            }
        } else {
            match model.remove(&key) {
                Some(expected) => assert_eq!(index.remove(&key).unwrap(), expected),
                None => assert!(index.remove(&key).is_err()),
            }
        }
    }

    index.validate().unwrap();
    assert_strictly_ascending(&index);
    assert_eq!(index.len(), model.len());
    let actual: Vec<(Vec<u8>, u32)> = index.iter().map(|(k, v)| (k.to_vec(), *v)).collect();
    let expected: Vec<(Vec<u8>, u32)> = model.into_iter().collect();
    assert_eq!(actual, expected);
}

// =============================================================================
// NEIGHBOUR LOOKUPS
// =============================================================================

#[test]
fn test_neighbours_never_return_own_entry() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = OrderedIndex::new();
    let mut model = BTreeMap::new();
    for _ in 0..800 {
        let n = rng.gen_range(0..10_000u32);
        if index.put(&make_key(n), n).is_ok() {
            model.insert(make_key(n), n);
        }
    }

    for (key, value) in &model {
        let next = index.next_entry(key);
        let expected_next = model.range::<Vec<u8>, _>((
            std::ops::Bound::Excluded(key.clone()),
            std::ops::Bound::Unbounded,
        ))
        .next();
        assert_eq!(next.map(|(k, v)| (k.to_vec(), *v)), expected_next.map(|(k, v)| (k.clone(), *v)));

        let previous = index.previous_entry(key);
        let expected_previous = model.range::<Vec<u8>, _>(..key.clone()).next_back();
        assert_eq!(
            previous.map(|(k, v)| (k.to_vec(), *v)),
            expected_previous.map(|(k, v)| (k.clone(), *v))
        );

        if let Some((next_key, _)) = next {
            assert_ne!(next_key, key.as_slice());
        }
        if let Some((previous_key, _)) = previous {
            assert_ne!(previous_key, key.as_slice());
        }
        assert_eq!(index.get(key), Some(value));
    }
}

#[test]
fn test_walk_with_next_entry_visits_everything() {
    let mut index = OrderedIndex::new();
    for n in (0..300).rev() {
        index.put(&make_key(n), n).unwrap();
    }

    let mut cursor: Vec<u8> = Vec::new();
    let mut seen = Vec::new();
    while let Some((key, value)) = index.next_entry(&cursor) {
        seen.push(*value);
        cursor = key.to_vec();
    }
    assert_eq!(seen, (0..300).collect::<Vec<_>>());
}

// =============================================================================
// SHRINKING
// =============================================================================

#[test]
fn test_emptying_in_random_order_returns_to_depth_zero() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut numbers: Vec<u32> = (0..2_000).collect();
    let mut index = OrderedIndex::new();
    for n in &numbers {
        index.put(&make_key(*n), *n).unwrap();
    }
    assert!(index.depth() >= 3);

    numbers.shuffle(&mut rng);
    for n in &numbers {
        index.remove(&make_key(*n)).unwrap();
    }

    assert_eq!(index.depth(), 0);
    assert!(index.is_empty());
    for n in numbers.iter().take(20) {
        assert_eq!(index.get(&make_key(*n)), None);
    }
    index.validate().unwrap();
}
