// HashTable integration tests.
//
// Each test documents the behavior being verified. The core invariants
// exercised:
// - Placement: every entry sits in bucket `hash & (capacity - 1)`.
// - Conversion: a bucket reaching 8 entries in a table of at least 64
//   buckets is a tree; a split half of 6 or fewer entries is a chain.
// - Growth: capacity doubles once size exceeds capacity * load factor, and
//   resizing never changes the key set.
// - Snapshots: keys/values/entries are owned copies.
use adaptive_hashtable::{
    BucketForm, ConfigError, HashTable, TableConfig, DEFAULT_INITIAL_CAPACITY, MAXIMUM_CAPACITY,
};
use std::collections::BTreeSet;
use std::hash::{BuildHasher, Hasher};

// Hashes a u64 key to itself so tests can choose bucket indices.
#[derive(Clone, Default)]
struct IdentityBuildHasher;
struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher(0)
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

fn identity_table(capacity: usize) -> HashTable<u64, &'static str, IdentityBuildHasher> {
    HashTable::with_config_and_hasher(
        TableConfig::new().initial_capacity(capacity),
        IdentityBuildHasher,
    )
    .expect("valid config")
}

fn key_set<V>(m: &HashTable<u64, V, IdentityBuildHasher>) -> BTreeSet<u64> {
    m.keys().into_iter().collect()
}

// Test: eight colliding keys become a tree, and a resize after removals
// splits the survivors back into chains.
// Verifies: tree form after the 8th insertion; after removing 5 and growing
// to 128 buckets, buckets 0 and 64 are chains with the right survivors.
#[test]
fn collision_bucket_treeifies_then_splits_into_chains() {
    let mut m = identity_table(64);
    let colliding: Vec<u64> = (0..8).map(|i| i * 64).collect();
    for (i, &k) in colliding.iter().enumerate() {
        m.insert(k, "c");
        let expected = if i + 1 < 8 {
            BucketForm::Chain
        } else {
            BucketForm::Tree
        };
        assert_eq!(m.bucket_form(0), Some(expected), "after {} inserts", i + 1);
    }
    assert_eq!(m.capacity(), 64);
    m.check_invariants().expect("valid after treeify");

    for k in [64, 128, 192, 256, 320] {
        assert_eq!(m.remove(&k), Some("c"));
    }
    // Removal alone never demotes.
    assert_eq!(m.bucket_form(0), Some(BucketForm::Tree));
    m.check_invariants().expect("valid after removals");

    // Fill other buckets until size exceeds the threshold of 48.
    for k in 1..=46u64 {
        m.insert(k, "filler");
    }
    assert_eq!(m.capacity(), 128);
    m.check_invariants().expect("valid after resize");

    assert_eq!(m.bucket_form(0), Some(BucketForm::Chain));
    assert_eq!(m.bucket_form(64), Some(BucketForm::Chain));
    let low: BTreeSet<u64> = m.bucket_keys(0).into_iter().copied().collect();
    let high: BTreeSet<u64> = m.bucket_keys(64).into_iter().copied().collect();
    assert_eq!(low, BTreeSet::from([0, 384]));
    assert_eq!(high, BTreeSet::from([448]));
}

// Test: a half that keeps more than 6 entries stays a tree across a split.
#[test]
fn large_split_half_stays_tree() {
    let mut m = identity_table(64);
    // Even multiples of 64 stay in bucket 0 at 128 buckets; odd ones go to 64.
    for i in 0..20u64 {
        m.insert(i * 64, "c");
    }
    assert_eq!(m.bucket_form(0), Some(BucketForm::Tree));
    for k in 1..=40u64 {
        m.insert(k, "filler");
    }
    assert_eq!(m.capacity(), 128);
    assert_eq!(m.bucket_form(0), Some(BucketForm::Tree));
    assert_eq!(m.bucket_form(64), Some(BucketForm::Tree));
    assert_eq!(m.bucket_keys(0).len(), 10);
    assert_eq!(m.bucket_keys(64).len(), 10);
    m.check_invariants().expect("valid after split");
}

// Test: resizing preserves the key set and placement.
#[test]
fn resize_preserves_keys() {
    let mut m: HashTable<u64, u64> = HashTable::new();
    assert_eq!(m.capacity(), DEFAULT_INITIAL_CAPACITY);
    let expected: BTreeSet<u64> = (0..5_000u64).map(|i| i.wrapping_mul(0x9e37_79b9)).collect();
    for &k in &expected {
        m.insert(k, k + 1);
    }
    assert_eq!(m.len(), expected.len());
    assert!(m.capacity().is_power_of_two());
    assert!(m.len() as f32 <= m.capacity() as f32 * m.load_factor());
    let got: BTreeSet<u64> = m.keys().into_iter().collect();
    assert_eq!(got, expected);
    for &k in &expected {
        assert_eq!(m.peek(&k), Some(&(k + 1)));
    }
    m.check_invariants().expect("valid after growth");
}

// Test: clear empties the table, keeps capacity, and the table is reusable.
// Verifies: every bucket is empty afterwards, and refilling to the old size
// does not grow the table again.
#[test]
fn clear_round_trip() {
    let mut m = identity_table(16);
    for k in 0..100u64 {
        m.insert(k, "v");
    }
    let cap = m.capacity();
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.capacity(), cap);
    assert!(key_set(&m).is_empty());
    m.check_invariants().expect("valid after clear");
    assert!((0..cap).all(|i| m.bucket_form(i).is_none()));
    for k in 0..10u64 {
        m.insert(k, "w");
    }
    assert_eq!(key_set(&m), (0..10).collect());
    for k in 10..100u64 {
        m.insert(k, "w");
    }
    assert_eq!(m.capacity(), cap);
}

// Test: a load factor that is zero, negative or not a number is rejected.
#[test]
fn invalid_load_factor_is_rejected() {
    for lf in [0.0f32, -1.0, f32::NAN, f32::INFINITY] {
        let r = HashTable::<u64, u64>::with_capacity_and_load_factor(16, lf);
        match r {
            Err(ConfigError::InvalidLoadFactor(_)) => {}
            Ok(_) => panic!("load factor {lf} must be rejected"),
        }
    }
    let err = TableConfig::new().load_factor(-0.5).validate().unwrap_err();
    assert_eq!(err.to_string(), "illegal load factor: -0.5");
}

// Test: requested capacities round up to a power of two and clamp.
#[test]
fn capacity_rounding_and_clamping() {
    assert_eq!(HashTable::<u64, u64>::with_capacity(0).capacity(), 1);
    assert_eq!(HashTable::<u64, u64>::with_capacity(17).capacity(), 32);
    assert_eq!(HashTable::<u64, u64>::with_capacity(64).capacity(), 64);
    assert_eq!(
        HashTable::<u64, u64>::with_capacity(usize::MAX).capacity(),
        MAXIMUM_CAPACITY
    );
}

// Test: a high load factor lets chains grow long before resizing.
#[test]
fn custom_load_factor_controls_growth() {
    let mut m = HashTable::with_config_and_hasher(
        TableConfig::new().initial_capacity(16).load_factor(4.0),
        IdentityBuildHasher,
    )
    .expect("valid");
    // Four keys per bucket: long chains, none reaching the treeify threshold.
    for k in 0..64u64 {
        m.insert(k, k);
    }
    assert_eq!(m.capacity(), 16);
    m.insert(64, 64);
    assert_eq!(m.capacity(), 32);
    m.check_invariants().expect("valid");
}

// Test: snapshots do not change when the table does.
#[test]
fn snapshots_are_owned() {
    let mut m = identity_table(16);
    m.insert(3, "three");
    m.insert(7, "seven");
    let keys = m.keys();
    let values = m.values();
    let entries = m.entries();
    m.insert(5, "five");
    m.remove(&3);
    assert_eq!(keys, vec![3, 7]);
    assert_eq!(values, vec!["three", "seven"]);
    assert_eq!(entries, vec![(3, "three"), (7, "seven")]);
    assert_eq!(m.keys(), vec![5, 7]);
}

// Test: an `Option` key models a null key; it is stored and found like any other.
#[test]
fn none_key_is_an_ordinary_key() {
    let mut m: HashTable<Option<String>, u32> = HashTable::new();
    assert_eq!(m.insert(None, 1), None);
    assert_eq!(m.insert(Some("x".into()), 2), None);
    assert_eq!(m.insert(None, 3), Some(1));
    assert_eq!(m.peek(&None), Some(&3));
    assert_eq!(m.len(), 2);
    assert_eq!(m.remove(&None), Some(3));
    assert!(!m.contains_key(&None));
}

// Test: `None` has no reserved slot; it goes wherever the hasher sends it.
// Verifies: with a hasher that yields 0 for `None`, it shares bucket 0 with
// another hash-0 key and keeps its place in the chain order.
#[test]
fn none_key_is_placed_by_its_hash() {
    let mut m: HashTable<Option<u64>, &str, IdentityBuildHasher> = HashTable::with_config_and_hasher(
        TableConfig::new().initial_capacity(16),
        IdentityBuildHasher,
    )
    .expect("valid config");
    m.insert(Some(16), "sixteen");
    m.insert(None, "none");
    m.insert(Some(3), "three");
    assert_eq!(m.bucket_keys(0), vec![&Some(16), &None]);
    assert_eq!(m.bucket_keys(3), vec![&Some(3)]);
    assert_eq!(m.peek(&None), Some(&"none"));
    m.check_invariants().expect("valid");
}

// Test: the bucket accessors report nothing for empty or out-of-range buckets.
#[test]
fn bucket_accessors_on_empty_buckets() {
    let mut m = identity_table(16);
    assert_eq!(m.bucket_form(0), None);
    m.insert(1, "a");
    assert_eq!(m.bucket_form(0), None);
    assert_eq!(m.bucket_form(1), Some(BucketForm::Chain));
    assert_eq!(m.bucket_form(999), None);
    assert!(m.bucket_keys(999).is_empty());
}
