//! Property-based test generators using proptest.

use proptest::prelude::*;
use weftdb_core::Key;

/// Strategy for keys spanning the whole signed range, biased toward small
/// magnitudes where collisions (and therefore interesting overwrites) happen.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        4 => -64_i64..64,
        1 => any::<i64>().prop_filter("reserve the unknown-key sentinel", |&k| k != i64::MAX),
    ]
}

/// Strategy for payloads, empty payloads included.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for valid named-collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,24}").expect("valid regex")
}

/// One randomized mutation step against a single collection.
#[derive(Debug, Clone)]
pub enum WorkloadOp {
    /// Upsert a payload.
    Put(Key, Vec<u8>),
    /// Delete a key.
    Del(Key),
}

/// Strategy for a randomized workload of puts and deletes.
pub fn workload_strategy(len: usize) -> impl Strategy<Value = Vec<WorkloadOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => (key_strategy(), payload_strategy()).prop_map(|(k, v)| WorkloadOp::Put(k, v)),
            1 => key_strategy().prop_map(WorkloadOp::Del),
        ],
        1..len.max(2),
    )
}
