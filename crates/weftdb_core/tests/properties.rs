//! Randomized workloads checked against an in-memory model.

use std::collections::BTreeMap;

use proptest::prelude::*;
use weftdb_core::{CollectionId, Key};
use weftdb_testkit::{
    del, get, key_strategy, put, scan, with_temp_db, workload_strategy, WorkloadOp,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_workload_matches_model(ops in workload_strategy(48)) {
        with_temp_db(|db| {
            let mut model: BTreeMap<Key, Vec<u8>> = BTreeMap::new();
            for op in &ops {
                match op {
                    WorkloadOp::Put(key, value) => {
                        put(db, CollectionId::MAIN, *key, value).unwrap();
                        model.insert(*key, value.clone());
                    }
                    WorkloadOp::Del(key) => {
                        del(db, CollectionId::MAIN, *key).unwrap();
                        model.remove(key);
                    }
                }
            }

            for op in &ops {
                let key = match op {
                    WorkloadOp::Put(key, _) | WorkloadOp::Del(key) => *key,
                };
                prop_assert_eq!(
                    get(db, CollectionId::MAIN, key).unwrap(),
                    model.get(&key).cloned()
                );
            }

            let scanned = scan(db, CollectionId::MAIN, i64::MIN, i64::MAX, u32::MAX).unwrap();
            let expected: Vec<Key> = model.keys().copied().collect();
            prop_assert_eq!(scanned, expected);
            Ok(())
        })?;
    }

    #[test]
    fn scan_windows_stay_sorted_and_bounded(
        ops in workload_strategy(32),
        start in key_strategy(),
        span in 0_i64..200,
        limit in 0_u32..40,
    ) {
        with_temp_db(|db| {
            for op in &ops {
                match op {
                    WorkloadOp::Put(key, value) => put(db, CollectionId::MAIN, *key, value).unwrap(),
                    WorkloadOp::Del(key) => del(db, CollectionId::MAIN, *key).unwrap(),
                }
            }

            let end = start.saturating_add(span);
            let keys = scan(db, CollectionId::MAIN, start, end, limit).unwrap();

            prop_assert!(keys.len() <= limit as usize);
            prop_assert!(keys.iter().all(|&k| k >= start && k < end));
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
            Ok(())
        })?;
    }

    #[test]
    fn committed_transactions_match_direct_writes(ops in workload_strategy(24)) {
        with_temp_db(|db| {
            // Apply the workload through one transaction...
            let mut txn = db.transaction();
            for op in &ops {
                let (key, value): (Key, Option<&[u8]>) = match op {
                    WorkloadOp::Put(key, value) => (*key, Some(value.as_slice())),
                    WorkloadOp::Del(key) => (*key, None),
                };
                let keys = [key];
                let values = [value];
                db.write(
                    weftdb_core::View::Transaction(&mut txn),
                    &weftdb_core::Places::in_collection(CollectionId::MAIN, &keys),
                    &weftdb_core::ContentsArg::separate(&values),
                    weftdb_core::Options::default(),
                )
                .unwrap();
            }
            txn.commit(weftdb_core::Options::default()).unwrap();

            // ...and replay it on a model.
            let mut model: BTreeMap<Key, Vec<u8>> = BTreeMap::new();
            for op in &ops {
                match op {
                    WorkloadOp::Put(key, value) => {
                        model.insert(*key, value.clone());
                    }
                    WorkloadOp::Del(key) => {
                        model.remove(key);
                    }
                }
            }

            let scanned = scan(db, CollectionId::MAIN, i64::MIN, i64::MAX, u32::MAX).unwrap();
            let expected: Vec<Key> = model.keys().copied().collect();
            prop_assert_eq!(scanned, expected);
            for (key, value) in &model {
                let got = get(db, CollectionId::MAIN, *key).unwrap();
                prop_assert_eq!(got.as_ref(), Some(value));
            }
            Ok(())
        })?;
    }
}
