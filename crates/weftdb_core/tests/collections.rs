//! Collection lifecycle: drop modes, listing, and the control channel.

use weftdb_core::{CollectionId, DbError, DropMode, Options, View};
use weftdb_testkit::{fill, get, get_via, put, scan, with_temp_db};

#[test]
fn values_only_drop_preserves_keys_for_conflicts() {
    with_temp_db(|db| {
        let col = db.create_collection("c", "").unwrap();
        fill(db, col, &[(1, b"a".as_slice()), (2, b"b")]).unwrap();

        db.drop_collection(col, DropMode::ValuesOnly).unwrap();

        // Scans are empty but the tombstoned keys still trip transactions.
        assert!(scan(db, col, i64::MIN, i64::MAX, 10).unwrap().is_empty());
        assert_eq!(get(db, col, 1).unwrap(), None);

        let mut txn = db.transaction_at(weftdb_core::Generation::new(1));
        let result = get_via(db, View::Transaction(&mut txn), col, 1);
        assert!(matches!(result, Err(DbError::Conflict { .. })));
    });
}

#[test]
fn keys_and_values_drop_empties_the_collection() {
    with_temp_db(|db| {
        let col = db.create_collection("c", "").unwrap();
        fill(db, col, &[(1, b"a".as_slice()), (2, b"b")]).unwrap();

        db.drop_collection(col, DropMode::KeysAndValues).unwrap();

        assert!(scan(db, col, i64::MIN, i64::MAX, 10).unwrap().is_empty());
        assert_eq!(get(db, col, 1).unwrap(), None);
        // The collection handle stays listed.
        assert_eq!(db.list_collections().len(), 1);

        put(db, col, 3, b"fresh").unwrap();
        assert_eq!(get(db, col, 3).unwrap(), Some(b"fresh".to_vec()));
    });
}

#[test]
fn handle_drop_removes_the_collection() {
    with_temp_db(|db| {
        let col = db.create_collection("c", "").unwrap();
        db.drop_collection(col, DropMode::CollectionHandle).unwrap();
        assert!(db.list_collections().is_empty());
        assert!(matches!(get(db, col, 1), Err(DbError::NotFound { .. })));
    });
}

#[test]
fn main_supports_content_drops_only() {
    with_temp_db(|db| {
        put(db, CollectionId::MAIN, 1, b"a").unwrap();
        db.drop_collection(CollectionId::MAIN, DropMode::KeysAndValues)
            .unwrap();
        assert_eq!(get(db, CollectionId::MAIN, 1).unwrap(), None);

        let result = db.drop_collection(CollectionId::MAIN, DropMode::CollectionHandle);
        assert!(matches!(result, Err(DbError::InvalidArgument { .. })));
    });
}

#[test]
fn listing_is_name_ordered_and_omits_main() {
    with_temp_db(|db| {
        db.create_collection("zeta", "").unwrap();
        db.create_collection("alpha", "").unwrap();
        let names: Vec<String> = db.list_collections().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    });
}

#[test]
fn control_clear_purges_keys_but_keeps_names() {
    with_temp_db(|db| {
        let col = db.create_collection("c", "").unwrap();
        put(db, CollectionId::MAIN, 1, b"m").unwrap();
        put(db, col, 2, b"c").unwrap();

        db.control("clear").unwrap();

        assert_eq!(get(db, CollectionId::MAIN, 1).unwrap(), None);
        assert_eq!(get(db, col, 2).unwrap(), None);
        assert_eq!(db.list_collections().len(), 1);
    });
}

#[test]
fn control_compact_drops_unpinned_history() {
    with_temp_db(|db| {
        put(db, CollectionId::MAIN, 1, b"a").unwrap();
        let snap = db.snapshot_create().unwrap();
        put(db, CollectionId::MAIN, 1, b"b").unwrap();

        db.snapshot_drop(snap).unwrap();
        db.control("compact").unwrap();
        assert_eq!(get(db, CollectionId::MAIN, 1).unwrap(), Some(b"b".to_vec()));
    });
}

#[test]
fn control_usage_lists_every_collection() {
    with_temp_db(|db| {
        db.create_collection("events", "").unwrap();
        let usage = db.control("usage").unwrap();
        assert!(usage.contains("events"));
    });
}

#[test]
fn reads_against_unknown_collections_fail() {
    with_temp_db(|db| {
        let ghost = CollectionId::new(404);
        assert!(matches!(get(db, ghost, 1), Err(DbError::NotFound { .. })));
        assert!(matches!(
            put(db, ghost, 1, b"x"),
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            scan(db, ghost, i64::MIN, i64::MAX, 1),
            Err(DbError::NotFound { .. })
        ));
    });
}

#[test]
fn size_estimates_bound_the_range() {
    with_temp_db(|db| {
        fill(
            db,
            CollectionId::MAIN,
            &[(1, b"aa".as_slice()), (2, b"bbb"), (9, b"zzzz")],
        )
        .unwrap();
        weftdb_testkit::del(db, CollectionId::MAIN, 2).unwrap();

        let mut arena = weftdb_core::Arena::new();
        let tasks = weftdb_core::SizeTasks::single(CollectionId::MAIN, 0, 5);
        let out = db
            .size(View::Head, &tasks, Options::default(), &mut arena)
            .unwrap();

        // Only key 1 is live inside [0, 5); key 2 is the tombstone tail.
        assert_eq!(arena.get(out.min_cardinalities, 0), 1);
        assert_eq!(arena.get(out.max_cardinalities, 0), 1);
        assert_eq!(arena.get(out.min_value_bytes, 0), 2);
        assert_eq!(arena.get(out.max_value_bytes, 0), 2);
        let overhead = weftdb_core::dispatch::PER_ENTRY_OVERHEAD;
        assert_eq!(arena.get(out.min_space_usages, 0), overhead + 2);
        assert_eq!(arena.get(out.max_space_usages, 0), 2 * overhead + 2);
    });
}

#[test]
fn size_estimates_count_transaction_overlay() {
    with_temp_db(|db| {
        fill(db, CollectionId::MAIN, &[(1, b"aa".as_slice())]).unwrap();

        let mut txn = db.transaction();
        let keys = [2_i64];
        let values = [Some(b"bbbb".as_slice())];
        db.write(
            View::Transaction(&mut txn),
            &weftdb_core::Places::in_collection(CollectionId::MAIN, &keys),
            &weftdb_core::ContentsArg::separate(&values),
            Options::default(),
        )
        .unwrap();

        let mut arena = weftdb_core::Arena::new();
        let tasks = weftdb_core::SizeTasks::single(CollectionId::MAIN, i64::MIN, i64::MAX);
        let out = db
            .size(View::Transaction(&mut txn), &tasks, Options::default(), &mut arena)
            .unwrap();

        assert_eq!(arena.get(out.min_cardinalities, 0), 1);
        assert_eq!(arena.get(out.max_cardinalities, 0), 2);
        assert_eq!(arena.get(out.min_value_bytes, 0), 2);
        assert_eq!(arena.get(out.max_value_bytes, 0), 6);
    });
}
