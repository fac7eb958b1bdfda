//! Basic create/read/update/delete behavior on the head state.

use weftdb_core::{
    Arena, CollectionId, ContentsArg, Options, Places, ReadSelection, Strided, ValuesArg, View,
    LENGTH_MISSING,
};
use weftdb_testkit::{del, get, put, with_temp_db};

#[test]
fn write_then_read_batch() {
    with_temp_db(|db| {
        let mut arena = Arena::new();
        let keys = [97_i64, 98, 99];
        let values = [
            Some(b"A".as_slice()),
            Some(b"B".as_slice()),
            Some(b"C".as_slice()),
        ];
        db.write(
            View::Head,
            &Places::in_collection(CollectionId::MAIN, &keys),
            &ContentsArg::separate(&values),
            Options::default(),
        )
        .unwrap();

        let out = db
            .read(
                View::Head,
                &Places::in_collection(CollectionId::MAIN, &keys),
                ReadSelection::ALL,
                Options::default(),
                &mut arena,
            )
            .unwrap();

        let lengths = out.lengths.unwrap();
        assert_eq!(arena.to_vec(lengths), vec![1, 1, 1]);
        assert_eq!(arena.bytes(out.values.unwrap()), b"ABC");
        let offsets = out.offsets.unwrap();
        assert_eq!(arena.to_vec(offsets), vec![0, 1, 2, 3]);
        for i in 0..3 {
            assert!(out.present(&arena, i));
        }
    });
}

#[test]
fn null_content_deletes() {
    with_temp_db(|db| {
        let mut arena = Arena::new();
        put(db, CollectionId::MAIN, 98, b"B").unwrap();
        del(db, CollectionId::MAIN, 98).unwrap();

        let keys = [98_i64];
        let out = db
            .read(
                View::Head,
                &Places::in_collection(CollectionId::MAIN, &keys),
                ReadSelection::ALL,
                Options::default(),
                &mut arena,
            )
            .unwrap();
        assert_eq!(arena.get(out.lengths.unwrap(), 0), LENGTH_MISSING);
        assert!(!out.present(&arena, 0));
        assert_eq!(out.value(&arena, 0), None);
    });
}

#[test]
fn later_writes_win() {
    with_temp_db(|db| {
        put(db, CollectionId::MAIN, 1, b"first").unwrap();
        put(db, CollectionId::MAIN, 2, b"second").unwrap();
        assert_eq!(get(db, CollectionId::MAIN, 1).unwrap(), Some(b"first".to_vec()));
        assert_eq!(get(db, CollectionId::MAIN, 2).unwrap(), Some(b"second".to_vec()));

        put(db, CollectionId::MAIN, 1, b"replaced").unwrap();
        assert_eq!(
            get(db, CollectionId::MAIN, 1).unwrap(),
            Some(b"replaced".to_vec())
        );
    });
}

#[test]
fn same_key_twice_in_one_batch_keeps_last() {
    with_temp_db(|db| {
        let keys = [7_i64, 7];
        let values = [Some(b"v1".as_slice()), Some(b"v2".as_slice())];
        db.write(
            View::Head,
            &Places::in_collection(CollectionId::MAIN, &keys),
            &ContentsArg::separate(&values),
            Options::default(),
        )
        .unwrap();
        assert_eq!(get(db, CollectionId::MAIN, 7).unwrap(), Some(b"v2".to_vec()));
    });
}

#[test]
fn idempotent_rewrite_preserves_value() {
    with_temp_db(|db| {
        for _ in 0..3 {
            put(db, CollectionId::MAIN, 5, b"same").unwrap();
            assert_eq!(get(db, CollectionId::MAIN, 5).unwrap(), Some(b"same".to_vec()));
        }
    });
}

#[test]
fn empty_payloads_are_present() {
    with_temp_db(|db| {
        let mut arena = Arena::new();
        put(db, CollectionId::MAIN, 3, b"").unwrap();

        let keys = [3_i64];
        let out = db
            .read(
                View::Head,
                &Places::in_collection(CollectionId::MAIN, &keys),
                ReadSelection::ALL,
                Options::default(),
                &mut arena,
            )
            .unwrap();
        assert!(out.present(&arena, 0));
        assert_eq!(arena.get(out.lengths.unwrap(), 0), 0);
        assert_eq!(out.value(&arena, 0), Some(b"".as_slice()));
    });
}

#[test]
fn joined_arrow_write() {
    with_temp_db(|db| {
        let keys = [10_i64, 11, 12];
        let buffer = b"onetwothree";
        let offsets = [0_u32, 3, 6, 11];
        db.write(
            View::Head,
            &Places::in_collection(CollectionId::MAIN, &keys),
            &ContentsArg::joined(buffer, Strided::from_slice(&offsets)),
            Options::default(),
        )
        .unwrap();
        assert_eq!(get(db, CollectionId::MAIN, 11).unwrap(), Some(b"two".to_vec()));
        assert_eq!(
            get(db, CollectionId::MAIN, 12).unwrap(),
            Some(b"three".to_vec())
        );
    });
}

#[test]
fn presence_bitmap_in_write_deletes() {
    with_temp_db(|db| {
        put(db, CollectionId::MAIN, 1, b"a").unwrap();
        put(db, CollectionId::MAIN, 2, b"b").unwrap();

        // Bit 0 cleared: entry 0 is a deletion despite its buffer.
        let keys = [1_i64, 2];
        let values = [Some(b"xx".as_slice()), Some(b"yy".as_slice())];
        let contents = ContentsArg {
            presences: Some(&[0b10]),
            ..ContentsArg::separate(&values)
        };
        db.write(
            View::Head,
            &Places::in_collection(CollectionId::MAIN, &keys),
            &contents,
            Options::default(),
        )
        .unwrap();

        assert_eq!(get(db, CollectionId::MAIN, 1).unwrap(), None);
        assert_eq!(get(db, CollectionId::MAIN, 2).unwrap(), Some(b"yy".to_vec()));
    });
}

#[test]
fn zero_key_stride_is_rejected() {
    with_temp_db(|db| {
        let values = [Some(b"x".as_slice())];
        let places = Places {
            count: 1,
            collections: Strided::repeated(CollectionId::MAIN),
            keys: Strided::repeated(9),
        };
        let result = db.write(
            View::Head,
            &places,
            &ContentsArg {
                values: ValuesArg::Separate(&values),
                offsets: None,
                lengths: None,
                presences: None,
            },
            Options::default(),
        );
        assert!(result.is_err());
    });
}
