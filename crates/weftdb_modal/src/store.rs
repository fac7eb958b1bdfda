//! Single-key shims over the core's batched contract.
//!
//! Adapters speak batches where batching pays off and these helpers where a
//! modality operation touches one key.

use weftdb_core::{
    Arena, CollectionId, ContentsArg, Database, DbResult, Key, Options, Places, ReadSelection,
    ScanTasks, View,
};

pub(crate) fn put(
    db: &Database,
    col: CollectionId,
    key: Key,
    payload: &[u8],
) -> DbResult<()> {
    let keys = [key];
    let values = [Some(payload)];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::default(),
    )
}

pub(crate) fn del(db: &Database, col: CollectionId, key: Key) -> DbResult<()> {
    let keys = [key];
    let values = [None];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::default(),
    )
}

pub(crate) fn get(
    db: &Database,
    arena: &mut Arena,
    col: CollectionId,
    key: Key,
) -> DbResult<Option<Vec<u8>>> {
    let keys = [key];
    let out = db.read(
        View::Head,
        &Places::in_collection(col, &keys),
        ReadSelection::ALL,
        Options::default(),
        arena,
    )?;
    Ok(out.value(arena, 0).map(<[u8]>::to_vec))
}

pub(crate) fn get_many(
    db: &Database,
    arena: &mut Arena,
    col: CollectionId,
    keys: &[Key],
) -> DbResult<Vec<Option<Vec<u8>>>> {
    let out = db.read(
        View::Head,
        &Places::in_collection(col, keys),
        ReadSelection::ALL,
        Options::default(),
        arena,
    )?;
    Ok((0..keys.len())
        .map(|i| out.value(arena, i).map(<[u8]>::to_vec))
        .collect())
}

pub(crate) fn scan_keys(
    db: &Database,
    arena: &mut Arena,
    col: CollectionId,
    start: Key,
    end: Key,
    limit: u32,
) -> DbResult<Vec<Key>> {
    let tasks = ScanTasks::single(col, start, end, limit);
    let out = db.scan(View::Head, &tasks, Options::default(), arena)?;
    Ok(out.task_keys(arena, 0))
}
