//! Test fixtures and database helpers.

use std::path::Path;

use tempfile::TempDir;
use weftdb_core::{
    Arena, CollectionId, Config, ContentsArg, Database, DbResult, Key, Options, Places,
    ReadSelection, ScanTasks, View,
};

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// Kept alive so the directory outlives the database.
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates an in-memory test database.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            db: Database::with_config(Config::new()).expect("open in-memory database"),
            _temp_dir: None,
        }
    }

    /// Creates a test database backed by a fresh temporary directory.
    #[must_use]
    pub fn persistent() -> Self {
        let temp_dir = TempDir::new().expect("create temp directory");
        let db = Database::with_config(Config::new().directory(temp_dir.path()))
            .expect("open persistent database");
        Self {
            db,
            _temp_dir: Some(temp_dir),
        }
    }

    /// The backing directory, if persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test against a fresh in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Writes one key to the head state.
pub fn put(db: &Database, col: CollectionId, key: Key, value: &[u8]) -> DbResult<()> {
    let keys = [key];
    let values = [Some(value)];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::default(),
    )
}

/// Deletes one key from the head state.
pub fn del(db: &Database, col: CollectionId, key: Key) -> DbResult<()> {
    let keys = [key];
    let values = [None];
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::default(),
    )
}

/// Reads one key through an arbitrary view, copying the payload out.
pub fn get_via(
    db: &Database,
    view: View<'_, '_>,
    col: CollectionId,
    key: Key,
) -> DbResult<Option<Vec<u8>>> {
    let mut arena = Arena::new();
    let keys = [key];
    let out = db.read(
        view,
        &Places::in_collection(col, &keys),
        ReadSelection::ALL,
        Options::default(),
        &mut arena,
    )?;
    Ok(out.value(&arena, 0).map(<[u8]>::to_vec))
}

/// Reads one key from the head state.
pub fn get(db: &Database, col: CollectionId, key: Key) -> DbResult<Option<Vec<u8>>> {
    get_via(db, View::Head, col, key)
}

/// Scans one collection range from the head state.
pub fn scan(
    db: &Database,
    col: CollectionId,
    start: Key,
    end: Key,
    limit: u32,
) -> DbResult<Vec<Key>> {
    let mut arena = Arena::new();
    let tasks = ScanTasks::single(col, start, end, limit);
    let out = db.scan(View::Head, &tasks, Options::default(), &mut arena)?;
    Ok(out.task_keys(&arena, 0))
}

/// Fills `col` with `(key, payload)` pairs in one batched write.
pub fn fill(db: &Database, col: CollectionId, entries: &[(Key, &[u8])]) -> DbResult<()> {
    let keys: Vec<Key> = entries.iter().map(|(k, _)| *k).collect();
    let values: Vec<Option<&[u8]>> = entries.iter().map(|(_, v)| Some(*v)).collect();
    db.write(
        View::Head,
        &Places::in_collection(col, &keys),
        &ContentsArg::separate(&values),
        Options::default(),
    )
}
