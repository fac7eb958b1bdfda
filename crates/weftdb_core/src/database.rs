//! The database handle.
//!
//! A [`Database`] owns the main collection, every named collection, the
//! monotone generation counter, the global reader/writer lock, and the
//! optional persistence directory. Transactions, snapshots, and the batched
//! dispatcher all hang off this type; they borrow the database and never own
//! collection state themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::codec;
use crate::collection::Collection;
use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::error::{DbError, DbResult};
use crate::types::{CollectionId, DropMode, Generation, SnapshotId};

/// Everything guarded by the database lock.
#[derive(Debug)]
pub(crate) struct DbState {
    pub(crate) main: Collection,
    /// Name to id, names unique, empty name reserved for main.
    pub(crate) named: BTreeMap<String, CollectionId>,
    /// Id to collection, named collections only.
    pub(crate) collections: HashMap<CollectionId, Collection>,
    /// Live snapshots and the generations they pin.
    pub(crate) snapshots: BTreeMap<SnapshotId, Generation>,
}

impl DbState {
    fn new() -> Self {
        Self {
            main: Collection::new(""),
            named: BTreeMap::new(),
            collections: HashMap::new(),
            snapshots: BTreeMap::new(),
        }
    }

    pub(crate) fn collection(&self, id: CollectionId) -> DbResult<&Collection> {
        if id.is_main() {
            return Ok(&self.main);
        }
        self.collections
            .get(&id)
            .ok_or_else(|| DbError::not_found(format!("{id}")))
    }

    pub(crate) fn collection_mut(&mut self, id: CollectionId) -> DbResult<&mut Collection> {
        if id.is_main() {
            return Ok(&mut self.main);
        }
        self.collections
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found(format!("{id}")))
    }

    /// Generations pinned by live snapshots, ascending and deduplicated.
    pub(crate) fn pinned(&self) -> Vec<Generation> {
        let mut pinned: Vec<Generation> = self.snapshots.values().copied().collect();
        pinned.sort_unstable();
        pinned.dedup();
        pinned
    }
}

/// An embedded transactional key-value database.
///
/// Any number of threads may share one `Database`; the engine provides its
/// own synchronization and callers must not wrap collection handles in
/// additional locks.
#[derive(Debug)]
pub struct Database {
    pub(crate) state: RwLock<DbState>,
    youngest: AtomicU64,
    next_collection_id: AtomicU64,
    pub(crate) next_snapshot_id: AtomicU64,
    config: Config,
    pub(crate) dir: Option<DatabaseDir>,
}

impl Database {
    /// Opens a database from its JSON configuration blob.
    ///
    /// An empty blob opens an in-memory database. With a `directory`
    /// configured, every collection file found there is loaded, and the
    /// directory lock is taken; a lock held elsewhere fails with `InUse`.
    pub fn open(config_text: &str) -> DbResult<Self> {
        Self::with_config(Config::from_json(config_text)?)
    }

    /// Opens a database from an already-built [`Config`].
    pub fn with_config(config: Config) -> DbResult<Self> {
        let dir = match &config.directory {
            Some(path) => Some(DatabaseDir::open(path, config.create_if_missing)?),
            None => None,
        };

        let mut state = DbState::new();
        let mut next_collection_id = 1;
        if let Some(dir) = &dir {
            for (name, path) in dir.list_collection_files()? {
                let loaded = codec::read_collection(&name, &path)?;
                if name.is_empty() {
                    state.main = loaded;
                } else {
                    let id = CollectionId::new(next_collection_id);
                    next_collection_id += 1;
                    state.named.insert(name, id);
                    state.collections.insert(id, loaded);
                }
            }
            tracing::debug!(
                path = %dir.path().display(),
                collections = state.named.len(),
                "database loaded"
            );
        }

        Ok(Self {
            state: RwLock::new(state),
            youngest: AtomicU64::new(0),
            next_collection_id: AtomicU64::new(next_collection_id),
            next_snapshot_id: AtomicU64::new(1),
            config,
            dir,
        })
    }

    /// The configuration this database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Issues a fresh generation.
    pub(crate) fn bump_generation(&self) -> Generation {
        Generation::new(self.youngest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recent generation issued. Readable without the lock.
    #[must_use]
    pub fn youngest_generation(&self) -> Generation {
        Generation::new(self.youngest.load(Ordering::SeqCst))
    }

    pub(crate) fn state_for_commit(&self) -> RwLockWriteGuard<'_, DbState> {
        self.state.write()
    }

    /// Writes every collection to the configured directory. A no-op for
    /// in-memory databases.
    pub(crate) fn persist_all(&self, state: &DbState) -> DbResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        codec::write_collection(&state.main, None, &dir.collection_path(""))?;
        for (name, id) in &state.named {
            if let Some(col) = state.collections.get(id) {
                codec::write_collection(col, None, &dir.collection_path(name))?;
            }
        }
        tracing::debug!(collections = state.named.len() + 1, "database persisted");
        Ok(())
    }

    /// Lists named collections as `(id, name)` pairs, name-ordered. The main
    /// collection is omitted; the listing is a point-in-time query under the
    /// shared lock.
    #[must_use]
    pub fn list_collections(&self) -> Vec<(CollectionId, String)> {
        let state = self.state.read();
        state
            .named
            .iter()
            .map(|(name, &id)| (id, name.clone()))
            .collect()
    }

    /// Resolves a collection name to its id. The empty name is the main
    /// collection.
    pub fn collection_named(&self, name: &str) -> DbResult<CollectionId> {
        if name.is_empty() {
            return Ok(CollectionId::MAIN);
        }
        let state = self.state.read();
        state
            .named
            .get(name)
            .copied()
            .ok_or_else(|| DbError::not_found(format!("collection \"{name}\"")))
    }

    /// Creates a named collection. The `_config` blob is reserved for
    /// engine-specific collection settings and is ignored here.
    pub fn create_collection(&self, name: &str, _config: &str) -> DbResult<CollectionId> {
        if name.is_empty() {
            return Err(DbError::invalid_argument(
                "the empty name is reserved for the main collection",
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(DbError::invalid_argument(
                "collection names may not contain path separators",
            ));
        }

        let mut state = self.state.write();
        if state.named.contains_key(name) {
            return Err(DbError::already_exists(format!("collection \"{name}\"")));
        }
        let id = CollectionId::new(self.next_collection_id.fetch_add(1, Ordering::SeqCst));
        state.named.insert(name.to_string(), id);
        state.collections.insert(id, Collection::new(name));
        tracing::info!(name, id = id.as_u64(), "collection created");
        Ok(id)
    }

    /// Drops collection contents or the collection itself, per `mode`.
    ///
    /// The main collection only supports the content-dropping modes;
    /// `DropMode::CollectionHandle` on it fails with `InvalidArgument`.
    pub fn drop_collection(&self, id: CollectionId, mode: DropMode) -> DbResult<()> {
        if id.is_main() && mode == DropMode::CollectionHandle {
            return Err(DbError::invalid_argument(
                "the main collection cannot be dropped, only cleared",
            ));
        }

        let mut state = self.state.write();
        match mode {
            DropMode::ValuesOnly => {
                let generation = self.bump_generation();
                let pinned = state.pinned();
                state.collection_mut(id)?.clear_values(generation, &pinned);
            }
            DropMode::KeysAndValues => {
                state.collection_mut(id)?.clear_all();
            }
            DropMode::CollectionHandle => {
                let col = state
                    .collections
                    .remove(&id)
                    .ok_or_else(|| DbError::not_found(format!("{id}")))?;
                state.named.remove(col.name());
                if let Some(dir) = &self.dir {
                    dir.remove_collection_file(col.name())?;
                }
                tracing::info!(name = col.name(), id = id.as_u64(), "collection dropped");
            }
        }
        Ok(())
    }

    /// Free-form diagnostic and maintenance channel.
    ///
    /// Recognized requests: `clear`, `reset`, `compact`, `info`, `usage`.
    /// Anything else fails with `NotImplemented`.
    pub fn control(&self, request: &str) -> DbResult<String> {
        let mut state = self.state.write();
        match request {
            "clear" => {
                state.main.clear_all();
                let ids: Vec<CollectionId> = state.named.values().copied().collect();
                for id in ids {
                    state.collection_mut(id)?.clear_all();
                }
                Ok("{}".to_string())
            }
            "reset" => {
                state.main.clear_all();
                let dropped: Vec<String> = state.named.keys().cloned().collect();
                state.named.clear();
                state.collections.clear();
                if let Some(dir) = &self.dir {
                    for name in &dropped {
                        dir.remove_collection_file(name)?;
                    }
                }
                Ok("{}".to_string())
            }
            "compact" => {
                let pinned = state.pinned();
                state.main.compact(&pinned);
                for col in state.collections.values_mut() {
                    col.compact(&pinned);
                }
                Ok("{}".to_string())
            }
            "info" => Ok(serde_json::json!({
                "engine": "weftdb",
                "version": env!("CARGO_PKG_VERSION"),
                "collections": state.named.len(),
                "snapshots": state.snapshots.len(),
                "youngest_generation": self.youngest_generation().as_u64(),
                "persistent": self.dir.is_some(),
            })
            .to_string()),
            "usage" => {
                fn describe(id: CollectionId, col: &Collection) -> serde_json::Value {
                    serde_json::json!({
                        "id": id.as_u64(),
                        "name": col.name(),
                        "entries": col.entry_count(),
                        "live": col.live_count(),
                        "bytes": col.live_bytes(),
                    })
                }
                let mut per_collection = vec![describe(CollectionId::MAIN, &state.main)];
                for &id in state.named.values() {
                    if let Some(col) = state.collections.get(&id) {
                        per_collection.push(describe(id, col));
                    }
                }
                Ok(serde_json::Value::Array(per_collection).to_string())
            }
            other => Err(DbError::not_implemented(format!(
                "control request \"{other}\""
            ))),
        }
    }

    /// Persists all collections (when a directory is configured) and releases
    /// the database. Dropping without `close` skips the final persist.
    pub fn close(self) -> DbResult<()> {
        let state = self.state.read();
        self.persist_all(&state)?;
        drop(state);
        tracing::debug!("database closed");
        Ok(())
    }
}
