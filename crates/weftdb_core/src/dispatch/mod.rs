//! The batched operation dispatcher.
//!
//! Every batched call names its targets through strided argument packs and
//! routes either to the head state (under the shared lock) or to a
//! transaction's private view layered over head. Outputs land in the caller's
//! arena as value tapes, Arrow-convention offset tables (N+1 entries, last is
//! the total), length arrays, and presence bitmaps.

mod read;
mod scan;
mod size;
mod write;

pub use read::{ReadOutput, ReadSelection};
pub use scan::{ScanOutput, ScanTasks};
pub use size::{SizeOutput, SizeTasks, PER_ENTRY_OVERHEAD};
pub use write::{ContentsArg, ValuesArg};

use crate::database::DbState;
use crate::error::{DbError, DbResult};
use crate::strided::Strided;
use crate::transaction::Transaction;
use crate::types::{CollectionId, Generation, Key};
use crate::value::{ValueRecord, Version};

/// What a batched operation reads through.
#[derive(Debug)]
pub enum View<'t, 'db> {
    /// The latest committed state.
    Head,
    /// A registered pinned-generation snapshot.
    Snapshot(crate::types::SnapshotId),
    /// A transaction's overlay layered over head (or over the transaction's
    /// backing snapshot).
    Transaction(&'t mut Transaction<'db>),
}

impl<'t, 'db> View<'t, 'db> {
    pub(crate) fn txn_ref(&self) -> Option<&Transaction<'db>> {
        match self {
            View::Transaction(txn) => Some(txn),
            _ => None,
        }
    }

    pub(crate) fn txn_mut(&mut self) -> Option<&mut Transaction<'db>> {
        match self {
            View::Transaction(txn) => Some(txn),
            _ => None,
        }
    }

    /// Fails fast when the view is a transaction that no longer accepts
    /// operations (staged, finished, or poisoned).
    pub(crate) fn ensure_usable(&self) -> DbResult<()> {
        match self.txn_ref() {
            Some(txn) => txn.ensure_open(),
            None => Ok(()),
        }
    }
}

/// The committed state a view reads records through.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BaseView {
    /// The newest version of each record.
    Head,
    /// The newest version created at or before a pinned generation.
    Pinned(Generation),
}

impl BaseView {
    /// The version this view selects, tombstones included.
    pub(crate) fn version<'s>(&self, record: &'s ValueRecord) -> Option<&'s Version> {
        match self {
            Self::Head => Some(record.head()),
            Self::Pinned(gen) => record.visible_at(*gen),
        }
    }

    /// The payload this view selects, tombstones filtered out.
    pub(crate) fn live<'s>(&self, record: &'s ValueRecord) -> Option<&'s [u8]> {
        self.version(record)
            .and_then(|v| (!v.is_tombstone()).then(|| v.payload()))
    }
}

/// Resolves the committed-state side of a view.
pub(crate) fn base_of(state: &DbState, view: &View<'_, '_>) -> DbResult<BaseView> {
    match view {
        View::Head => Ok(BaseView::Head),
        View::Snapshot(id) => state
            .snapshots
            .get(id)
            .copied()
            .map(BaseView::Pinned)
            .ok_or_else(|| DbError::not_found(format!("{id}"))),
        View::Transaction(txn) => Ok(match txn.snapshot_generation() {
            Some(gen) => BaseView::Pinned(gen),
            None => BaseView::Head,
        }),
    }
}

/// Resolves one key through overlay, then base state. `Ok(None)` is a missing
/// (or deleted) key.
pub(crate) fn lookup<'s>(
    state: &'s DbState,
    txn: Option<&'s Transaction<'_>>,
    base: BaseView,
    col: CollectionId,
    key: Key,
) -> DbResult<Option<&'s [u8]>> {
    if let Some(txn) = txn {
        if let Some(verdict) = txn.overlay(col, key) {
            return Ok(verdict);
        }
    }
    let target = state.collection(col)?;
    Ok(target.find(key).and_then(|record| base.live(record)))
}

/// A batch of `(collection, key)` addresses.
#[derive(Debug, Clone, Copy)]
pub struct Places<'a> {
    /// Number of addressed entries.
    pub count: usize,
    /// Target collection per entry; stride 0 applies one collection to all.
    pub collections: Strided<'a, CollectionId>,
    /// Target key per entry. Keys must not repeat via stride 0.
    pub keys: Strided<'a, Key>,
}

impl<'a> Places<'a> {
    /// Addresses `keys` within a single collection.
    #[must_use]
    pub fn in_collection(col: CollectionId, keys: &'a [Key]) -> Self {
        Self {
            count: keys.len(),
            collections: Strided::repeated(col),
            keys: Strided::from_slice(keys),
        }
    }

    /// The `(collection, key)` pair at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> (CollectionId, Key) {
        (self.collections.get(index), self.keys.get(index))
    }

    pub(crate) fn validate(&self) -> DbResult<()> {
        if self.keys.is_repeated() {
            return Err(DbError::invalid_argument(
                "keys may not use stride 0; collections may",
            ));
        }
        self.keys.check_count(self.count, "keys")?;
        self.collections.check_count(self.count, "collections")?;
        Ok(())
    }
}
