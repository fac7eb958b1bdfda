//! Optimistic MVCC transactions.
//!
//! A transaction layers a private overlay (pending upserts and removals) over
//! the head state and tracks the generations it observed while reading. At
//! commit time, under the exclusive database lock, every tracked observation
//! and pending write is validated against the current head: a record
//! rewritten by a concurrent committed transaction fails the commit with
//! `Conflict`, and the transaction is poisoned until reset.
//!
//! Staging runs the same validation without applying, so a caller can check
//! preconditions ahead of a coordinated multi-transaction commit.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::options::Options;
use crate::types::{CollectionId, Generation, Key, SnapshotId};

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting reads and writes.
    Open,
    /// Validated but not applied; only commit, reset, or abort may follow.
    Staged,
    /// Applied to the head state.
    Committed,
    /// Abandoned by the caller.
    Aborted,
    /// Validation failed. The overlay is retained so the caller may inspect
    /// or retry after a reset; every other operation repeats the failure.
    Poisoned,
}

#[derive(Debug, Clone)]
struct Poison {
    repeated: bool,
    message: String,
}

/// An optimistic transaction attached to its parent database.
///
/// Not thread-safe; a transaction is driven by one thread at a time.
#[derive(Debug)]
pub struct Transaction<'db> {
    db: &'db Database,
    generation: Generation,
    snapshot: Option<(SnapshotId, Generation)>,
    state: TransactionState,
    pub(crate) upserts: BTreeMap<(CollectionId, Key), Vec<u8>>,
    pub(crate) removes: BTreeSet<(CollectionId, Key)>,
    pub(crate) reads: HashMap<(CollectionId, Key), Generation>,
    poison: Option<Poison>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(
        db: &'db Database,
        generation: Generation,
        snapshot: Option<(SnapshotId, Generation)>,
    ) -> Self {
        Self {
            db,
            generation,
            snapshot,
            state: TransactionState::Open,
            upserts: BTreeMap::new(),
            removes: BTreeSet::new(),
            reads: HashMap::new(),
            poison: None,
        }
    }

    /// The transaction's generation stamp.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The backing snapshot, if this transaction reads through one.
    #[must_use]
    pub fn snapshot(&self) -> Option<SnapshotId> {
        self.snapshot.map(|(id, _)| id)
    }

    pub(crate) fn snapshot_generation(&self) -> Option<Generation> {
        self.snapshot.map(|(_, gen)| gen)
    }

    /// Number of pending upserts and removals.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.upserts.len() + self.removes.len()
    }

    /// Ensures the transaction accepts reads and writes.
    pub(crate) fn ensure_open(&self) -> DbResult<()> {
        match self.state {
            TransactionState::Open => Ok(()),
            TransactionState::Poisoned => Err(self.poison_error()),
            TransactionState::Staged => Err(DbError::invalid_argument(
                "transaction is staged; commit, reset, or abort it",
            )),
            TransactionState::Committed => {
                Err(DbError::invalid_argument("transaction already committed"))
            }
            TransactionState::Aborted => {
                Err(DbError::invalid_argument("transaction already aborted"))
            }
        }
    }

    fn poison_error(&self) -> DbError {
        match &self.poison {
            Some(p) if p.repeated => DbError::repeated(p.message.clone()),
            Some(p) => DbError::conflict(p.message.clone()),
            None => DbError::conflict("transaction is poisoned"),
        }
    }

    pub(crate) fn poison(&mut self, error: &DbError) {
        self.state = TransactionState::Poisoned;
        self.poison = Some(Poison {
            repeated: matches!(error, DbError::Repeated { .. }),
            message: match error {
                DbError::Conflict { message } | DbError::Repeated { message } => message.clone(),
                other => other.to_string(),
            },
        });
    }

    /// Records an observed generation for `(collection, key)`. The first
    /// observation wins; later reads of the same key don't overwrite it.
    pub(crate) fn record_read(&mut self, col: CollectionId, key: Key, observed: Generation) {
        let place = (col, key);
        if self.upserts.contains_key(&place) || self.removes.contains(&place) {
            return;
        }
        self.reads.entry(place).or_insert(observed);
    }

    /// The overlay's verdict for a key: `Some(Some(_))` pending upsert,
    /// `Some(None)` pending removal, `None` no overlay entry.
    pub(crate) fn overlay(&self, col: CollectionId, key: Key) -> Option<Option<&[u8]>> {
        let place = (col, key);
        if let Some(bytes) = self.upserts.get(&place) {
            return Some(Some(bytes.as_slice()));
        }
        if self.removes.contains(&place) {
            return Some(None);
        }
        None
    }

    pub(crate) fn stage_upsert(&mut self, col: CollectionId, key: Key, payload: Vec<u8>) {
        let place = (col, key);
        self.removes.remove(&place);
        self.upserts.insert(place, payload);
    }

    pub(crate) fn stage_remove(&mut self, col: CollectionId, key: Key) {
        let place = (col, key);
        self.upserts.remove(&place);
        self.removes.insert(place);
    }

    /// Validates the transaction against the current head without applying
    /// it. On success the transaction moves to [`TransactionState::Staged`].
    pub fn stage(&mut self) -> DbResult<()> {
        self.ensure_open()?;
        let state = self.db.state_for_commit();
        let youngest = self.db.youngest_generation();
        if let Err(error) = self.validate(&state, youngest) {
            self.poison(&error);
            return Err(error);
        }
        self.state = TransactionState::Staged;
        Ok(())
    }

    /// Validates and applies the transaction under the exclusive lock.
    ///
    /// All pending upserts and removals commit at one fresh generation.
    /// `Options::WRITE_FLUSH` persists affected collections before returning.
    pub fn commit(&mut self, options: Options) -> DbResult<()> {
        match self.state {
            TransactionState::Open | TransactionState::Staged => {}
            _ => return self.ensure_open(),
        }

        let mut state = self.db.state_for_commit();
        let youngest = self.db.youngest_generation();
        if let Err(error) = self.validate(&state, youngest) {
            self.poison(&error);
            return Err(error);
        }

        let commit_generation = self.db.bump_generation();
        let pinned = state.pinned();
        for ((col, key), payload) in std::mem::take(&mut self.upserts) {
            // A collection dropped mid-flight discards its pending writes.
            if let Ok(target) = state.collection_mut(col) {
                target.upsert(key, payload, commit_generation, &pinned);
            }
        }
        for (col, key) in std::mem::take(&mut self.removes) {
            if let Ok(target) = state.collection_mut(col) {
                target.tombstone(key, commit_generation, &pinned);
            }
        }
        self.reads.clear();
        self.state = TransactionState::Committed;
        tracing::debug!(generation = commit_generation.as_u64(), "transaction committed");

        if options.contains(Options::WRITE_FLUSH) {
            self.db.persist_all(&state)?;
        }
        Ok(())
    }

    fn validate(&self, state: &crate::database::DbState, youngest: Generation) -> DbResult<()> {
        // Tracked reads: reject records rewritten by a concurrent commit
        // inside the (transaction generation, youngest] window.
        for (&(col, key), &observed) in &self.reads {
            let Ok(target) = state.collection(col) else {
                continue;
            };
            let Some(record) = target.find(key) else {
                continue;
            };
            let current = record.head().generation();
            if current != observed && current > self.generation && current <= youngest {
                return Err(DbError::conflict(format!(
                    "key {key} in {col} was overwritten since the transaction started"
                )));
            }
        }

        for place in self
            .upserts
            .keys()
            .chain(self.removes.iter())
        {
            let (col, key) = *place;
            let Ok(target) = state.collection(col) else {
                continue;
            };
            let Some(record) = target.find(key) else {
                continue;
            };
            let current = record.head().generation();
            if current == self.generation {
                return Err(DbError::repeated(format!(
                    "key {key} in {col} was already committed at this generation"
                )));
            }
            if current > self.generation && current <= youngest {
                return Err(DbError::conflict(format!(
                    "key {key} in {col} collides with a newer committed entry"
                )));
            }
        }
        Ok(())
    }

    /// Abandons the transaction. Pending changes are dropped.
    pub fn abort(&mut self) {
        self.upserts.clear();
        self.removes.clear();
        self.reads.clear();
        self.poison = None;
        self.state = TransactionState::Aborted;
    }

    /// Returns the transaction to [`TransactionState::Open`] with a fresh
    /// generation, clearing the overlay and any poison.
    pub fn reset(&mut self) {
        self.reset_at(self.db.bump_generation());
    }

    /// Like [`Transaction::reset`] with a caller-supplied generation.
    pub fn reset_at(&mut self, generation: Generation) {
        self.upserts.clear();
        self.removes.clear();
        self.reads.clear();
        self.poison = None;
        self.generation = generation;
        self.state = TransactionState::Open;
    }
}

impl Database {
    /// Starts a transaction at a fresh generation.
    #[must_use]
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self, self.bump_generation(), None)
    }

    /// Starts a transaction at a caller-supplied generation, for callers that
    /// coordinate generations across databases.
    #[must_use]
    pub fn transaction_at(&self, generation: Generation) -> Transaction<'_> {
        Transaction::new(self, generation, None)
    }

    /// Starts a transaction whose reads are filtered through a snapshot.
    pub fn transaction_with_snapshot(&self, id: SnapshotId) -> DbResult<Transaction<'_>> {
        let pinned = self.snapshot_generation(id)?;
        Ok(Transaction::new(
            self,
            self.bump_generation(),
            Some((id, pinned)),
        ))
    }
}
