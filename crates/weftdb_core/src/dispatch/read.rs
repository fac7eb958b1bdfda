//! Batched point lookups.

use crate::arena::{Arena, BitRange, ByteRange, TypedRange};
use crate::database::{Database, DbState};
use crate::error::{DbError, DbResult};
use crate::options::Options;
use crate::transaction::Transaction;
use crate::types::{CollectionId, Generation, Key, LENGTH_MISSING};

use super::{base_of, lookup, Places, View};

/// Which outputs a read should produce.
#[derive(Debug, Clone, Copy)]
pub struct ReadSelection {
    /// Produce the presence bitmap.
    pub presences: bool,
    /// Produce the Arrow offsets array (N+1 entries).
    pub offsets: bool,
    /// Produce the per-entry length array.
    pub lengths: bool,
    /// Produce the concatenated value tape.
    pub values: bool,
}

impl ReadSelection {
    /// Every output.
    pub const ALL: Self = Self {
        presences: true,
        offsets: true,
        lengths: true,
        values: true,
    };

    /// Presence and length only; skips copying payload bytes.
    pub const METADATA: Self = Self {
        presences: true,
        offsets: false,
        lengths: true,
        values: false,
    };
}

impl Default for ReadSelection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Outputs of one batched read, resolved against the caller's arena.
#[derive(Debug, Clone, Copy)]
pub struct ReadOutput {
    /// Number of batch entries.
    pub count: usize,
    /// Presence bitmap; bit `i` set iff entry `i` exists.
    pub presences: Option<BitRange>,
    /// Arrow offsets into the value tape (N+1 entries). Produced whenever
    /// offsets or values were selected.
    pub offsets: Option<TypedRange<u32>>,
    /// Per-entry byte lengths; [`LENGTH_MISSING`] marks a missing key.
    pub lengths: Option<TypedRange<u32>>,
    /// The concatenated value tape.
    pub values: Option<ByteRange>,
}

impl ReadOutput {
    /// Convenience accessor for entry `index`'s payload, `None` when the key
    /// is missing. Requires lengths, offsets, and values to have been
    /// selected.
    #[must_use]
    pub fn value<'a>(&self, arena: &'a Arena, index: usize) -> Option<&'a [u8]> {
        let lengths = self.lengths?;
        let len = arena.get(lengths, index);
        if len == LENGTH_MISSING {
            return None;
        }
        let offset = arena.get(self.offsets?, index) as usize;
        Some(&arena.bytes(self.values?)[offset..offset + len as usize])
    }

    /// Whether entry `index` exists. Requires the presence bitmap.
    #[must_use]
    pub fn present(&self, arena: &Arena, index: usize) -> bool {
        self.presences.is_some_and(|bits| arena.bit(bits, index))
    }
}

impl Database {
    /// Batched point lookup through `view`.
    ///
    /// Under a transaction, overlay upserts win, overlay removals read as
    /// missing, and everything else falls through to the base state; unless
    /// [`Options::DONT_WATCH`] is set, observed generations are tracked for
    /// commit-time validation. A record rewritten since the transaction began
    /// fails with `Conflict` and poisons the transaction.
    pub fn read(
        &self,
        mut view: View<'_, '_>,
        places: &Places<'_>,
        selection: ReadSelection,
        options: Options,
        arena: &mut Arena,
    ) -> DbResult<ReadOutput> {
        arena.prepare(options);
        view.ensure_usable()?;
        places.validate()?;
        let n = places.count;

        let lengths = selection
            .lengths
            .then(|| arena.alloc::<u32>(n))
            .transpose()?;
        let presences = selection
            .presences
            .then(|| arena.alloc_bitmap(n))
            .transpose()?;
        let offsets = (selection.offsets || selection.values)
            .then(|| arena.alloc::<u32>(n + 1))
            .transpose()?;

        let state = self.state.read();
        let base = base_of(&state, &view)?;

        // Conflict detection and read tracking run once, before any output
        // is produced.
        if let Some(txn) = view.txn_mut() {
            let youngest = self.youngest_generation();
            let track = !options.contains(Options::DONT_WATCH);
            for i in 0..n {
                let (col, key) = places.get(i);
                observe(&state, txn, youngest, track, col, key)?;
            }
        }
        let txn = view.txn_ref();

        // Metadata pass: lengths, presences, offsets, and the tape size.
        let mut total = 0_usize;
        for i in 0..n {
            let value = lookup(&state, txn, base, places.get(i).0, places.get(i).1)?;
            if let Some(offsets) = offsets {
                arena.set(offsets, i, total as u32);
            }
            match value {
                Some(bytes) => {
                    if let Some(lengths) = lengths {
                        arena.set(lengths, i, bytes.len() as u32);
                    }
                    if let Some(presences) = presences {
                        arena.set_bit(presences, i, true);
                    }
                    total += bytes.len();
                }
                None => {
                    if let Some(lengths) = lengths {
                        arena.set(lengths, i, LENGTH_MISSING);
                    }
                }
            }
        }
        if let Some(offsets) = offsets {
            arena.set(offsets, n, total as u32);
        }

        // Data pass: copy payloads onto one contiguous tape.
        let values = if selection.values {
            let tape = arena.alloc_bytes(total)?;
            let mut progress = 0_usize;
            for i in 0..n {
                let value = lookup(&state, txn, base, places.get(i).0, places.get(i).1)?;
                if let Some(bytes) = value {
                    arena.bytes_mut(tape)[progress..progress + bytes.len()]
                        .copy_from_slice(bytes);
                    progress += bytes.len();
                }
            }
            Some(tape)
        } else {
            None
        };

        Ok(ReadOutput {
            count: n,
            presences,
            offsets,
            lengths,
            values,
        })
    }
}

/// Conflict-checks one transactional read and tracks the observed generation.
fn observe(
    state: &DbState,
    txn: &mut Transaction<'_>,
    youngest: Generation,
    track: bool,
    col: CollectionId,
    key: Key,
) -> DbResult<()> {
    if txn.overlay(col, key).is_some() {
        return Ok(());
    }
    let target = state.collection(col)?;
    match target.find(key) {
        Some(record) => {
            let snapshot = txn.snapshot_generation();
            if snapshot.is_none() {
                let current = record.head().generation();
                if current > txn.generation() && current <= youngest {
                    let error = DbError::conflict(format!(
                        "key {key} in {col} was overwritten since the transaction started"
                    ));
                    txn.poison(&error);
                    return Err(error);
                }
            }
            if track {
                let observed = match snapshot {
                    // Through a snapshot, a missing version observes the
                    // pinned generation so later inserts still conflict.
                    Some(pinned) => record
                        .visible_at(pinned)
                        .map_or(pinned, |v| v.generation()),
                    None => record.head().generation(),
                };
                txn.record_read(col, key, observed);
            }
        }
        None => {
            if track {
                let observed = txn.snapshot_generation().unwrap_or(Generation::ZERO);
                txn.record_read(col, key, observed);
            }
        }
    }
    Ok(())
}
