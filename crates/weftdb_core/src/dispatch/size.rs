//! Range size estimates.

use crate::arena::{Arena, TypedRange};
use crate::database::Database;
use crate::error::DbResult;
use crate::options::Options;
use crate::strided::Strided;
use crate::types::{CollectionId, Key};

use super::{base_of, View};

/// Fixed bookkeeping bytes charged per entry in space estimates: the key plus
/// the length field, mirroring the persisted layout.
pub const PER_ENTRY_OVERHEAD: u64 =
    (std::mem::size_of::<Key>() + std::mem::size_of::<u32>()) as u64;

/// A batch of estimate tasks, one per `(collection, [start, end))` range.
#[derive(Debug, Clone, Copy)]
pub struct SizeTasks<'a> {
    /// Number of tasks.
    pub count: usize,
    /// Target collection per task.
    pub collections: Strided<'a, CollectionId>,
    /// Inclusive range starts.
    pub start_keys: Strided<'a, Key>,
    /// Exclusive range ends.
    pub end_keys: Strided<'a, Key>,
}

impl<'a> SizeTasks<'a> {
    /// One task over one collection.
    #[must_use]
    pub fn single(col: CollectionId, start: Key, end: Key) -> SizeTasks<'static> {
        SizeTasks {
            count: 1,
            collections: Strided::repeated(col),
            start_keys: Strided::repeated(start),
            end_keys: Strided::repeated(end),
        }
    }

    fn validate(&self) -> DbResult<()> {
        self.collections.check_count(self.count, "collections")?;
        self.start_keys.check_count(self.count, "start keys")?;
        self.end_keys.check_count(self.count, "end keys")?;
        Ok(())
    }
}

/// Six unsigned counters per task.
///
/// "Min" figures count only base-visible live entries; "max" figures add the
/// transaction's pending upserts and the full tombstone tail.
#[derive(Debug, Clone, Copy)]
pub struct SizeOutput {
    /// Number of tasks.
    pub count: usize,
    /// Lower cardinality bound per task.
    pub min_cardinalities: TypedRange<u64>,
    /// Upper cardinality bound per task.
    pub max_cardinalities: TypedRange<u64>,
    /// Lower live-value byte total per task.
    pub min_value_bytes: TypedRange<u64>,
    /// Upper live-value byte total per task.
    pub max_value_bytes: TypedRange<u64>,
    /// Lower space-usage estimate per task.
    pub min_space_usages: TypedRange<u64>,
    /// Upper space-usage estimate per task.
    pub max_space_usages: TypedRange<u64>,
}

impl Database {
    /// Batched size estimation over key ranges.
    pub fn size(
        &self,
        mut view: View<'_, '_>,
        tasks: &SizeTasks<'_>,
        options: Options,
        arena: &mut Arena,
    ) -> DbResult<SizeOutput> {
        arena.prepare(options);
        view.ensure_usable()?;
        tasks.validate()?;
        let n = tasks.count;

        let min_cardinalities = arena.alloc::<u64>(n)?;
        let max_cardinalities = arena.alloc::<u64>(n)?;
        let min_value_bytes = arena.alloc::<u64>(n)?;
        let max_value_bytes = arena.alloc::<u64>(n)?;
        let min_space_usages = arena.alloc::<u64>(n)?;
        let max_space_usages = arena.alloc::<u64>(n)?;

        let state = self.state.read();
        let base = base_of(&state, &view)?;
        let txn = view.txn_ref();

        for i in 0..n {
            let col_id = tasks.collections.get(i);
            let target = state.collection(col_id)?;
            let start = tasks.start_keys.get(i);
            let end = tasks.end_keys.get(i);

            let mut live_count = 0_u64;
            let mut live_bytes = 0_u64;
            let mut dead_count = 0_u64;
            for (_, record) in target.range(start, end) {
                match base.live(record) {
                    Some(payload) => {
                        live_count += 1;
                        live_bytes += payload.len() as u64;
                    }
                    None => dead_count += 1,
                }
            }

            let mut pending_count = 0_u64;
            let mut pending_bytes = 0_u64;
            if let Some(txn) = txn {
                if start < end {
                    for ((_, _), payload) in txn.upserts.range((col_id, start)..(col_id, end)) {
                        pending_count += 1;
                        pending_bytes += payload.len() as u64;
                    }
                }
                dead_count += txn.removes.len() as u64;
            }

            let min_card = live_count;
            let max_card = live_count + pending_count;
            let min_bytes = live_bytes;
            let max_bytes = live_bytes + pending_bytes;
            arena.set(min_cardinalities, i, min_card);
            arena.set(max_cardinalities, i, max_card);
            arena.set(min_value_bytes, i, min_bytes);
            arena.set(max_value_bytes, i, max_bytes);
            arena.set(
                min_space_usages,
                i,
                min_card * PER_ENTRY_OVERHEAD + min_bytes,
            );
            arena.set(
                max_space_usages,
                i,
                (max_card + dead_count) * PER_ENTRY_OVERHEAD + max_bytes,
            );
        }

        Ok(SizeOutput {
            count: n,
            min_cardinalities,
            max_cardinalities,
            min_value_bytes,
            max_value_bytes,
            min_space_usages,
            max_space_usages,
        })
    }
}
