//! Bounded ordered key scans.

use crate::arena::{Arena, TypedRange};
use crate::database::Database;
use crate::error::DbResult;
use crate::options::Options;
use crate::strided::Strided;
use crate::types::{CollectionId, Key};

use super::{base_of, View};

/// A batch of scan tasks: per task a collection, a half-open key range
/// `[start, end)`, and a cap on emitted keys.
#[derive(Debug, Clone, Copy)]
pub struct ScanTasks<'a> {
    /// Number of tasks.
    pub count: usize,
    /// Target collection per task; stride 0 scans one collection repeatedly.
    pub collections: Strided<'a, CollectionId>,
    /// Inclusive range starts.
    pub start_keys: Strided<'a, Key>,
    /// Exclusive range ends.
    pub end_keys: Strided<'a, Key>,
    /// Per-task emission caps.
    pub limits: Strided<'a, u32>,
}

impl<'a> ScanTasks<'a> {
    /// One task over one collection.
    #[must_use]
    pub fn single(col: CollectionId, start: Key, end: Key, limit: u32) -> ScanTasks<'static> {
        ScanTasks {
            count: 1,
            collections: Strided::repeated(col),
            start_keys: Strided::repeated(start),
            end_keys: Strided::repeated(end),
            limits: Strided::repeated(limit),
        }
    }

    fn validate(&self) -> DbResult<()> {
        self.collections.check_count(self.count, "collections")?;
        self.start_keys.check_count(self.count, "start keys")?;
        self.end_keys.check_count(self.count, "end keys")?;
        self.limits.check_count(self.count, "limits")?;
        Ok(())
    }
}

/// Outputs of one batched scan: per-task counts plus one flattened key array
/// with Arrow offsets.
#[derive(Debug, Clone, Copy)]
pub struct ScanOutput {
    /// Number of tasks.
    pub count: usize,
    /// Arrow offsets into `keys` (N+1 entries).
    pub offsets: TypedRange<u32>,
    /// Keys emitted per task.
    pub counts: TypedRange<u32>,
    /// The flattened, per-task-ordered key array.
    pub keys: TypedRange<i64>,
}

impl ScanOutput {
    /// Convenience accessor: the keys emitted for task `index`.
    #[must_use]
    pub fn task_keys(&self, arena: &Arena, index: usize) -> Vec<Key> {
        let start = arena.get(self.offsets, index) as usize;
        let count = arena.get(self.counts, index) as usize;
        (start..start + count)
            .map(|i| arena.get(self.keys, i))
            .collect()
    }
}

impl Database {
    /// Batched ordered scan through `view`.
    ///
    /// Keys come back strictly ascending within each task, all inside
    /// `[start, end)`, at most `limit` of them, tombstones skipped. Under a
    /// transaction the head stream merges with the overlay: overlay upserts
    /// win ties, overlay removals hide head keys. `Options::SCAN_BULK`
    /// permits (but does not require) relaxed ordering; this engine keeps
    /// the order either way.
    pub fn scan(
        &self,
        mut view: View<'_, '_>,
        tasks: &ScanTasks<'_>,
        options: Options,
        arena: &mut Arena,
    ) -> DbResult<ScanOutput> {
        arena.prepare(options);
        view.ensure_usable()?;
        tasks.validate()?;
        let n = tasks.count;

        let offsets = arena.alloc::<u32>(n + 1)?;
        let counts = arena.alloc::<u32>(n)?;

        let state = self.state.read();
        let base = base_of(&state, &view)?;
        let txn = view.txn_ref();

        // Cap each task's allocation by what the collection (plus overlay)
        // can actually produce, so a huge limit doesn't balloon the arena.
        let mut capacity = 0_usize;
        for i in 0..n {
            let target = state.collection(tasks.collections.get(i))?;
            let most = target.entry_count() + txn.map_or(0, |t| t.upserts.len());
            capacity += (tasks.limits.get(i) as usize).min(most);
        }
        let keys_out = arena.alloc::<i64>(capacity)?;

        let mut cursor = 0_usize;
        for i in 0..n {
            arena.set(offsets, i, cursor as u32);
            let col_id = tasks.collections.get(i);
            let target = state.collection(col_id)?;
            let start = tasks.start_keys.get(i);
            let end = tasks.end_keys.get(i);
            let limit = tasks.limits.get(i);
            if start >= end {
                arena.set(counts, i, 0);
                continue;
            }

            let mut emitted = 0_u32;
            let mut head = target
                .range(start, end)
                .filter(|(_, record)| base.version(record).is_some())
                .peekable();

            match txn {
                None => {
                    for (&key, record) in head {
                        if emitted == limit {
                            break;
                        }
                        if base.live(record).is_none() {
                            continue;
                        }
                        arena.set(keys_out, cursor, key);
                        cursor += 1;
                        emitted += 1;
                    }
                }
                Some(txn) => {
                    let mut overlay = txn
                        .upserts
                        .range((col_id, start)..(col_id, end))
                        .map(|(&(_, key), _)| key)
                        .peekable();
                    while emitted < limit {
                        // Skip head entries deleted in base or in the overlay.
                        if let Some((&key, record)) = head.peek() {
                            if base.live(record).is_none()
                                || txn.removes.contains(&(col_id, key))
                            {
                                head.next();
                                continue;
                            }
                        }
                        let key = match (head.peek(), overlay.peek()) {
                            (Some((&hk, _)), Some(&ok)) => {
                                if ok <= hk {
                                    if ok == hk {
                                        head.next();
                                    }
                                    overlay.next();
                                    ok
                                } else {
                                    head.next();
                                    hk
                                }
                            }
                            (Some((&hk, _)), None) => {
                                head.next();
                                hk
                            }
                            (None, Some(&ok)) => {
                                overlay.next();
                                ok
                            }
                            (None, None) => break,
                        };
                        arena.set(keys_out, cursor, key);
                        cursor += 1;
                        emitted += 1;
                    }
                }
            }
            arena.set(counts, i, emitted);
        }
        arena.set(offsets, n, cursor as u32);

        Ok(ScanOutput {
            count: n,
            offsets,
            counts,
            keys: keys_out,
        })
    }
}
