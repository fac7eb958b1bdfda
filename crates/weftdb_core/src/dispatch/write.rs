//! Batched upserts and deletions.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::options::Options;
use crate::strided::Strided;
use crate::types::LENGTH_MISSING;

use super::{Places, View};

/// Where the payload bytes of a batch live.
#[derive(Debug, Clone, Copy)]
pub enum ValuesArg<'a> {
    /// One buffer per entry; `None` is a deletion (the null content pointer).
    Separate(&'a [Option<&'a [u8]>]),
    /// One shared buffer; entries slice into it via offsets and lengths.
    Joined(&'a [u8]),
}

/// The content side of a write batch.
///
/// Per-entry content resolves in this order:
///
/// 1. a `None` entry in [`ValuesArg::Separate`] is a deletion;
/// 2. a cleared presence bit is a deletion;
/// 3. with lengths given, entry `i` is `lengths[i]` bytes at its buffer plus
///    the optional `offsets[i]` (a [`LENGTH_MISSING`] length is a deletion);
/// 4. with offsets only, adjacent offsets slice the buffer Arrow-style
///    (N+1 entries);
/// 5. otherwise the content is NUL-terminated and measured by byte scan.
#[derive(Debug, Clone, Copy)]
pub struct ContentsArg<'a> {
    /// Payload buffers.
    pub values: ValuesArg<'a>,
    /// Optional per-entry start offsets into the buffer.
    pub offsets: Option<Strided<'a, u32>>,
    /// Optional per-entry byte lengths.
    pub lengths: Option<Strided<'a, u32>>,
    /// Optional packed presence bitmap; a cleared bit deletes the entry.
    pub presences: Option<&'a [u8]>,
}

impl<'a> ContentsArg<'a> {
    /// Contents for a batch of per-entry buffers.
    #[must_use]
    pub fn separate(values: &'a [Option<&'a [u8]>]) -> Self {
        Self {
            values: ValuesArg::Separate(values),
            offsets: None,
            lengths: None,
            presences: None,
        }
    }

    /// Contents for one shared buffer with Arrow offsets (N+1 entries).
    #[must_use]
    pub fn joined(buffer: &'a [u8], offsets: Strided<'a, u32>) -> Self {
        Self {
            values: ValuesArg::Joined(buffer),
            offsets: Some(offsets),
            lengths: None,
            presences: None,
        }
    }

    fn validate(&self, count: usize) -> DbResult<()> {
        if let ValuesArg::Separate(values) = self.values {
            if values.len() < count {
                return Err(DbError::invalid_argument(format!(
                    "contents hold {} buffers, {count} requested",
                    values.len()
                )));
            }
        }
        if let Some(presences) = self.presences {
            if presences.len() * 8 < count {
                return Err(DbError::invalid_argument(
                    "presence bitmap shorter than the batch",
                ));
            }
        }
        if let Some(lengths) = &self.lengths {
            lengths.check_count(count, "lengths")?;
        }
        if let Some(offsets) = &self.offsets {
            let needed = if self.lengths.is_some() { count } else { count + 1 };
            offsets.check_count(needed, "offsets")?;
        }
        Ok(())
    }

    /// Resolves entry `index` to payload bytes, or `None` for a deletion.
    pub fn get(&self, index: usize) -> DbResult<Option<&'a [u8]>> {
        let buffer: &'a [u8] = match self.values {
            ValuesArg::Separate(values) => match values[index] {
                Some(buffer) => buffer,
                None => return Ok(None),
            },
            ValuesArg::Joined(buffer) => buffer,
        };

        if let Some(presences) = self.presences {
            if presences[index / 8] & (1 << (index % 8)) == 0 {
                return Ok(None);
            }
        }

        let slice = |start: usize, end: usize| -> DbResult<&'a [u8]> {
            buffer.get(start..end).ok_or_else(|| {
                DbError::invalid_argument(format!(
                    "content range {start}..{end} escapes a {}-byte buffer",
                    buffer.len()
                ))
            })
        };

        if let Some(lengths) = &self.lengths {
            let len = lengths.get(index);
            if len == LENGTH_MISSING {
                return Ok(None);
            }
            let start = self.offsets.as_ref().map_or(0, |offs| offs.get(index)) as usize;
            return slice(start, start + len as usize).map(Some);
        }

        if let Some(offsets) = &self.offsets {
            let start = offsets.get(index) as usize;
            let end = offsets.get(index + 1) as usize;
            if end < start {
                return Err(DbError::invalid_argument(
                    "offsets array is not monotonically non-decreasing",
                ));
            }
            return slice(start, end).map(Some);
        }

        // NUL-terminated fallback; an unterminated buffer ends the content.
        let terminated = match buffer.iter().position(|&b| b == 0) {
            Some(at) => &buffer[..at],
            None => buffer,
        };
        Ok(Some(terminated))
    }
}

impl Database {
    /// Batched upsert/delete.
    ///
    /// Head writes run under the exclusive lock and stamp every entry of the
    /// batch with one fresh generation; entries apply in index order, so two
    /// writes to one key leave the later value. Transactional writes run
    /// under the shared lock and only touch the transaction's overlay.
    /// Writing through a snapshot is rejected.
    pub fn write(
        &self,
        mut view: View<'_, '_>,
        places: &Places<'_>,
        contents: &ContentsArg<'_>,
        options: Options,
    ) -> DbResult<()> {
        view.ensure_usable()?;
        places.validate()?;
        contents.validate(places.count)?;

        match &mut view {
            View::Snapshot(_) => Err(DbError::invalid_argument(
                "snapshots are read-only views",
            )),
            View::Transaction(txn) => {
                // The shared lock guards the overlay against concurrent
                // collection drops, not against other overlay writers.
                let state = self.state.read();
                for i in 0..places.count {
                    let (col, key) = places.get(i);
                    state.collection(col)?;
                    match contents.get(i)? {
                        Some(bytes) => txn.stage_upsert(col, key, bytes.to_vec()),
                        None => txn.stage_remove(col, key),
                    }
                }
                Ok(())
            }
            View::Head => {
                let mut state = self.state.write();
                let generation = self.bump_generation();
                let pinned = state.pinned();
                for i in 0..places.count {
                    let (col, key) = places.get(i);
                    let target = state.collection_mut(col)?;
                    match contents.get(i)? {
                        Some(bytes) => target.upsert(key, bytes.to_vec(), generation, &pinned),
                        None => target.tombstone(key, generation, &pinned),
                    }
                }
                if options.contains(Options::WRITE_FLUSH) {
                    self.persist_all(&state)?;
                }
                Ok(())
            }
        }
    }
}
