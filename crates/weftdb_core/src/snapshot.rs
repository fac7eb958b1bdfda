//! Snapshots: immutable pinned-generation views.
//!
//! A snapshot freezes the set of records visible to reads, scans, and size
//! estimates routed through it. Creation captures the current youngest
//! generation; records created later are invisible no matter how often the
//! head moves on. Snapshots never block head writes: superseded versions are
//! retained per record while a snapshot can still see them (see
//! [`crate::value`]).
//!
//! Snapshots are enumerated and released by id, and a whole snapshot can be
//! exported as a fresh database directory through the persistence codec.

use std::fs;
use std::path::Path;

use crate::codec;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::types::{Generation, SnapshotId};

impl Database {
    /// Registers a snapshot of the current state and returns its id.
    pub fn snapshot_create(&self) -> DbResult<SnapshotId> {
        use std::sync::atomic::Ordering;
        let mut state = self.state.write();
        let id = SnapshotId::new(self.next_snapshot_id.fetch_add(1, Ordering::SeqCst));
        let pinned = self.youngest_generation();
        state.snapshots.insert(id, pinned);
        tracing::debug!(id = id.as_u64(), generation = pinned.as_u64(), "snapshot created");
        Ok(id)
    }

    /// Lists live snapshot ids in creation order.
    #[must_use]
    pub fn snapshot_list(&self) -> Vec<SnapshotId> {
        self.state.read().snapshots.keys().copied().collect()
    }

    /// The generation a snapshot pins.
    pub fn snapshot_generation(&self, id: SnapshotId) -> DbResult<Generation> {
        self.state
            .read()
            .snapshots
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::not_found(format!("{id}")))
    }

    /// Releases a snapshot. Its pinned record versions become reclaimable on
    /// later writes to the same keys.
    pub fn snapshot_drop(&self, id: SnapshotId) -> DbResult<()> {
        let mut state = self.state.write();
        if state.snapshots.remove(&id).is_none() {
            return Err(DbError::not_found(format!("{id}")));
        }
        tracing::debug!(id = id.as_u64(), "snapshot dropped");
        Ok(())
    }

    /// Writes every record visible to the snapshot into `target` as a new
    /// database directory.
    ///
    /// The target must be an empty directory or not exist yet. On failure,
    /// files already written stay behind; there is no rollback.
    pub fn snapshot_export(&self, id: SnapshotId, target: &Path) -> DbResult<()> {
        let state = self.state.read();
        let pinned = state
            .snapshots
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::not_found(format!("{id}")))?;

        if target.exists() {
            if !target.is_dir() {
                return Err(DbError::invalid_argument(format!(
                    "{} is not a directory",
                    target.display()
                )));
            }
            if fs::read_dir(target)?.next().is_some() {
                return Err(DbError::invalid_argument(format!(
                    "export target {} is not empty",
                    target.display()
                )));
            }
        } else {
            fs::create_dir_all(target)?;
        }

        let suffix = crate::dir::COLLECTION_SUFFIX;
        codec::write_collection(&state.main, Some(pinned), &target.join(suffix))?;
        for (name, col_id) in &state.named {
            if let Some(col) = state.collections.get(col_id) {
                codec::write_collection(col, Some(pinned), &target.join(format!("{name}{suffix}")))?;
            }
        }
        tracing::info!(id = id.as_u64(), target = %target.display(), "snapshot exported");
        Ok(())
    }
}
