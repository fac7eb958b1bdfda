//! Database directory management.
//!
//! A persistent database occupies one directory:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK            # Advisory lock, one process at a time
//! ├─ .weft           # Main collection (reserved empty stem)
//! └─ <name>.weft     # One file per named collection
//! ```
//!
//! The LOCK file ensures a single process owns the directory; a second open
//! fails with `InUse`. Collection files are rewritten wholesale on close or
//! flush, so there is nothing else to coordinate.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{DbError, DbResult};

/// File name of the advisory lock.
const LOCK_FILE: &str = "LOCK";

/// Suffix shared by all collection files. The main collection persists as the
/// bare suffix (empty stem), which no named collection can collide with.
pub const COLLECTION_SUFFIX: &str = ".weft";

/// Handle to an exclusively locked database directory.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens or creates a database directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Fails with `InUse` when another process holds the lock, `NotFound`
    /// when the directory is missing and `create_if_missing` is false, and
    /// `Io` for anything the file system refuses.
    pub fn open(path: &Path, create_if_missing: bool) -> DbResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(DbError::not_found(format!(
                    "database directory {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(DbError::invalid_argument(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(DbError::InUse);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file path backing the named (or, for `""`, the main) collection.
    #[must_use]
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}{COLLECTION_SUFFIX}"))
    }

    /// Enumerates collection files as `(name, path)` pairs. The main
    /// collection appears with an empty name.
    pub fn list_collection_files(&self) -> DbResult<Vec<(String, PathBuf)>> {
        list_collection_files_in(&self.path)
    }

    /// Removes the file backing a dropped collection, if present.
    pub fn remove_collection_file(&self, name: &str) -> DbResult<()> {
        let path = self.collection_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Enumerates `*.weft` files in an arbitrary directory.
pub(crate) fn list_collection_files_in(path: &Path) -> DbResult<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(COLLECTION_SUFFIX) else {
            continue;
        };
        found.push((stem.to_string(), entry.path()));
    }
    found.sort();
    Ok(found)
}
