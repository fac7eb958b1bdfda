//! Per-collection persistence codec.
//!
//! Each collection serializes to its own file:
//!
//! ```text
//! u32 live_count | N x ( i64 key, u32 len, len bytes of payload )
//! ```
//!
//! All integers little-endian. Tombstones are not persisted; they exist only
//! to serve conflict detection and reload as "absent". Writing rewrites the
//! whole file and is not atomic; callers must not rely on crash safety
//! across a close.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::collection::Collection;
use crate::error::{DbError, DbResult};
use crate::types::Generation;
use crate::value::{ValueRecord, Version};

/// Writes the entries of `col` visible at `at` (head state when `None`) to
/// `path`, replacing any previous file.
pub fn write_collection(col: &Collection, at: Option<Generation>, path: &Path) -> DbResult<()> {
    fn visible(record: &ValueRecord, at: Option<Generation>) -> Option<&Version> {
        let version = match at {
            Some(pinned) => record.visible_at(pinned)?,
            None => record.head(),
        };
        (!version.is_tombstone()).then_some(version)
    }

    let live: u32 = {
        let count = col.entries().filter_map(|(_, r)| visible(r, at)).count();
        u32::try_from(count)
            .map_err(|_| DbError::invalid_argument("collection exceeds the persistable size"))?
    };

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&live.to_le_bytes())?;
    for (key, record) in col.entries() {
        let Some(version) = visible(record, at) else {
            continue;
        };
        let len = u32::try_from(version.payload().len())
            .map_err(|_| DbError::invalid_argument(format!("payload for key {key} exceeds 4 GiB")))?;
        out.write_all(&key.to_le_bytes())?;
        out.write_all(&len.to_le_bytes())?;
        out.write_all(version.payload())?;
    }
    out.flush()?;
    Ok(())
}

/// Loads a collection from `path`. Reloaded entries carry the zero
/// generation: past observations of them can never conflict.
pub fn read_collection(name: &str, path: &Path) -> DbResult<Collection> {
    let mut input = BufReader::new(File::open(path)?);

    let live = read_u32(&mut input)?;
    let mut col = Collection::new(name);
    for _ in 0..live {
        let key = read_i64(&mut input)?;
        let len = read_u32(&mut input)? as usize;
        let mut payload = vec![0_u8; len];
        fill(&mut input, &mut payload)?;
        col.upsert(key, payload, Generation::ZERO, &[]);
    }
    Ok(col)
}

fn fill(input: &mut impl Read, buf: &mut [u8]) -> DbResult<()> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DbError::corruption("collection file shorter than its header promises")
        } else {
            DbError::Io(e)
        }
    })
}

fn read_u32(input: &mut impl Read) -> DbResult<u32> {
    let mut buf = [0_u8; 4];
    fill(input, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i64(input: &mut impl Read) -> DbResult<i64> {
    let mut buf = [0_u8; 8];
    fill(input, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gen(raw: u64) -> Generation {
        Generation::new(raw)
    }

    #[test]
    fn round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pairs.weft");

        let mut col = Collection::new("pairs");
        col.upsert(-9, b"minus".to_vec(), gen(1), &[]);
        col.upsert(4, b"".to_vec(), gen(2), &[]);
        col.upsert(12, b"twelve".to_vec(), gen(3), &[]);
        write_collection(&col, None, &path).unwrap();

        let loaded = read_collection("pairs", &path).unwrap();
        assert_eq!(loaded.live_count(), 3);
        assert_eq!(loaded.find(-9).unwrap().head().payload(), b"minus");
        assert_eq!(loaded.find(4).unwrap().head().payload(), b"");
        assert_eq!(loaded.find(12).unwrap().head().payload(), b"twelve");
        assert_eq!(
            loaded.find(12).unwrap().head().generation(),
            Generation::ZERO
        );
    }

    #[test]
    fn tombstones_are_not_persisted() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("t.weft");

        let mut col = Collection::new("t");
        col.upsert(1, b"a".to_vec(), gen(1), &[]);
        col.upsert(2, b"b".to_vec(), gen(2), &[]);
        col.tombstone(2, gen(3), &[]);
        write_collection(&col, None, &path).unwrap();

        let loaded = read_collection("t", &path).unwrap();
        assert_eq!(loaded.entry_count(), 1);
        assert!(loaded.find(2).is_none());
    }

    #[test]
    fn pinned_write_exports_old_versions() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("s.weft");

        let mut col = Collection::new("s");
        col.upsert(1, b"old".to_vec(), gen(1), &[]);
        col.upsert(1, b"new".to_vec(), gen(5), &[gen(2)]);
        write_collection(&col, Some(gen(2)), &path).unwrap();

        let loaded = read_collection("s", &path).unwrap();
        assert_eq!(loaded.find(1).unwrap().head().payload(), b"old");
    }

    #[test]
    fn truncated_file_is_corruption() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.weft");

        let mut col = Collection::new("broken");
        col.upsert(1, b"abcdef".to_vec(), gen(1), &[]);
        write_collection(&col, None, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let result = read_collection("broken", &path);
        assert!(matches!(result, Err(DbError::Corruption { .. })));
    }

    #[test]
    fn truncated_header_is_corruption() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("header.weft");
        std::fs::write(&path, [1_u8, 0]).unwrap();
        let result = read_collection("header", &path);
        assert!(matches!(result, Err(DbError::Corruption { .. })));
    }
}
