//! The paths modality.
//!
//! Variable-length UTF-8 keys hashed onto the core's 64-bit key space.
//! Each slot stores a self-describing record:
//!
//! ```text
//! u16 key_len | key bytes | payload
//! ```
//!
//! Hash collisions chain to the next integer key; a zero `key_len` marks a
//! bridge left by a removal so that probing continues past it. Chains stay
//! short enough in practice that the probe bound is a formality.

use weftdb_core::{Arena, CollectionId, Database, DbError, DbResult, Key};
use xxhash_rust::xxh3::xxh3_64;

use crate::store;

/// Longest collision chain a lookup will follow.
const PROBE_LIMIT: usize = 64;

/// A string-keyed store over one core collection.
#[derive(Debug)]
pub struct Paths<'db> {
    db: &'db Database,
    col: CollectionId,
    arena: Arena,
}

impl<'db> Paths<'db> {
    /// Serves string keys out of `col`.
    #[must_use]
    pub fn new(db: &'db Database, col: CollectionId) -> Self {
        Self {
            db,
            col,
            arena: Arena::new(),
        }
    }

    /// Stores `value` under the string key `path`.
    pub fn put(&mut self, path: &str, value: &[u8]) -> DbResult<()> {
        let record = encode_record(path, value)?;
        let mut bridge: Option<Key> = None;
        let mut slot = slot_of(path);
        for _ in 0..PROBE_LIMIT {
            match store::get(self.db, &mut self.arena, self.col, slot)? {
                None => {
                    // First bridge on the chain is the better home.
                    return store::put(self.db, self.col, bridge.unwrap_or(slot), &record);
                }
                Some(stored) => match decode_record(&stored)? {
                    None => bridge = bridge.or(Some(slot)),
                    Some((key, _)) if key == path => {
                        return store::put(self.db, self.col, slot, &record);
                    }
                    Some(_) => {}
                },
            }
            slot = slot.wrapping_add(1);
        }
        Err(DbError::out_of_memory(format!(
            "collision chain for \"{path}\" exceeds {PROBE_LIMIT} slots"
        )))
    }

    /// Fetches the value stored under `path`.
    pub fn get(&mut self, path: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.find_slot(path)?.map(|(_, value)| value))
    }

    /// Whether `path` is present.
    pub fn contains(&mut self, path: &str) -> DbResult<bool> {
        Ok(self.find_slot(path)?.is_some())
    }

    /// Removes `path`, leaving a bridge so chained successors stay reachable.
    pub fn remove(&mut self, path: &str) -> DbResult<()> {
        if let Some((slot, _)) = self.find_slot(path)? {
            store::put(self.db, self.col, slot, &encode_bridge())?;
        }
        Ok(())
    }

    fn find_slot(&mut self, path: &str) -> DbResult<Option<(Key, Vec<u8>)>> {
        let mut slot = slot_of(path);
        for _ in 0..PROBE_LIMIT {
            match store::get(self.db, &mut self.arena, self.col, slot)? {
                None => return Ok(None),
                Some(stored) => {
                    if let Some((key, value)) = decode_record(&stored)? {
                        if key == path {
                            return Ok(Some((slot, value.to_vec())));
                        }
                    }
                }
            }
            slot = slot.wrapping_add(1);
        }
        Ok(None)
    }
}

fn slot_of(path: &str) -> Key {
    xxh3_64(path.as_bytes()) as Key
}

fn encode_record(path: &str, value: &[u8]) -> DbResult<Vec<u8>> {
    let key_bytes = path.as_bytes();
    let key_len = u16::try_from(key_bytes.len())
        .map_err(|_| DbError::invalid_argument("path keys are limited to 65535 bytes"))?;
    if key_len == 0 {
        return Err(DbError::invalid_argument("the empty path is reserved"));
    }
    let mut record = Vec::with_capacity(2 + key_bytes.len() + value.len());
    record.extend_from_slice(&key_len.to_le_bytes());
    record.extend_from_slice(key_bytes);
    record.extend_from_slice(value);
    Ok(record)
}

fn encode_bridge() -> Vec<u8> {
    0_u16.to_le_bytes().to_vec()
}

/// Splits a slot record into its string key and payload; `None` for bridges.
fn decode_record(record: &[u8]) -> DbResult<Option<(&str, &[u8])>> {
    if record.len() < 2 {
        return Err(DbError::corruption("path record shorter than its header"));
    }
    let key_len = u16::from_le_bytes([record[0], record[1]]) as usize;
    if key_len == 0 {
        return Ok(None);
    }
    let rest = &record[2..];
    if rest.len() < key_len {
        return Err(DbError::corruption("path record shorter than its key"));
    }
    let key = std::str::from_utf8(&rest[..key_len])
        .map_err(|_| DbError::corruption("path key is not UTF-8"))?;
    Ok(Some((key, &rest[key_len..])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weftdb_core::Config;

    fn db() -> Database {
        Database::with_config(Config::new()).unwrap()
    }

    #[test]
    fn put_get_remove_round_trip() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        paths.put("usr/bin/weft", b"binary").unwrap();
        assert_eq!(paths.get("usr/bin/weft").unwrap(), Some(b"binary".to_vec()));
        assert!(paths.contains("usr/bin/weft").unwrap());

        paths.remove("usr/bin/weft").unwrap();
        assert_eq!(paths.get("usr/bin/weft").unwrap(), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        paths.put("a", b"1").unwrap();
        paths.put("a", b"2").unwrap();
        assert_eq!(paths.get("a").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn distinct_keys_do_not_collide_observably() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        for i in 0..64 {
            paths.put(&format!("key-{i}"), format!("v{i}").as_bytes()).unwrap();
        }
        for i in 0..64 {
            assert_eq!(
                paths.get(&format!("key-{i}")).unwrap(),
                Some(format!("v{i}").into_bytes())
            );
        }
    }

    #[test]
    fn empty_path_is_rejected() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        assert!(paths.put("", b"x").is_err());
    }

    #[test]
    fn chained_key_survives_a_bridge_at_its_home() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        // Force a chain by planting a foreign record at "b"'s home slot.
        let home = slot_of("b");
        store::put(&db, CollectionId::MAIN, home, &encode_record("squat", b"s").unwrap()).unwrap();
        paths.put("b", b"chained").unwrap();
        assert_eq!(paths.get("b").unwrap(), Some(b"chained".to_vec()));
        // Turning the home slot into a bridge must keep "b" reachable.
        store::put(&db, CollectionId::MAIN, home, &encode_bridge()).unwrap();
        assert_eq!(paths.get("b").unwrap(), Some(b"chained".to_vec()));
    }

    #[test]
    fn put_reuses_the_first_bridge() {
        let db = db();
        let mut paths = Paths::new(&db, CollectionId::MAIN);
        let home = slot_of("c");
        store::put(&db, CollectionId::MAIN, home, &encode_bridge()).unwrap();
        paths.put("c", b"v").unwrap();
        assert_eq!(paths.get("c").unwrap(), Some(b"v".to_vec()));
        // The record landed in the bridge slot itself.
        let mut arena = Arena::new();
        let stored = store::get(&db, &mut arena, CollectionId::MAIN, home)
            .unwrap()
            .unwrap();
        assert_eq!(decode_record(&stored).unwrap().unwrap().0, "c");
    }
}
