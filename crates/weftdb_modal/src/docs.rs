//! The document modality.
//!
//! Documents are hierarchical JSON values serialized into plain binary
//! payloads. Field access takes a dot-separated path (`"profile.age"`,
//! `"tags.0"`); whole-document replacement is the only write primitive, patch
//! semantics belong to outer layers.

use serde_json::Value;
use weftdb_core::{
    Arena, CollectionId, ContentsArg, Database, DbError, DbResult, Key, Options, Places, View,
};

use crate::store;

/// A JSON document collection over one core collection.
#[derive(Debug)]
pub struct Documents<'db> {
    db: &'db Database,
    col: CollectionId,
    arena: Arena,
}

impl<'db> Documents<'db> {
    /// Serves documents out of `col`.
    #[must_use]
    pub fn new(db: &'db Database, col: CollectionId) -> Self {
        Self {
            db,
            col,
            arena: Arena::new(),
        }
    }

    /// The backing collection.
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.col
    }

    /// Stores `doc` under `key`, replacing any previous document.
    pub fn insert(&mut self, key: Key, doc: &Value) -> DbResult<()> {
        let bytes = serde_json::to_vec(doc)
            .map_err(|e| DbError::invalid_argument(format!("unserializable document: {e}")))?;
        store::put(self.db, self.col, key, &bytes)
    }

    /// Stores a batch of documents in one write.
    pub fn insert_many(&mut self, entries: &[(Key, Value)]) -> DbResult<()> {
        let mut keys = Vec::with_capacity(entries.len());
        let mut buffers = Vec::with_capacity(entries.len());
        for (key, doc) in entries {
            keys.push(*key);
            buffers.push(serde_json::to_vec(doc).map_err(|e| {
                DbError::invalid_argument(format!("unserializable document: {e}"))
            })?);
        }
        let values: Vec<Option<&[u8]>> = buffers.iter().map(|b| Some(b.as_slice())).collect();
        self.db.write(
            View::Head,
            &Places::in_collection(self.col, &keys),
            &ContentsArg::separate(&values),
            Options::default(),
        )
    }

    /// Fetches the whole document under `key`.
    pub fn get(&mut self, key: Key) -> DbResult<Option<Value>> {
        match store::get(self.db, &mut self.arena, self.col, key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| DbError::corruption(format!("stored document is not JSON: {e}"))),
            None => Ok(None),
        }
    }

    /// Fetches one field of the document under `key`.
    ///
    /// `path` is dot-separated; numeric segments index into arrays. Returns
    /// `None` when the document or the addressed field is absent.
    pub fn get_field(&mut self, key: Key, path: &str) -> DbResult<Option<Value>> {
        let Some(doc) = self.get(key)? else {
            return Ok(None);
        };
        let mut cursor = &doc;
        for segment in path.split('.') {
            cursor = match cursor {
                Value::Object(map) => match map.get(segment) {
                    Some(next) => next,
                    None => return Ok(None),
                },
                Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i))
                {
                    Some(next) => next,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
        }
        Ok(Some(cursor.clone()))
    }

    /// Removes the document under `key`.
    pub fn remove(&mut self, key: Key) -> DbResult<()> {
        store::del(self.db, self.col, key)
    }
}
