//! The vector modality.
//!
//! Fixed-dimension `f32` vectors packed little-endian into binary payloads,
//! with exhaustive linear-scan nearest-neighbor search. Approximate indexes
//! live in outer engines; this adapter is the exact reference path.

use weftdb_core::{Arena, CollectionId, Database, DbError, DbResult, Key};

use crate::store;

/// Distance/similarity measure for [`Vectors::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Cosine similarity; higher ranks first.
    Cosine,
    /// Inner product; higher ranks first.
    DotProduct,
    /// Squared Euclidean distance; lower ranks first.
    SquaredEuclidean,
}

/// A fixed-dimension vector store over one core collection.
#[derive(Debug)]
pub struct Vectors<'db> {
    db: &'db Database,
    col: CollectionId,
    dims: usize,
    arena: Arena,
}

impl<'db> Vectors<'db> {
    /// Serves `dims`-dimensional vectors out of `col`.
    #[must_use]
    pub fn new(db: &'db Database, col: CollectionId, dims: usize) -> Self {
        Self {
            db,
            col,
            dims,
            arena: Arena::new(),
        }
    }

    /// The fixed dimensionality of this store.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Stores `vector` under `key`, replacing any previous vector.
    pub fn upsert(&mut self, key: Key, vector: &[f32]) -> DbResult<()> {
        if vector.len() != self.dims {
            return Err(DbError::invalid_argument(format!(
                "expected {} dimensions, got {}",
                self.dims,
                vector.len()
            )));
        }
        let mut payload = Vec::with_capacity(self.dims * 4);
        for component in vector {
            payload.extend_from_slice(&component.to_le_bytes());
        }
        store::put(self.db, self.col, key, &payload)
    }

    /// Fetches the vector under `key`.
    pub fn get(&mut self, key: Key) -> DbResult<Option<Vec<f32>>> {
        match store::get(self.db, &mut self.arena, self.col, key)? {
            Some(payload) => self.decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the vector under `key`.
    pub fn remove(&mut self, key: Key) -> DbResult<()> {
        store::del(self.db, self.col, key)
    }

    /// Exhaustive top-`k` search: every stored vector is scored against
    /// `query` under `metric`, best first.
    pub fn search(
        &mut self,
        query: &[f32],
        k: usize,
        metric: Metric,
    ) -> DbResult<Vec<(Key, f32)>> {
        if query.len() != self.dims {
            return Err(DbError::invalid_argument(format!(
                "expected {} dimensions, got {}",
                self.dims,
                query.len()
            )));
        }

        let keys = store::scan_keys(
            self.db,
            &mut self.arena,
            self.col,
            Key::MIN,
            Key::MAX,
            u32::MAX,
        )?;
        let mut scored = Vec::with_capacity(keys.len());
        for batch in keys.chunks(1024) {
            let payloads = store::get_many(self.db, &mut self.arena, self.col, batch)?;
            for (key, payload) in batch.iter().zip(payloads) {
                let Some(payload) = payload else { continue };
                let vector = self.decode(&payload)?;
                scored.push((*key, score(query, &vector, metric)));
            }
        }

        match metric {
            Metric::SquaredEuclidean => {
                scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            }
            Metric::Cosine | Metric::DotProduct => {
                scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            }
        }
        scored.truncate(k);
        Ok(scored)
    }

    fn decode(&self, payload: &[u8]) -> DbResult<Vec<f32>> {
        if payload.len() != self.dims * 4 {
            return Err(DbError::corruption(format!(
                "stored vector holds {} bytes, expected {}",
                payload.len(),
                self.dims * 4
            )));
        }
        Ok(payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("f32 layout")))
            .collect())
    }
}

fn score(query: &[f32], candidate: &[f32], metric: Metric) -> f32 {
    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    match metric {
        Metric::DotProduct => dot,
        Metric::Cosine => {
            let norms = norm(query) * norm(candidate);
            if norms == 0.0 {
                0.0
            } else {
                dot / norms
            }
        }
        Metric::SquaredEuclidean => query
            .iter()
            .zip(candidate)
            .map(|(a, b)| (a - b) * (a - b))
            .sum(),
    }
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|c| c * c).sum::<f32>().sqrt()
}
