//! The graph modality.
//!
//! Each vertex key maps to its adjacency buffer: a sorted run of
//! `(neighbor key, edge id)` pairs, 16 bytes per edge, little-endian. Plain
//! edges use [`DEFAULT_EDGE_ID`]; multigraphs distinguish parallel edges by
//! id. Edges are undirected here: an upsert registers the edge on both
//! endpoints' buffers.

use weftdb_core::{Arena, CollectionId, Database, DbError, DbResult, Key, DEFAULT_EDGE_ID};

use crate::store;

const EDGE_BYTES: usize = 16;

/// An undirected adjacency-list graph over one core collection.
#[derive(Debug)]
pub struct Graph<'db> {
    db: &'db Database,
    col: CollectionId,
    arena: Arena,
}

impl<'db> Graph<'db> {
    /// Serves a graph out of `col`.
    #[must_use]
    pub fn new(db: &'db Database, col: CollectionId) -> Self {
        Self {
            db,
            col,
            arena: Arena::new(),
        }
    }

    /// Adds an edge between `a` and `b` carrying [`DEFAULT_EDGE_ID`].
    pub fn upsert_edge(&mut self, a: Key, b: Key) -> DbResult<()> {
        self.upsert_edge_with_id(a, b, DEFAULT_EDGE_ID)
    }

    /// Adds an edge between `a` and `b` with an explicit edge id.
    /// Re-adding an existing `(neighbor, edge)` pair is a no-op.
    pub fn upsert_edge_with_id(&mut self, a: Key, b: Key, edge: u64) -> DbResult<()> {
        self.adjacency_insert(a, b, edge)?;
        if a != b {
            self.adjacency_insert(b, a, edge)?;
        }
        Ok(())
    }

    /// Removes the edge between `a` and `b` with the given id.
    pub fn remove_edge(&mut self, a: Key, b: Key, edge: u64) -> DbResult<()> {
        self.adjacency_remove(a, b, edge)?;
        if a != b {
            self.adjacency_remove(b, a, edge)?;
        }
        Ok(())
    }

    /// Removes a vertex and every edge incident to it.
    pub fn remove_vertex(&mut self, vertex: Key) -> DbResult<()> {
        for (neighbor, edge) in self.neighbors(vertex)? {
            if neighbor != vertex {
                self.adjacency_remove(neighbor, vertex, edge)?;
            }
        }
        store::del(self.db, self.col, vertex)
    }

    /// The `(neighbor, edge id)` pairs incident to `vertex`, neighbor-sorted.
    pub fn neighbors(&mut self, vertex: Key) -> DbResult<Vec<(Key, u64)>> {
        match store::get(self.db, &mut self.arena, self.col, vertex)? {
            Some(buffer) => decode_adjacency(&buffer),
            None => Ok(Vec::new()),
        }
    }

    /// Number of edges incident to `vertex`.
    pub fn degree(&mut self, vertex: Key) -> DbResult<usize> {
        Ok(self.neighbors(vertex)?.len())
    }

    fn adjacency_insert(&mut self, vertex: Key, neighbor: Key, edge: u64) -> DbResult<()> {
        let mut pairs = self.neighbors(vertex)?;
        let entry = (neighbor, edge);
        if let Err(at) = pairs.binary_search(&entry) {
            pairs.insert(at, entry);
            store::put(self.db, self.col, vertex, &encode_adjacency(&pairs))?;
        }
        Ok(())
    }

    fn adjacency_remove(&mut self, vertex: Key, neighbor: Key, edge: u64) -> DbResult<()> {
        let mut pairs = self.neighbors(vertex)?;
        if let Ok(at) = pairs.binary_search(&(neighbor, edge)) {
            pairs.remove(at);
            store::put(self.db, self.col, vertex, &encode_adjacency(&pairs))?;
        }
        Ok(())
    }
}

fn encode_adjacency(pairs: &[(Key, u64)]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(pairs.len() * EDGE_BYTES);
    for (neighbor, edge) in pairs {
        buffer.extend_from_slice(&neighbor.to_le_bytes());
        buffer.extend_from_slice(&edge.to_le_bytes());
    }
    buffer
}

fn decode_adjacency(buffer: &[u8]) -> DbResult<Vec<(Key, u64)>> {
    if buffer.len() % EDGE_BYTES != 0 {
        return Err(DbError::corruption(format!(
            "adjacency buffer of {} bytes is not a whole number of edges",
            buffer.len()
        )));
    }
    Ok(buffer
        .chunks_exact(EDGE_BYTES)
        .map(|chunk| {
            let neighbor = i64::from_le_bytes(chunk[..8].try_into().expect("edge layout"));
            let edge = u64::from_le_bytes(chunk[8..].try_into().expect("edge layout"));
            (neighbor, edge)
        })
        .collect())
}
