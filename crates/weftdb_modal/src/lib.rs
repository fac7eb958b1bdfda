//! # WeftDB Modalities
//!
//! Higher-level data models layered over the `weftdb_core` engine:
//!
//! - [`Documents`]: hierarchical JSON documents with field-path access
//! - [`Graph`]: vertex adjacency lists with edges stored as values
//! - [`Paths`]: variable-length string keys mapped onto integer keys
//! - [`Vectors`]: fixed-dimension float vectors with linear-scan search
//!
//! Every adapter is a thin protocol layer: it encodes domain data as binary
//! values and speaks only the core's batched read/write/scan contract. An
//! adapter owns its scratch arena (one per thread, like any other core
//! caller) and borrows the database it serves.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod store;

pub mod docs;
pub mod graph;
pub mod paths;
pub mod vectors;

pub use docs::Documents;
pub use graph::Graph;
pub use paths::Paths;
pub use vectors::{Metric, Vectors};
