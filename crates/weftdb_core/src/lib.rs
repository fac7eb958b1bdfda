//! # WeftDB Core
//!
//! The embedded transactional key-value engine under WeftDB's modalities.
//!
//! Clients address entries by a `(collection, 64-bit signed key)` pair and
//! attach arbitrary binary payloads. On top of this substrate the `weftdb_modal`
//! crate layers documents, graphs, paths, and vectors; all of them reduce to
//! the batched read/write/scan/transact contract defined here.
//!
//! This crate provides:
//! - Collection management with an always-present unnamed main collection
//! - MVCC optimistic transactions with generation-based conflict detection
//! - Pinned-generation snapshots with directory export
//! - Batched strided reads, writes, scans, and size estimates
//! - A per-collection on-disk persistence format
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use weftdb_core::{Arena, ContentsArg, Database, Options, Places, ReadSelection, View};
//!
//! let db = Database::open(r#"{"directory": "my_db"}"#)?;
//! let mut arena = Arena::new();
//!
//! let keys = [97_i64, 98, 99];
//! let values = [Some(b"A".as_slice()), Some(b"B".as_slice()), Some(b"C".as_slice())];
//! db.write(
//!     View::Head,
//!     &Places::in_collection(weftdb_core::CollectionId::MAIN, &keys),
//!     &ContentsArg::separate(&values),
//!     Options::default(),
//! )?;
//!
//! let out = db.read(
//!     View::Head,
//!     &Places::in_collection(weftdb_core::CollectionId::MAIN, &keys),
//!     ReadSelection::ALL,
//!     Options::default(),
//!     &mut arena,
//! )?;
//! assert_eq!(out.value(&arena, 0), Some(b"A".as_slice()));
//! db.close()?;
//! ```
//!
//! ## Resource model
//!
//! The database owns all collections and their records. Transactions and the
//! dispatcher's views borrow the database; arenas are standalone caller-owned
//! objects loaned to one operation at a time. Everything releases through
//! `Drop`; only [`Database::close`] does extra work (the final persist).

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod arena;
pub mod codec;
pub mod collection;
pub mod config;
pub mod database;
pub mod dir;
pub mod dispatch;
pub mod error;
pub mod options;
pub mod snapshot;
pub mod strided;
pub mod transaction;
pub mod types;
pub mod value;

pub use arena::{Arena, BitRange, ByteRange, Scalar, TypedRange};
pub use config::Config;
pub use database::Database;
pub use dispatch::{
    ContentsArg, Places, ReadOutput, ReadSelection, ScanOutput, ScanTasks, SizeOutput, SizeTasks,
    ValuesArg, View,
};
pub use error::{DbError, DbResult};
pub use options::Options;
pub use strided::Strided;
pub use transaction::{Transaction, TransactionState};
pub use types::{
    CollectionId, DropMode, Generation, Key, SnapshotId, DEFAULT_EDGE_ID, KEY_UNKNOWN,
    LENGTH_MISSING,
};
