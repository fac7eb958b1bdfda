//! Core type definitions for WeftDB.

use std::fmt;

/// A record key.
///
/// Keys are fixed-width signed 64-bit integers; collections order their
/// entries by signed comparison. Variable-length keying is layered on top by
/// the paths modality, never by the core.
pub type Key = i64;

/// Sentinel returned by collaborators for "no such key".
///
/// The core itself never emits this value; it is reserved so that adapters
/// (the graph modality in particular) share one well-known constant.
pub const KEY_UNKNOWN: Key = i64::MAX;

/// Sentinel length reported for a missing value.
pub const LENGTH_MISSING: u32 = u32::MAX;

/// Reserved edge identifier used by the graph modality for plain edges.
pub const DEFAULT_EDGE_ID: u64 = u64::MAX;

/// A generation stamp.
///
/// Every mutation obtains a fresh generation from the database's atomic
/// counter. Generations are monotone; zero is reserved for "never observed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// The reserved "never observed" generation.
    pub const ZERO: Self = Self(0);

    /// Creates a generation from its raw counter value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this is the reserved zero generation.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen:{}", self.0)
    }
}

/// Identifier for a collection.
///
/// The default unnamed "main" collection is always id 0; named collections
/// receive ids from a monotone counter when created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CollectionId(pub u64);

impl CollectionId {
    /// The default (main) collection.
    pub const MAIN: Self = Self(0);

    /// Creates a collection id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this id addresses the main collection.
    #[must_use]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col:{}", self.0)
    }
}

/// Identifier for a registered snapshot. Always nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub u64);

impl SnapshotId {
    /// Creates a snapshot id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snap:{}", self.0)
    }
}

/// What to do with a collection when dropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropMode {
    /// Tombstone every value at a fresh generation; keys stay behind for
    /// concurrent transactions to conflict against.
    ValuesOnly,
    /// Remove all entries, tombstones included; the collection itself stays.
    KeysAndValues,
    /// Remove the collection from the database entirely. Rejected for the
    /// main collection.
    CollectionHandle,
}
