//! # WeftDB Testkit
//!
//! Test utilities shared across the WeftDB crates:
//! - Database fixtures with automatic temp-directory cleanup
//! - Single-key convenience wrappers over the batched dispatcher
//! - proptest strategies for keys, payloads, and collection names

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
