//! Database configuration.
//!
//! A database is opened from an opaque JSON blob. The core consumes only the
//! optional `directory` field; anything else is preserved for engine-specific
//! layers and ignored here.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{DbError, DbResult};

/// Configuration for opening a database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to load collections from on open and persist them to on
    /// close. `None` keeps the database purely in memory.
    pub directory: Option<PathBuf>,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: None,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates an in-memory configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from its JSON text form.
    ///
    /// An empty or all-whitespace blob yields the in-memory default, matching
    /// the "no config" convention of the command surface.
    pub fn from_json(text: &str) -> DbResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(text)
            .map_err(|e| DbError::invalid_argument(format!("malformed config: {e}")))
    }

    /// Sets the persistence directory.
    #[must_use]
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Sets whether to create a missing directory on open.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_is_in_memory() {
        let config = Config::from_json("  ").unwrap();
        assert!(config.directory.is_none());
        assert!(config.create_if_missing);
    }

    #[test]
    fn directory_field_is_consumed() {
        let config = Config::from_json(r#"{"directory": "/tmp/weft"}"#).unwrap();
        assert_eq!(config.directory, Some(PathBuf::from("/tmp/weft")));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config = Config::from_json(r#"{"engine": "stl", "threads": 4}"#).unwrap();
        assert!(config.directory.is_none());
    }

    #[test]
    fn malformed_blob_is_rejected() {
        assert!(Config::from_json("{directory").is_err());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new().directory("/tmp/x").create_if_missing(false);
        assert!(config.directory.is_some());
        assert!(!config.create_if_missing);
    }
}
