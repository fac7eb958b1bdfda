//! Error types for the WeftDB core engine.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced by the core engine.
///
/// Every failed operation produces exactly one of these; output buffers are
/// left in an indeterminate state and must not be consumed after an error.
#[derive(Debug, Error)]
pub enum DbError {
    /// A malformed argument: null handle, forbidden zero stride, bad option
    /// combination, reserved name, or an illegal drop mode.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the offending argument.
        message: String,
    },

    /// The addressed collection or snapshot does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// A named collection with this name already exists.
    #[error("already exists: {message}")]
    AlreadyExists {
        /// The conflicting name.
        message: String,
    },

    /// Transaction validation failed: a tracked read went stale or a pending
    /// write collides with a newer committed record.
    #[error("transaction conflict: {message}")]
    Conflict {
        /// Description of the colliding entry.
        message: String,
    },

    /// A transaction tried to commit the same entry twice at one generation.
    #[error("repeated commit: {message}")]
    Repeated {
        /// Description of the repeated entry.
        message: String,
    },

    /// A persistence file is inconsistent with its own header.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the inconsistency.
        message: String,
    },

    /// Arena or internal map growth could not be satisfied.
    #[error("out of memory: {message}")]
    OutOfMemory {
        /// What failed to allocate.
        message: String,
    },

    /// The request names a feature this engine does not provide.
    #[error("not implemented: {message}")]
    NotImplemented {
        /// The unrecognized request.
        message: String,
    },

    /// Another process holds the database directory lock.
    #[error("database in use: another process holds the directory lock")]
    InUse,

    /// An I/O failure that is not a structural corruption.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DbError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a repeated-commit error.
    pub fn repeated(message: impl Into<String>) -> Self {
        Self::Repeated {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an out-of-memory error.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::OutOfMemory {
            message: message.into(),
        }
    }

    /// Creates a not-implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render() {
        let err = DbError::invalid_argument("keys may not use stride 0");
        assert_eq!(
            err.to_string(),
            "invalid argument: keys may not use stride 0"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: DbError = io.into();
        assert!(matches!(err, DbError::Io(_)));
    }
}
