//! # Domain Errors

use thiserror::Error;

/// Errors returned by [`crate::OrderedIndex`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Keys must contain at least one byte.
    #[error("Key must not be empty")]
    EmptyKey,

    /// A `put` targeted a key that is already stored.
    #[error("Key '{key}' already exists")]
    DuplicateKey { key: String },

    /// A `remove` targeted a key that is not stored.
    #[error("Key '{key}' not found")]
    NotFound { key: String },

    /// A structural check failed.
    #[error("Index structure is corrupted: {reason}")]
    Corrupted { reason: String },
}

impl IndexError {
    pub(crate) fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted {
            reason: reason.into(),
        }
    }
}
