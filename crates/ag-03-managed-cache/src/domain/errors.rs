//! # Domain Errors

use ag_01_ordered_index::IndexError;
use ag_02_thread_pool::PoolError;
use thiserror::Error;

/// Errors from managed cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid arguments: {reason}")]
    InvalidArgs { reason: String },

    #[error("Key '{key}' is already cached")]
    DuplicateKey { key: String },

    #[error("Key '{key}' is not cached")]
    NotFound { key: String },

    /// A byte-payload accessor hit an entry holding an owned value.
    #[error("Entry '{key}' does not hold a byte payload")]
    NotSimple { key: String },

    #[error("Invalid cache configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Eviction worker error: {0}")]
    Pool(#[from] PoolError),

    #[error("Index error: {0}")]
    Index(IndexError),
}

impl From<IndexError> for CacheError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DuplicateKey { key } => CacheError::DuplicateKey { key },
            IndexError::NotFound { key } => CacheError::NotFound { key },
            IndexError::EmptyKey => CacheError::InvalidArgs {
                reason: "key must not be empty".to_string(),
            },
            other => CacheError::Index(other),
        }
    }
}
