//! # Domain Errors
//!
//! Two families: [`TransactionError`] is the fixed, counted taxonomy of a
//! single transaction; [`DispatchError`] covers configuration calls.

use std::fmt;

use ag_03_managed_cache::CacheError;
use serde::Serialize;
use thiserror::Error;

/// Why a transaction failed. Codes are stable and negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionError {
    InvalidArgs,
    Read,
    FailedIdent,
    MissingHandler,
    /// The handler panicked.
    InvalidHandler,
    /// The handler produced no response.
    NullResult,
    /// The response could not be sent as produced (e.g. empty payload).
    InvalidResult,
    Write,
    Close,
    Timeout,
}

impl TransactionError {
    pub const ALL: [TransactionError; 10] = [
        TransactionError::InvalidArgs,
        TransactionError::Read,
        TransactionError::FailedIdent,
        TransactionError::MissingHandler,
        TransactionError::InvalidHandler,
        TransactionError::NullResult,
        TransactionError::InvalidResult,
        TransactionError::Write,
        TransactionError::Close,
        TransactionError::Timeout,
    ];

    pub fn code(self) -> i32 {
        match self {
            TransactionError::InvalidArgs => -1,
            TransactionError::Read => -2,
            TransactionError::FailedIdent => -3,
            TransactionError::MissingHandler => -4,
            TransactionError::InvalidHandler => -5,
            TransactionError::NullResult => -6,
            TransactionError::InvalidResult => -7,
            TransactionError::Write => -8,
            TransactionError::Close => -9,
            TransactionError::Timeout => -10,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Slot in the error counter table; `Total` lives after the last kind.
    pub fn index(self) -> usize {
        (-self.code() - 1) as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TransactionError::InvalidArgs => "Invalid Args",
            TransactionError::Read => "Read",
            TransactionError::FailedIdent => "Identification",
            TransactionError::MissingHandler => "Missing Handler",
            TransactionError::InvalidHandler => "Invalid Handler",
            TransactionError::NullResult => "Null Result",
            TransactionError::InvalidResult => "Invalid Result",
            TransactionError::Write => "Write",
            TransactionError::Close => "Close",
            TransactionError::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl std::error::Error for TransactionError {}

/// Errors from registering handlers and configuring strategies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Message id must not be empty")]
    EmptyMessageId,

    #[error("A handler for '{message_id}' is already registered")]
    DuplicateHandler { message_id: String },

    #[error("No symbol table is registered under '{path}'")]
    SymbolTableNotFound { path: String },

    #[error("Symbol '{name}' ({kind}) not found in any bound symbol table")]
    SymbolNotFound { name: String, kind: &'static str },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
