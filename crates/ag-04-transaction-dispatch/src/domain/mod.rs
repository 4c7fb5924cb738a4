pub mod errors;
pub mod messages;
pub mod metrics;

pub use errors::{DispatchError, TransactionError};
pub use messages::{Request, Response};
pub use metrics::{ErrorCounts, TransactionMetrics, ERROR_SLOTS};

/// Routing key of the handler used when no handler matches a message id.
pub const DEFAULT_MESSAGE_ID: &str = "default";

/// Result of one transaction that reached the send step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub message_id: String,
    pub bytes_sent: usize,
    /// The handler asked for the connection to stay open.
    pub keep_open: bool,
    /// The response came from the cache; the handler did not run.
    pub from_cache: bool,
}
