pub mod errors;
pub mod metrics;
pub mod state;
pub mod status;

pub use errors::{ServerError, ServerErrorCounts, ServerErrorKind};
pub use metrics::{Metric, ServerMetrics, TrackingWindow, TRACKING_WINDOW};
pub use state::ServerState;
pub use status::{status_value, ServerStatusEntry};
