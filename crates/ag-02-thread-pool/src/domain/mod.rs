pub mod errors;
pub mod lifecycle;
pub mod value_objects;

pub use errors::PoolError;
pub use lifecycle::{LifecycleEvent, WorkerLifecycle};
pub use value_objects::{Signal, StopPolicy, ThreadState, ThreadStatus, WorkerId};
