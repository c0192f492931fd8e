//! Bounded parallel execution of render tasks.
//!
//! One worker pool per backend family, sized independently, with progress
//! funnelled through a single reporter thread.

pub mod pool;
pub mod progress;

// Re-export commonly used types
pub use pool::{ExecutionSummary, Executor, Job, TaskOutcome};
pub use progress::{ProgressEvent, ProgressReporter, ProgressTally};
