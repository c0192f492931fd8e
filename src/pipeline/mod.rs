//! Run orchestration.
//!
//! Scanner, planner, selector, executor, validator, janitor and assembler
//! wired together in their causal order.

pub mod sync;

// Re-export commonly used types
pub use sync::{default_assigner, Pipeline, RenderJob, SyncOptions, SyncReport};
