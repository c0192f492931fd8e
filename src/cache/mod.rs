//! Content-addressable artifact cache.
//!
//! The cache is a flat directory of `<category>_<lang>_<identifier>.wav`
//! files; the directory listing is the index. This module provides the
//! store itself, the planner that diffs a corpus scan against it and the
//! janitor that evicts stale artifacts.

pub mod janitor;
pub mod planner;
pub mod store;

// Re-export commonly used types
pub use janitor::{evict_stale, JanitorReport};
pub use planner::{plan, Plan};
pub use store::ArtifactCache;
