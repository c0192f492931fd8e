//! Fixed prompts rendered into the output tree.
//!
//! System messages come from a JSON manifest; time announcements come from
//! a built-in table. Both are written at fixed paths under the output root,
//! rendered only when missing and never evicted.

pub mod manifest;
pub mod time;

pub use manifest::{load_manifest, pending, FixedPrompt};
pub use time::time_announcements;
