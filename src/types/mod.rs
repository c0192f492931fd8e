//! Core types for the voicepack pipeline.
//!
//! - [`Language`]: two-letter language code
//! - [`ContentId`]: deterministic digest of a line's trimmed text
//! - [`ArtifactName`]: parser/builder for cache artifact file names
//! - [`CorpusLine`], [`RenderTask`], [`CacheEntry`]: pipeline records

mod artifact;
mod identifier;
mod language;
mod line;

pub use artifact::{sanitize_category, ArtifactName, ARTIFACT_EXTENSION};
pub use identifier::{ContentId, IDENTIFIER_BYTES, IDENTIFIER_LEN};
pub use language::Language;
pub use line::{CacheEntry, CorpusLine, RenderTask};
