//! Render backends.
//!
//! Two interchangeable strategies turn text into raw audio: a local piper
//! process and a remote HTTP fetch. [`RenderAdapter`] owns one of each plus
//! the normalizer and returns audio already in the target PCM format.

pub mod adapter;
pub mod local;
pub mod remote;

use crate::config::BackendKind;
use crate::error::{RenderFailure, Result};
use crate::types::Language;

// Re-export commonly used types
pub use adapter::{build_normalizer, RenderAdapter};
pub use local::PiperBackend;
pub use remote::HttpBackend;

/// A text-to-speech renderer.
///
/// Implementations make exactly one attempt per call; retrying is left to
/// the next pipeline run.
pub trait RenderBackend: Send + Sync {
    /// Backend family this renderer serves.
    fn kind(&self) -> BackendKind;

    /// Checks that every listed variant can be rendered.
    ///
    /// Called once before any task is submitted; an error here is fatal.
    fn check_available(&self, variants: &[String]) -> Result<()>;

    /// Renders `text` with the given variant and returns the raw payload.
    fn render(
        &self,
        text: &str,
        language: Language,
        variant: &str,
    ) -> std::result::Result<Vec<u8>, RenderFailure>;
}
