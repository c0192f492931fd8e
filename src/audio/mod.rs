//! Audio format handling.
//!
//! Provides WAV inspection against the target PCM contract, in-process and
//! external re-encoding, and the validator/repairer used on every artifact.

pub mod guard;
pub mod normalize;
pub mod resample;
pub mod wav;

// Re-export commonly used items
pub use guard::{FormatGuard, RepairOutcome, SweepReport};
pub use normalize::{AutoNormalizer, BuiltinNormalizer, FfmpegNormalizer, Normalizer};
pub use wav::{AudioFormat, FormatIssue, WavInfo, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
