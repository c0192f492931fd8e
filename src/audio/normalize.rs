//! Re-encoding raw backend output into the target PCM format.
//!
//! Two strategies exist: an in-process path for WAV input (decode with
//! hound, downmix, resample with rubato, requantise to 16-bit) and an
//! external `ffmpeg` re-encode for anything else, such as MP3 from the
//! remote backend. [`AutoNormalizer`] picks between them per payload.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{FailureKind, PipelineError, RenderFailure, Result};

use super::resample::resample_mono;
use super::wav::{decode, downmix, encode_pcm16, is_wav, AudioFormat};

/// Converts arbitrary audio bytes into a mono 16-bit WAV at the target rate.
pub trait Normalizer: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Re-encodes `input` into the target format.
    fn normalize(&self, input: &[u8], format: &AudioFormat) -> std::result::Result<Vec<u8>, RenderFailure>;
}

/// In-process normalizer for WAV payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinNormalizer;

impl Normalizer for BuiltinNormalizer {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn normalize(&self, input: &[u8], format: &AudioFormat) -> std::result::Result<Vec<u8>, RenderFailure> {
        let fail = |msg: String| RenderFailure::new(FailureKind::Normalization, msg);

        if !is_wav(input) {
            return Err(RenderFailure::new(
                FailureKind::MalformedPayload,
                "payload is not a RIFF/WAVE file",
            ));
        }

        let decoded = decode(input).map_err(|e| fail(format!("decode failed: {}", e)))?;
        if decoded.channels == 0 {
            return Err(fail("zero channels".to_string()));
        }

        let mono = downmix(&decoded.samples, decoded.channels);
        if mono.is_empty() {
            return Err(RenderFailure::new(
                FailureKind::MalformedPayload,
                "payload has no audio frames",
            ));
        }

        let resampled = resample_mono(&mono, decoded.sample_rate, format.sample_rate).map_err(fail)?;
        encode_pcm16(&resampled, format).map_err(|e| fail(format!("encode failed: {}", e)))
    }
}

/// External `ffmpeg` re-encoder.
#[derive(Debug, Clone)]
pub struct FfmpegNormalizer {
    binary: PathBuf,
}

impl FfmpegNormalizer {
    /// Creates a normalizer invoking `binary`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Checks that the binary runs.
    pub fn check_available(&self) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(PipelineError::backend_unavailable(format!(
                "{} -version exited with {}",
                self.binary.display(),
                s
            ))),
            Err(e) => Err(PipelineError::backend_unavailable(format!(
                "ffmpeg not runnable at {}: {}",
                self.binary.display(),
                e
            ))),
        }
    }
}

impl Normalizer for FfmpegNormalizer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn normalize(&self, input: &[u8], format: &AudioFormat) -> std::result::Result<Vec<u8>, RenderFailure> {
        let io_fail = |e: std::io::Error| RenderFailure::new(FailureKind::Io, e.to_string());

        // ffmpeg cannot patch WAV header sizes when writing to a pipe, so both
        // sides go through files.
        let workdir = tempfile::Builder::new()
            .prefix("voicepack-ffmpeg-")
            .tempdir()
            .map_err(io_fail)?;
        let input_path = workdir.path().join("input");
        let output_path = workdir.path().join("output.wav");
        std::fs::write(&input_path, input).map_err(io_fail)?;

        let output = Command::new(&self.binary)
            .args(["-y", "-v", "error", "-i"])
            .arg(&input_path)
            .args(["-ac", "1", "-ar"])
            .arg(format.sample_rate.to_string())
            .args(["-acodec", "pcm_s16le"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                RenderFailure::new(
                    FailureKind::Spawn,
                    format!("failed to run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderFailure::new(
                FailureKind::Normalization,
                format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        std::fs::read(&output_path).map_err(|e| {
            RenderFailure::new(
                FailureKind::MissingOutput,
                format!("ffmpeg wrote no output: {}", e),
            )
        })
    }
}

/// Uses the builtin path for WAV input and ffmpeg for everything else.
#[derive(Debug, Clone, Default)]
pub struct AutoNormalizer {
    builtin: BuiltinNormalizer,
    ffmpeg: Option<FfmpegNormalizer>,
}

impl AutoNormalizer {
    /// Creates an auto normalizer; `ffmpeg` is optional.
    pub fn new(ffmpeg: Option<FfmpegNormalizer>) -> Self {
        Self {
            builtin: BuiltinNormalizer,
            ffmpeg,
        }
    }
}

impl Normalizer for AutoNormalizer {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn normalize(&self, input: &[u8], format: &AudioFormat) -> std::result::Result<Vec<u8>, RenderFailure> {
        if is_wav(input) {
            match self.builtin.normalize(input, format) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if self.ffmpeg.is_some() => {
                    debug!("Builtin normalizer failed ({}), retrying with ffmpeg", e);
                }
                Err(e) => return Err(e),
            }
        }

        match &self.ffmpeg {
            Some(ffmpeg) => ffmpeg.normalize(input, format),
            None => Err(RenderFailure::new(
                FailureKind::Normalization,
                "payload is not WAV and no ffmpeg binary is configured",
            )),
        }
    }
}
