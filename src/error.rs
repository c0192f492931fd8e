//! Error types for the voicepack pipeline.
//!
//! Defines the error codes used for run-level failures and the per-task
//! failure values that are logged and counted without aborting a batch.

use std::fmt;

/// Error codes for pipeline failures.
///
/// Only [`ErrorCode::BackendUnavailable`] and [`ErrorCode::ConfigInvalid`]
/// abort a run; the remaining codes describe per-item failures that are
/// reported and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A corpus file could not be read or named.
    /// Trigger: permission denied, invalid UTF-8, unsupported language suffix.
    ScanFailed,

    /// Cache or output directory could not be read or written.
    /// Trigger: missing directory, disk full, permission denied.
    CacheIo,

    /// A render backend failed to produce audio.
    /// Trigger: process exit code, HTTP error, timeout, bad payload.
    RenderFailed,

    /// An artifact does not match the target PCM format and could not be repaired.
    /// Trigger: wrong channel count, sample width or rate; truncated file.
    FormatInvalid,

    /// A persona slot could not be assembled.
    /// Trigger: no category resolvable for the slot, copy failure.
    AssemblyFailed,

    /// A required backend binary, voice model or re-encoder is missing.
    /// Trigger: piper binary or voices directory absent, ffmpeg not on PATH.
    BackendUnavailable,

    /// The configuration is inconsistent.
    /// Trigger: zero workers, empty language list, unreadable config file.
    ConfigInvalid,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ScanFailed => "SCAN_FAILED",
            ErrorCode::CacheIo => "CACHE_IO",
            ErrorCode::RenderFailed => "RENDER_FAILED",
            ErrorCode::FormatInvalid => "FORMAT_INVALID",
            ErrorCode::AssemblyFailed => "ASSEMBLY_FAILED",
            ErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ScanFailed => "Corpus file could not be scanned",
            ErrorCode::CacheIo => "Cache or output directory access failed",
            ErrorCode::RenderFailed => "Speech backend failed to render audio",
            ErrorCode::FormatInvalid => "Artifact does not match the target PCM format",
            ErrorCode::AssemblyFailed => "Persona slot could not be assembled",
            ErrorCode::BackendUnavailable => "Required speech backend is not installed",
            ErrorCode::ConfigInvalid => "Configuration is invalid",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::ScanFailed => {
                "Check the file is UTF-8 text named <category>[_<lang>].txt \
                 with a supported language code"
            }
            ErrorCode::CacheIo => {
                "Check that the cache and output directories exist, are writable \
                 and that the disk is not full"
            }
            ErrorCode::RenderFailed => {
                "The line stays uncached and is retried on the next run; \
                 check backend logs or network access if it keeps failing"
            }
            ErrorCode::FormatInvalid => {
                "The artifact was deleted and will be re-rendered on the next run"
            }
            ErrorCode::AssemblyFailed => {
                "Assign a category with --persona SLOT=CATEGORY or add the \
                 slot to personas.defaults in the config file"
            }
            ErrorCode::BackendUnavailable => {
                "Install the piper binary and voice models at the configured paths, \
                 or put ffmpeg on PATH when rendering through the remote backend"
            }
            ErrorCode::ConfigInvalid => {
                "Fix the reported field in the config file or VOICEPACK_* environment"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for pipeline operations.
#[derive(Debug)]
pub struct PipelineError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PipelineError {
    /// Creates a new PipelineError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new PipelineError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a SCAN_FAILED error for a corpus directory that cannot be listed.
    pub fn scan_failed(dir: &std::path::Path, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::ScanFailed,
            format!("cannot list corpus directory {}: {}", dir.display(), source),
            source,
        )
    }

    /// Creates a CACHE_IO error wrapping an I/O failure on `path`.
    pub fn cache_io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::CacheIo,
            format!("I/O failure on {}: {}", path.display(), source),
            source,
        )
    }

    /// Creates a FORMAT_INVALID error.
    pub fn format_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::FormatInvalid, reason)
    }

    /// Creates an ASSEMBLY_FAILED error.
    pub fn assembly_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::AssemblyFailed, reason)
    }

    /// Creates a BACKEND_UNAVAILABLE error.
    pub fn backend_unavailable(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendUnavailable, reason)
    }

    /// Creates a CONFIG_INVALID error.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, reason)
    }

    /// Returns true if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::BackendUnavailable | ErrorCode::ConfigInvalid
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Category of a single failed render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The synthesis process could not be started.
    Spawn,
    /// The synthesis process exited with a non-zero status.
    ProcessExit,
    /// The synthesis process succeeded but wrote no output.
    MissingOutput,
    /// The remote service answered with a non-success status or the request failed.
    Http,
    /// The remote request timed out.
    Timeout,
    /// The payload was empty or not audio.
    MalformedPayload,
    /// Re-encoding to the target PCM format failed.
    Normalization,
    /// Reading or writing a temporary file failed.
    Io,
}

impl FailureKind {
    /// Returns the string representation of the failure kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Spawn => "spawn",
            FailureKind::ProcessExit => "process_exit",
            FailureKind::MissingOutput => "missing_output",
            FailureKind::Http => "http",
            FailureKind::Timeout => "timeout",
            FailureKind::MalformedPayload => "malformed_payload",
            FailureKind::Normalization => "normalization",
            FailureKind::Io => "io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a single render attempt.
///
/// Render failures are never cached: the task stays absent from the cache
/// and is planned again on the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl RenderFailure {
    /// Creates a new RenderFailure.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RenderFailure {}

impl From<RenderFailure> for PipelineError {
    fn from(failure: RenderFailure) -> Self {
        PipelineError::new(ErrorCode::RenderFailed, failure.to_string())
    }
}
