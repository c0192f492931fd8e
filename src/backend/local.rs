//! Local synthesis through the piper binary.
//!
//! Text goes in on stdin; piper writes a WAV file to the path given with
//! `--output_file`. A non-zero exit, a missing/empty output file or a run
//! longer than the timeout is a failure.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::BackendKind;
use crate::error::{FailureKind, PipelineError, RenderFailure, Result};
use crate::types::Language;

use super::RenderBackend;

/// Default limit for one piper run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Piper process backend.
#[derive(Debug, Clone)]
pub struct PiperBackend {
    binary: PathBuf,
    voices_dir: PathBuf,
    timeout: Duration,
}

impl PiperBackend {
    /// Creates a backend for `binary` with voice models in `voices_dir`.
    pub fn new(binary: impl Into<PathBuf>, voices_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            voices_dir: voices_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long one run may take before the process is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the path of a voice model.
    pub fn model_path(&self, variant: &str) -> PathBuf {
        self.voices_dir.join(variant)
    }
}

impl RenderBackend for PiperBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn check_available(&self, variants: &[String]) -> Result<()> {
        if resolve_binary(&self.binary).is_none() {
            return Err(PipelineError::backend_unavailable(format!(
                "piper binary not found at {}",
                self.binary.display()
            )));
        }

        if !self.voices_dir.is_dir() {
            return Err(PipelineError::backend_unavailable(format!(
                "voices directory {} does not exist",
                self.voices_dir.display()
            )));
        }

        let missing: Vec<&str> = variants
            .iter()
            .filter(|v| !self.model_path(v).is_file())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::backend_unavailable(format!(
                "voice models missing from {}: {}",
                self.voices_dir.display(),
                missing.join(", ")
            )));
        }

        Ok(())
    }

    fn render(
        &self,
        text: &str,
        _language: Language,
        variant: &str,
    ) -> std::result::Result<Vec<u8>, RenderFailure> {
        let scratch = tempfile::tempdir()
            .map_err(|e| RenderFailure::new(FailureKind::Io, format!("scratch dir: {}", e)))?;
        let output = scratch.path().join("piper.wav");
        // A file rather than a pipe: nothing has to drain it while we poll.
        let stderr_path = scratch.path().join("piper.log");
        let stderr = File::create(&stderr_path)
            .map_err(|e| RenderFailure::new(FailureKind::Io, format!("stderr log: {}", e)))?;

        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(self.model_path(variant))
            .arg("--output_file")
            .arg(&output)
            .arg("--quiet")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                RenderFailure::new(
                    FailureKind::Spawn,
                    format!("{}: {}", self.binary.display(), e),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                kill(&mut child);
                return Err(RenderFailure::new(FailureKind::Io, format!("stdin: {}", e)));
            }
        }

        let status = wait_with_timeout(&mut child, self.timeout)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(RenderFailure::new(
                FailureKind::ProcessExit,
                format!("piper exited with {}: {}", status, stderr.trim()),
            ));
        }

        let bytes = match std::fs::read(&output) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Err(RenderFailure::new(
                    FailureKind::MissingOutput,
                    format!("piper wrote no audio for model {}", variant),
                ))
            }
        };

        debug!("piper rendered {} bytes with {}", bytes.len(), variant);
        Ok(bytes)
    }
}

/// Polls `child` until it exits; kills it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::result::Result<ExitStatus, RenderFailure> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                kill(child);
                return Err(RenderFailure::new(
                    FailureKind::Timeout,
                    format!("piper killed after {}s", timeout.as_secs_f32()),
                ));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill(child);
                return Err(RenderFailure::new(FailureKind::Io, format!("wait: {}", e)));
            }
        }
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Could not kill piper (pid {}): {}", child.id(), e);
    }
    let _ = child.wait();
}

/// Resolves a binary given as a path or as a bare name on PATH.
pub(crate) fn resolve_binary(binary: &Path) -> Option<PathBuf> {
    if binary.components().count() > 1 || binary.is_absolute() {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
