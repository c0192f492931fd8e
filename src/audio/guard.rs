//! Format validation and single-pass repair.
//!
//! [`FormatGuard`] enforces the PCM contract on a file. A file that fails is
//! re-encoded once through the configured [`Normalizer`] into a temporary
//! sibling; if the temporary validates it atomically replaces the original,
//! otherwise the original is deleted. A file is never left half-valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};

use super::normalize::Normalizer;
use super::wav::{check, inspect, AudioFormat, FormatIssue, WavInfo};

/// Suffix of temporary files created next to artifacts.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Result of checking (and possibly repairing) one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The file already matched the contract.
    AlreadyValid,
    /// The file was re-encoded and replaced.
    Repaired,
    /// Repair failed and the file was deleted.
    Removed(String),
}

/// Counts from a sweep over one or more directory trees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Number of WAV files inspected.
    pub checked: usize,
    /// Files that were already valid.
    pub valid: usize,
    /// Files that were repaired in place.
    pub repaired: usize,
    /// Files that were deleted after a failed repair.
    pub removed: usize,
    /// Files that failed validation during a dry run.
    pub would_repair: Vec<PathBuf>,
}

/// Validator/repairer bound to a target format and a normalizer.
#[derive(Clone)]
pub struct FormatGuard {
    format: AudioFormat,
    normalizer: Arc<dyn Normalizer>,
}

impl FormatGuard {
    /// Creates a guard.
    pub fn new(format: AudioFormat, normalizer: Arc<dyn Normalizer>) -> Self {
        Self { format, normalizer }
    }

    /// Returns the target format.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Returns the normalizer used for repairs.
    pub fn normalizer(&self) -> &Arc<dyn Normalizer> {
        &self.normalizer
    }

    /// Checks a file against the contract.
    pub fn validate(&self, path: &Path) -> std::result::Result<WavInfo, FormatIssue> {
        let info = inspect(path, &self.format)?;
        check(&info, &self.format)?;
        Ok(info)
    }

    /// Returns true if the file satisfies the contract.
    pub fn is_valid(&self, path: &Path) -> bool {
        self.validate(path).is_ok()
    }

    /// Validates a file and repairs it if needed.
    pub fn ensure(&self, path: &Path) -> Result<RepairOutcome> {
        match self.validate(path) {
            Ok(_) => Ok(RepairOutcome::AlreadyValid),
            Err(FormatIssue::Missing) => Err(PipelineError::format_invalid(format!(
                "{} does not exist",
                path.display()
            ))),
            Err(issue) => {
                debug!("{} failed validation: {}", path.display(), issue);
                self.repair(path)
            }
        }
    }

    /// Re-encodes a file once; replaces it on success, deletes it on failure.
    pub fn repair(&self, path: &Path) -> Result<RepairOutcome> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::cache_io(path, e))?;

        let reason = match self.normalizer.normalize(&bytes, &self.format) {
            Ok(normalized) => match self.stage(&normalized, path)? {
                Ok(temp) => {
                    temp.persist(path)
                        .map_err(|e| PipelineError::cache_io(path, e.error))?;
                    info!("Repaired {}", path.display());
                    return Ok(RepairOutcome::Repaired);
                }
                Err(issue) => issue.to_string(),
            },
            Err(failure) => failure.to_string(),
        };

        warn!("Repair of {} failed ({}), deleting", path.display(), reason);
        std::fs::remove_file(path).map_err(|e| PipelineError::cache_io(path, e))?;
        Ok(RepairOutcome::Removed(reason))
    }

    /// Validates freshly rendered bytes and atomically moves them to `destination`.
    ///
    /// Bytes that fail validation get one re-encode pass. Returns
    /// [`RepairOutcome::AlreadyValid`] when the bytes were stored as-is and
    /// [`RepairOutcome::Repaired`] when the re-encode was needed. Nothing is
    /// written to `destination` on failure.
    pub fn install(&self, bytes: &[u8], destination: &Path) -> Result<RepairOutcome> {
        let first_issue = match self.stage(bytes, destination)? {
            Ok(temp) => {
                self.persist(temp, destination)?;
                return Ok(RepairOutcome::AlreadyValid);
            }
            Err(issue) => issue,
        };

        debug!(
            "Rendered audio for {} failed validation ({}), re-encoding",
            destination.display(),
            first_issue
        );

        let normalized = self
            .normalizer
            .normalize(bytes, &self.format)
            .map_err(|f| PipelineError::format_invalid(format!("{} ({})", f, first_issue)))?;

        match self.stage(&normalized, destination)? {
            Ok(temp) => {
                self.persist(temp, destination)?;
                Ok(RepairOutcome::Repaired)
            }
            Err(issue) => Err(PipelineError::format_invalid(format!(
                "{} still invalid after re-encode: {}",
                destination.display(),
                issue
            ))),
        }
    }

    /// Walks `roots` and ensures every WAV file satisfies the contract.
    ///
    /// With `dry_run` nothing is modified; failing files are listed instead.
    pub fn sweep(&self, roots: &[PathBuf], dry_run: bool) -> SweepReport {
        let mut report = SweepReport::default();

        for root in roots {
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Error accessing entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_sweepable(entry.path()) {
                    continue;
                }

                report.checked += 1;
                let path = entry.path();

                if self.is_valid(path) {
                    report.valid += 1;
                    continue;
                }
                if dry_run {
                    report.would_repair.push(path.to_path_buf());
                    continue;
                }

                match self.repair(path) {
                    Ok(RepairOutcome::Repaired) => report.repaired += 1,
                    Ok(RepairOutcome::Removed(_)) => report.removed += 1,
                    Ok(RepairOutcome::AlreadyValid) => report.valid += 1,
                    Err(e) => warn!("Sweep could not repair {}: {}", path.display(), e),
                }
            }
        }

        report
    }

    /// Writes bytes to a temporary sibling of `destination` and validates it.
    ///
    /// The outer error is an I/O failure; the inner error is a format issue
    /// (in which case the temporary file has already been dropped).
    fn stage(
        &self,
        bytes: &[u8],
        destination: &Path,
    ) -> Result<std::result::Result<NamedTempFile, FormatIssue>> {
        use std::io::Write;

        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| PipelineError::cache_io(dir, e))?;
        temp.write_all(bytes)
            .and_then(|_| temp.flush())
            .map_err(|e| PipelineError::cache_io(temp.path(), e))?;

        Ok(self.validate(temp.path()).map(|_| temp))
    }

    fn persist(&self, temp: NamedTempFile, destination: &Path) -> Result<()> {
        temp.persist(destination)
            .map_err(|e| PipelineError::cache_io(destination, e.error))?;
        Ok(())
    }
}

/// WAV files that are not hidden temporaries.
fn is_sweepable(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.to_ascii_lowercase().ends_with(".wav")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::normalize::BuiltinNormalizer;
    use crate::audio::testing::{wav_bytes, write_fixture};
    use hound::WavSpec;
    use tempfile::tempdir;

    fn guard() -> FormatGuard {
        FormatGuard::new(AudioFormat::default(), Arc::new(BuiltinNormalizer))
    }

    #[test]
    fn repair_fixes_stereo_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let guard = guard();
        write_fixture(&path, WavSpec { channels: 2, ..guard.format().spec() }, 500);

        assert!(!guard.is_valid(&path));
        assert_eq!(guard.ensure(&path).unwrap(), RepairOutcome::Repaired);
        assert!(guard.is_valid(&path));
    }

    #[test]
    fn unrepairable_file_is_deleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, vec![1u8; 512]).unwrap();

        let outcome = guard().ensure(&path).unwrap();
        assert!(matches!(outcome, RepairOutcome::Removed(_)));
        assert!(!path.exists());
        // No temporaries are left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn install_stores_valid_bytes_unchanged() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("a.wav");
        let guard = guard();
        let bytes = wav_bytes(guard.format().spec(), 300);

        assert_eq!(guard.install(&bytes, &dest).unwrap(), RepairOutcome::AlreadyValid);
        assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    }

    #[test]
    fn install_reencodes_wrong_rate() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("b.wav");
        let guard = guard();
        let bytes = wav_bytes(WavSpec { sample_rate: 16000, ..guard.format().spec() }, 1600);

        assert_eq!(guard.install(&bytes, &dest).unwrap(), RepairOutcome::Repaired);
        assert!(guard.is_valid(&dest));
    }

    #[test]
    fn install_of_garbage_leaves_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("c.wav");
        assert!(guard().install(b"not audio at all, definitely not", &dest).is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn sweep_dry_run_only_reports() {
        let dir = tempdir().unwrap();
        let guard = guard();
        let good = dir.path().join("good.wav");
        let bad = dir.path().join("nested").join("bad.wav");
        std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
        write_fixture(&good, guard.format().spec(), 100);
        write_fixture(&bad, WavSpec { channels: 2, ..guard.format().spec() }, 100);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = guard.sweep(&[dir.path().to_path_buf()], true);
        assert_eq!(report.checked, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.would_repair, vec![bad.clone()]);
        assert!(!guard.is_valid(&bad));

        let report = guard.sweep(&[dir.path().to_path_buf()], false);
        assert_eq!(report.repaired, 1);
        assert!(guard.is_valid(&bad));
    }
}
