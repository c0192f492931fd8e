//! Eviction of artifacts no longer backed by the corpus.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::guard::TEMP_SUFFIX;
use crate::error::Result;
use crate::types::ContentId;

use super::store::ArtifactCache;

/// Outcome of a janitor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JanitorReport {
    /// Artifacts deleted (or, in a dry run, that would be deleted).
    pub evicted: Vec<PathBuf>,
    /// Artifacts kept.
    pub kept: usize,
    /// Leftover temporary files from interrupted writes that were removed.
    pub temp_removed: usize,
    /// Artifacts that could not be deleted.
    pub failed: usize,
}

/// Deletes every artifact whose identifier is not in `live`.
///
/// Must only be called with the live set of a complete scan. Names that do
/// not parse are never touched. With `dry_run` nothing is deleted.
pub fn evict_stale(
    cache: &ArtifactCache,
    live: &HashSet<ContentId>,
    dry_run: bool,
) -> Result<JanitorReport> {
    let mut report = JanitorReport::default();

    for entry in cache.entries()? {
        if live.contains(entry.identifier()) {
            report.kept += 1;
            continue;
        }

        if dry_run {
            info!("Would evict {}", entry.name);
            report.evicted.push(entry.path);
            continue;
        }

        match std::fs::remove_file(&entry.path) {
            Ok(()) => {
                info!("Evicted {}", entry.name);
                report.evicted.push(entry.path);
            }
            Err(e) => {
                warn!("Could not evict {}: {}", entry.path.display(), e);
                report.failed += 1;
            }
        }
    }

    if !dry_run {
        report.temp_removed = remove_temp_files(cache);
    }

    Ok(report)
}

fn remove_temp_files(cache: &ArtifactCache) -> usize {
    let Ok(read_dir) = std::fs::read_dir(cache.dir()) else {
        return 0;
    };

    let mut removed = 0;
    for path in read_dir.filter_map(|e| e.ok().map(|e| e.path())) {
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX));
        if is_temp && path.is_file() && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
