//! Task planning: corpus scan minus cache contents.

use std::collections::HashSet;

use crate::types::{ContentId, CorpusLine, RenderTask};

use super::store::ArtifactCache;

/// Output of [`plan`].
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Lines with no artifact yet, one per distinct artifact name.
    pub tasks: Vec<RenderTask>,
    /// Every identifier seen in the scan.
    pub live: HashSet<ContentId>,
    /// Lines whose artifact already exists.
    pub cached: usize,
    /// Lines that map to an artifact already planned or cached in this pass.
    pub duplicates: usize,
}

/// Computes the render tasks and the live identifier set for a scan.
///
/// Performs no rendering and no writes; the only I/O is checking whether
/// each artifact exists.
pub fn plan(lines: &[CorpusLine], cache: &ArtifactCache) -> Plan {
    let mut result = Plan::default();
    let mut seen = HashSet::new();

    for line in lines {
        let name = line.artifact_name();
        let identifier = name.identifier.clone();
        result.live.insert(identifier.clone());

        if !seen.insert(name.file_name()) {
            result.duplicates += 1;
            continue;
        }

        if cache.contains(&name) {
            result.cached += 1;
        } else {
            result.tasks.push(RenderTask {
                line: line.clone(),
                identifier,
                destination: cache.path_for(&name),
            });
        }
    }

    result
}
