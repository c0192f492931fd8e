//! Artifact store backed by a single directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::{ArtifactName, CacheEntry};

/// Flat directory of immutable artifacts.
///
/// Lookup is existence of the constructed file name; there is no separate
/// index file.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    /// Creates a cache rooted at `dir`. Nothing is touched on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::cache_io(&self.dir, e))
    }

    /// Returns the path an artifact lives at.
    pub fn path_for(&self, name: &ArtifactName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    /// Returns true if the artifact exists.
    pub fn contains(&self, name: &ArtifactName) -> bool {
        self.path_for(name).is_file()
    }

    /// Lists every artifact whose file name parses.
    ///
    /// A missing directory is an empty cache. Names outside the artifact
    /// grammar (temp files, stray files) are skipped. Entries are sorted by
    /// file name.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PipelineError::cache_io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| PipelineError::cache_io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match ArtifactName::parse(file_name) {
                Some(name) => entries.push(CacheEntry { name, path }),
                None => debug!("Ignoring non-artifact {}", path.display()),
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Lists the artifacts of one sanitized category.
    pub fn entries_for_category(&self, category: &str) -> Result<Vec<CacheEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.name.category == category)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentId, Language};
    use tempfile::tempdir;

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache"));
        assert!(cache.entries().unwrap().is_empty());
        cache.ensure_dir().unwrap();
        assert!(cache.dir().is_dir());
    }

    #[test]
    fn entries_skip_unparsable_names() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let name = ArtifactName::new("greet", Language::EN, ContentId::of("Hello there"));
        std::fs::write(cache.path_for(&name), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("beep.wav"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub_en_dir")).unwrap();

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, name);
        assert!(cache.contains(&name));
    }

    #[test]
    fn category_filter_is_exact() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let id = ContentId::of("x");
        for category in ["jokes", "dad_jokes"] {
            let name = ArtifactName::new(category, Language::EN, id.clone());
            std::fs::write(cache.path_for(&name), b"x").unwrap();
        }

        let jokes = cache.entries_for_category("jokes").unwrap();
        assert_eq!(jokes.len(), 1);
        assert_eq!(jokes[0].name.category, "jokes");
    }
}
