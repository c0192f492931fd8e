//! Corpus lines, render tasks and cache entries.

use std::path::PathBuf;

use serde::Serialize;

use super::artifact::ArtifactName;
use super::identifier::ContentId;
use super::language::Language;

/// One non-blank, trimmed line of a corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusLine {
    /// Trimmed text to speak.
    pub text: String,
    /// Category derived from the file name (unsanitized).
    pub category: String,
    /// Language derived from the file name.
    pub language: Language,
    /// File the line was read from.
    pub source_file: PathBuf,
}

impl CorpusLine {
    /// Returns the content identifier of this line's text.
    pub fn identifier(&self) -> ContentId {
        ContentId::of(&self.text)
    }

    /// Returns the cache artifact name for this line.
    pub fn artifact_name(&self) -> ArtifactName {
        ArtifactName::new(&self.category, self.language, self.identifier())
    }
}

/// A line that has no cache artifact yet.
///
/// Exists only for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTask {
    /// The line to render.
    pub line: CorpusLine,
    /// Its content identifier.
    pub identifier: ContentId,
    /// Where the validated artifact must end up.
    pub destination: PathBuf,
}

impl RenderTask {
    /// Short label for log lines: `<category>/<lang>/<identifier prefix>`.
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.line.category,
            self.line.language,
            &self.identifier.as_str()[..8]
        )
    }
}

/// A rendered, validated artifact found in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Parsed file name.
    pub name: ArtifactName,
    /// Full path of the artifact.
    pub path: PathBuf,
}

impl CacheEntry {
    /// Returns the entry's content identifier.
    pub fn identifier(&self) -> &ContentId {
        &self.name.identifier
    }
}
