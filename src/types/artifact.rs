//! Cache artifact file names.
//!
//! Grammar: `<category>_<lang>_<identifier>.wav`, where `category` is a
//! non-empty run of `[A-Za-z0-9_-]` (it may itself contain underscores),
//! `lang` is a two-character [`Language`] and `identifier` is a
//! [`ContentId`]. The last two underscore-separated segments are
//! authoritative, so categories with underscores parse unambiguously.

use std::fmt;

use super::identifier::ContentId;
use super::language::Language;

/// File extension of every cache artifact.
pub const ARTIFACT_EXTENSION: &str = "wav";

/// Strips every character outside `[A-Za-z0-9_-]` from a category name.
pub fn sanitize_category(category: &str) -> String {
    category.chars().filter(|c| is_category_char(*c)).collect()
}

fn is_category_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parsed name of a cache artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName {
    /// Sanitized category.
    pub category: String,
    /// Language of the rendered line.
    pub language: Language,
    /// Identifier of the rendered text.
    pub identifier: ContentId,
}

impl ArtifactName {
    /// Builds the artifact name for a line, sanitizing the category.
    pub fn new(category: &str, language: Language, identifier: ContentId) -> Self {
        Self {
            category: sanitize_category(category),
            language,
            identifier,
        }
    }

    /// Returns the file name, e.g. `greet_en_<identifier>.wav`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.category, self.language, self.identifier, ARTIFACT_EXTENSION
        )
    }

    /// Parses a file name back into its parts.
    ///
    /// Returns `None` for anything that does not match the grammar exactly:
    /// other extensions, temp files, missing segments, bad identifiers.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(ARTIFACT_EXTENSION)?.strip_suffix('.')?;
        let (rest, identifier) = stem.rsplit_once('_')?;
        let (category, language) = rest.rsplit_once('_')?;

        if category.is_empty() || !category.chars().all(is_category_char) {
            return None;
        }

        Some(Self {
            category: category.to_string(),
            language: Language::parse(language)?,
            identifier: ContentId::parse(identifier)?,
        })
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
