//! Two-letter language codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A two-letter language code such as `en` or `de`.
///
/// Stored lowercase. Any two ASCII alphanumeric characters are accepted by
/// [`Language::parse`]; whether a code is *supported* is decided by the
/// configured language list, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language([u8; 2]);

impl Language {
    /// English.
    pub const EN: Language = Language(*b"en");
    /// German.
    pub const DE: Language = Language(*b"de");

    /// Parses a language code, lowercasing it.
    ///
    /// Returns `None` unless the input is exactly two ASCII alphanumeric characters.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Language([
            bytes[0].to_ascii_lowercase(),
            bytes[1].to_ascii_lowercase(),
        ]))
    }

    /// Returns the first configured language, or English if none is.
    ///
    /// Corpus files without a language suffix belong to it.
    pub fn primary(languages: &[Language]) -> Language {
        languages.first().copied().unwrap_or(Language::EN)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Both bytes are validated ASCII on construction.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Language::parse(&value).ok_or_else(|| format!("invalid language code: {:?}", value))
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}
