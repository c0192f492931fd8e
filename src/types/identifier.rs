//! Content identifiers.
//!
//! A content identifier is the first 16 bytes of the SHA256 digest of a
//! line's trimmed text, hex encoded. Category and language are *not* part
//! of the digest; they namespace the artifact through its file name.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes kept in an identifier.
pub const IDENTIFIER_BYTES: usize = 16;

/// Length of an identifier in hex characters.
pub const IDENTIFIER_LEN: usize = IDENTIFIER_BYTES * 2;

/// Deterministic identifier of a corpus line's text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Computes the identifier of `text` after trimming surrounding whitespace.
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.trim().as_bytes());
        let digest = hasher.finalize();
        ContentId(hex::encode(&digest[..IDENTIFIER_BYTES]))
    }

    /// Parses an identifier previously produced by [`ContentId::of`].
    ///
    /// Accepts exactly 32 lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == IDENTIFIER_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| ContentId(s.to_string()))
    }

    /// Returns the identifier as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the identifier as an integer and folds it to a 64-bit RNG seed.
    ///
    /// The 128-bit value is split into halves which are XORed together, so
    /// every bit of the identifier influences the seed.
    pub fn seed(&self) -> u64 {
        let value = u128::from_str_radix(&self.0, 16).unwrap_or_default();
        ((value >> 64) as u64) ^ (value as u64)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentId::parse(&value).ok_or_else(|| format!("invalid content identifier: {:?}", value))
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}
