//! Prompt manifest loading.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::types::{ContentId, Language};

/// A line rendered to a fixed path under the output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPrompt {
    /// Destination relative to the output root, e.g. `system/menu_en.wav`.
    pub path: PathBuf,
    /// Text to speak.
    pub text: String,
    /// Language of the text.
    pub language: Language,
    /// Voice model to use instead of the seeded choice.
    #[serde(default)]
    pub voice: Option<String>,
}

impl FixedPrompt {
    /// Creates a prompt.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>, language: Language, voice: Option<&str>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            language,
            voice: voice.map(str::to_string),
        }
    }

    /// Returns the content identifier of the prompt text.
    pub fn identifier(&self) -> ContentId {
        ContentId::of(&self.text)
    }

    /// Checks that the destination stays inside the output root.
    fn check(&self) -> std::result::Result<(), String> {
        if self.text.trim().is_empty() {
            return Err(format!("{}: empty text", self.path.display()));
        }
        let inside = !self.path.as_os_str().is_empty()
            && self.path.components().all(|c| matches!(c, Component::Normal(_)));
        if !inside {
            return Err(format!("{}: path must be relative without ..", self.path.display()));
        }
        let is_wav = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if !is_wav {
            return Err(format!("{}: path must end in .wav", self.path.display()));
        }
        Ok(())
    }
}

/// Loads and checks a JSON array of [`FixedPrompt`]s.
pub fn load_manifest(path: &Path) -> Result<Vec<FixedPrompt>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::with_source(
            ErrorCode::ConfigInvalid,
            format!("cannot read prompt manifest {}", path.display()),
            e,
        )
    })?;
    let prompts: Vec<FixedPrompt> = serde_json::from_str(&text).map_err(|e| {
        PipelineError::with_source(
            ErrorCode::ConfigInvalid,
            format!("cannot parse prompt manifest {}: {}", path.display(), e),
            e,
        )
    })?;

    for prompt in &prompts {
        prompt.check().map_err(PipelineError::config_invalid)?;
    }
    Ok(prompts)
}

/// Returns the prompts in a supported language whose file is missing, with
/// their absolute destination.
pub fn pending(prompts: &[FixedPrompt], output_dir: &Path, languages: &[Language]) -> Vec<(FixedPrompt, PathBuf)> {
    prompts
        .iter()
        .filter(|p| languages.contains(&p.language))
        .map(|p| (p.clone(), output_dir.join(&p.path)))
        .filter(|(_, dest)| !dest.is_file())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bundled_manifest_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/system_prompts.json");
        let prompts = load_manifest(&path).unwrap();
        assert!(prompts.len() >= 10);
        assert!(prompts.iter().any(|p| p.language == Language::DE));
        assert!(prompts.iter().all(|p| p.voice.is_some()));
    }

    #[test]
    fn manifest_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(
            &path,
            r#"[{"path": "../evil.wav", "text": "Hi", "language": "en"}]"#,
        )
        .unwrap();
        let err = load_manifest(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);

        std::fs::write(&path, r#"[{"path": "system/ok.wav", "text": "Hi", "language": "en"}]"#).unwrap();
        let prompts = load_manifest(&path).unwrap();
        assert_eq!(prompts[0].voice, None);
    }

    #[test]
    fn pending_skips_existing_and_unsupported() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("system")).unwrap();
        std::fs::write(dir.path().join("system/a.wav"), b"x").unwrap();

        let prompts = vec![
            FixedPrompt::new("system/a.wav", "A", Language::EN, None),
            FixedPrompt::new("system/b.wav", "B", Language::EN, None),
            FixedPrompt::new("system/c.wav", "C", Language::parse("fr").unwrap(), None),
        ];
        let todo = pending(&prompts, dir.path(), &[Language::EN, Language::DE]);
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].1, dir.path().join("system/b.wav"));
    }
}
