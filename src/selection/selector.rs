//! Seeded per-task selection of backend family and variant.
//!
//! Every call builds its own `ChaCha8Rng` from the task's content
//! identifier, so the choice depends only on (identifier, category,
//! language) and never on execution order or on other tasks.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::{BackendKind, PipelineConfig, SelectionConfig};
use crate::error::{PipelineError, Result};
use crate::types::{ContentId, Language};

/// Rendering parameters chosen for one task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    /// Backend family.
    pub backend: BackendKind,
    /// Voice model (local) or accent host (remote).
    pub variant: String,
}

/// Immutable selection policy.
#[derive(Debug, Clone)]
pub struct Selector {
    policy: SelectionConfig,
    local: BTreeMap<Language, Vec<String>>,
    remote: BTreeMap<Language, Vec<String>>,
}

impl Selector {
    /// Builds a selector from the config's policy table and variant lists.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            policy: config.selection.clone(),
            local: config.local.voices.clone(),
            remote: config.remote.variants.clone(),
        }
    }

    /// Resolves the backend family for a category and language.
    ///
    /// Forced backend, then category override, then language table, then default.
    pub fn backend_for(&self, category: &str, language: Language) -> BackendKind {
        if let Some(forced) = self.policy.forced_backend {
            return forced;
        }
        if let Some(backend) = self
            .policy
            .categories
            .get(category)
            .and_then(|rule| rule.backend)
        {
            return backend;
        }
        self.policy
            .languages
            .get(&language)
            .copied()
            .unwrap_or(self.policy.default_backend)
    }

    /// Returns the candidate variants for a category and language on `backend`.
    ///
    /// A category override's variants only apply when the override does not
    /// pin a different backend than the one in use.
    pub fn candidates(&self, category: &str, language: Language, backend: BackendKind) -> &[String] {
        if let Some(rule) = self.policy.categories.get(category) {
            let applies = rule.backend.map_or(true, |b| b == backend);
            if applies && !rule.variants.is_empty() {
                return &rule.variants;
            }
        }

        let table = match backend {
            BackendKind::Local => &self.local,
            BackendKind::Remote => &self.remote,
        };
        table.get(&language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chooses backend and variant for a task.
    ///
    /// Fails with `CONFIG_INVALID` when the chosen backend has no candidate
    /// for the language; callers check this before any task is submitted.
    pub fn select(&self, identifier: &ContentId, category: &str, language: Language) -> Result<Selection> {
        let backend = self.backend_for(category, language);
        let candidates = self.candidates(category, language, backend);

        let mut rng = ChaCha8Rng::seed_from_u64(identifier.seed());
        let variant = candidates.choose(&mut rng).ok_or_else(|| {
            PipelineError::config_invalid(format!(
                "no {} variants configured for language {} (category {})",
                backend, language, category
            ))
        })?;

        Ok(Selection {
            backend,
            variant: variant.clone(),
        })
    }

    /// Like [`select`](Self::select), but honours a voice pinned by the caller.
    ///
    /// A pinned voice is a local model, so it is used unless the run is
    /// forced onto the remote family.
    pub fn select_pinned(
        &self,
        identifier: &ContentId,
        category: &str,
        language: Language,
        voice: Option<&str>,
    ) -> Result<Selection> {
        if let Some(voice) = voice {
            if self.policy.forced_backend != Some(BackendKind::Remote) {
                return Ok(Selection {
                    backend: BackendKind::Local,
                    variant: voice.to_string(),
                });
            }
        }
        self.select(identifier, category, language)
    }
}
