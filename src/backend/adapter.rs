//! Dispatch to a backend family plus mandatory normalization.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::{AudioFormat, AutoNormalizer, BuiltinNormalizer, FfmpegNormalizer, Normalizer};
use crate::config::{BackendKind, NormalizerConfig, NormalizerKind, PipelineConfig};
use crate::error::{RenderFailure, Result};
use crate::selection::Selection;
use crate::types::Language;

use super::local::PiperBackend;
use super::remote::HttpBackend;
use super::RenderBackend;

/// Builds the normalizer named by the config.
pub fn build_normalizer(config: &NormalizerConfig) -> Arc<dyn Normalizer> {
    match config.kind {
        NormalizerKind::Auto => Arc::new(AutoNormalizer::new(Some(FfmpegNormalizer::new(
            config.ffmpeg.clone(),
        )))),
        NormalizerKind::Builtin => Arc::new(BuiltinNormalizer),
        NormalizerKind::Ffmpeg => Arc::new(FfmpegNormalizer::new(config.ffmpeg.clone())),
    }
}

/// Both backend families behind one `render` call.
///
/// Output is always normalized to the target format before it is returned.
#[derive(Clone)]
pub struct RenderAdapter {
    local: Arc<dyn RenderBackend>,
    remote: Arc<dyn RenderBackend>,
    normalizer: Arc<dyn Normalizer>,
    ffmpeg: Option<FfmpegNormalizer>,
    format: AudioFormat,
}

impl RenderAdapter {
    /// Creates an adapter from explicit parts.
    pub fn new(
        local: Arc<dyn RenderBackend>,
        remote: Arc<dyn RenderBackend>,
        normalizer: Arc<dyn Normalizer>,
        format: AudioFormat,
    ) -> Self {
        Self {
            local,
            remote,
            normalizer,
            ffmpeg: None,
            format,
        }
    }

    /// Creates the production adapter: piper, HTTP and the configured normalizer.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let local = PiperBackend::new(config.local.binary.clone(), config.effective_voices_dir())
            .with_timeout(Duration::from_secs(config.local.timeout_secs));
        let remote = HttpBackend::new(&config.remote)?;
        let mut adapter = Self::new(
            Arc::new(local),
            Arc::new(remote),
            build_normalizer(&config.normalizer),
            config.audio,
        );
        if config.normalizer.kind != NormalizerKind::Builtin {
            adapter.ffmpeg = Some(FfmpegNormalizer::new(config.normalizer.ffmpeg.clone()));
        }
        Ok(adapter)
    }

    /// Returns the backend serving a family.
    pub fn backend(&self, kind: BackendKind) -> &dyn RenderBackend {
        match kind {
            BackendKind::Local => self.local.as_ref(),
            BackendKind::Remote => self.remote.as_ref(),
        }
    }

    /// Returns the shared normalizer (also used for repairs).
    pub fn normalizer(&self) -> Arc<dyn Normalizer> {
        Arc::clone(&self.normalizer)
    }

    /// Returns the target format.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Checks every backend family and variant a run is about to use.
    ///
    /// Remote payloads are not WAV, so a run with remote work also needs a
    /// runnable ffmpeg unless the builtin normalizer was chosen explicitly.
    pub fn check_available(&self, needed: &BTreeMap<BackendKind, BTreeSet<String>>) -> Result<()> {
        for (kind, variants) in needed {
            if variants.is_empty() {
                continue;
            }
            let variants: Vec<String> = variants.iter().cloned().collect();
            self.backend(*kind).check_available(&variants)?;
            info!("{} backend ready ({} variants)", kind, variants.len());
        }

        let remote_needed = needed
            .get(&BackendKind::Remote)
            .is_some_and(|v| !v.is_empty());
        if remote_needed {
            match &self.ffmpeg {
                Some(ffmpeg) => ffmpeg.check_available()?,
                None => warn!(
                    "Remote backend in use with the {} normalizer; non-WAV payloads will fail",
                    self.normalizer.name()
                ),
            }
        }

        Ok(())
    }

    /// Renders text with a selection and normalizes the result.
    pub fn render(
        &self,
        text: &str,
        language: Language,
        selection: &Selection,
    ) -> std::result::Result<Vec<u8>, RenderFailure> {
        let raw = self
            .backend(selection.backend)
            .render(text, language, &selection.variant)?;
        self.normalizer.normalize(&raw, &self.format)
    }
}
