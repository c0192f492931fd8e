//! Pipeline configuration module.
//!
//! Contains the immutable run configuration for voicepack: directory
//! layout, target audio format, backend settings, selection policy and
//! persona layout. A config is built once (defaults, then an optional JSON
//! file, then `VOICEPACK_*` environment variables, then command-line flags)
//! and passed by reference into every component.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::types::Language;

/// Render backend family.
///
/// The two families have independent worker pools and candidate variant lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local process-based synthesis (piper).
    #[default]
    Local,

    /// Remote fetch-based synthesis over HTTP.
    Remote,
}

impl BackendKind {
    /// Returns the string representation of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "piper" => Some(BackendKind::Local),
            "remote" | "http" => Some(BackendKind::Remote),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Re-encoder used to bring audio to the target PCM format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerKind {
    /// In-process for WAV input, ffmpeg for everything else.
    #[default]
    Auto,

    /// In-process only; non-WAV payloads fail.
    Builtin,

    /// Always shell out to ffmpeg.
    Ffmpeg,
}

impl NormalizerKind {
    /// Returns the string representation of the normalizer.
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizerKind::Auto => "auto",
            NormalizerKind::Builtin => "builtin",
            NormalizerKind::Ffmpeg => "ffmpeg",
        }
    }

    /// Parses a normalizer from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(NormalizerKind::Auto),
            "builtin" => Some(NormalizerKind::Builtin),
            "ffmpeg" => Some(NormalizerKind::Ffmpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for NormalizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local (piper) backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalBackendConfig {
    /// Path or bare name (looked up on PATH) of the piper binary.
    pub binary: PathBuf,

    /// Directory holding the `.onnx` voice models.
    /// If None, uses the platform-specific default data location.
    pub voices_dir: Option<PathBuf>,

    /// Candidate voice model file names per language.
    pub voices: BTreeMap<Language, Vec<String>>,

    /// Worker count. If None, uses the host's available parallelism.
    pub workers: Option<usize>,

    /// Seconds a single piper run may take before it is killed.
    pub timeout_secs: u64,
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        let mut voices = BTreeMap::new();
        voices.insert(
            Language::EN,
            vec![
                "en_GB-cori-high.onnx".to_string(),
                "en_GB-alan-medium.onnx".to_string(),
                "en_GB-alba-medium.onnx".to_string(),
                "en_GB-aru-medium.onnx".to_string(),
                "en_GB-jenny_dioco-medium.onnx".to_string(),
            ],
        );
        voices.insert(Language::DE, vec!["de_DE-thorsten-high.onnx".to_string()]);

        Self {
            binary: PathBuf::from("piper"),
            voices_dir: None,
            voices,
            workers: None,
            timeout_secs: 120,
        }
    }
}

/// Remote (HTTP) backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteBackendConfig {
    /// URL template; `{variant}` is replaced by the chosen variant.
    pub endpoint: String,

    /// Candidate variants (accent hosts) per language.
    pub variants: BTreeMap<Language, Vec<String>>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Worker count. Kept small to stay below upstream throttling.
    pub workers: usize,
}

impl Default for RemoteBackendConfig {
    fn default() -> Self {
        let mut variants = BTreeMap::new();
        variants.insert(
            Language::EN,
            ["com", "co.uk", "com.au", "ca", "co.in", "ie", "co.za"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        variants.insert(Language::DE, vec!["de".to_string()]);

        Self {
            endpoint: "https://translate.google.{variant}/translate_tts".to_string(),
            variants,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
                .to_string(),
            workers: 4,
        }
    }
}

/// Per-category selection override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryOverride {
    /// Forces the category onto one backend family.
    pub backend: Option<BackendKind>,

    /// Replaces the candidate variant list. Empty means no override.
    pub variants: Vec<String>,
}

/// Backend and variant selection policy.
///
/// Precedence, highest first: forced backend (command line), category
/// override, language table, `default_backend`. Variants come from the
/// category override when it lists any, else from the chosen backend's
/// per-language list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Backend used when neither a category nor a language entry applies.
    pub default_backend: BackendKind,

    /// Backend per language.
    pub languages: BTreeMap<Language, BackendKind>,

    /// Overrides keyed by category name as it appears in the corpus file name.
    pub categories: BTreeMap<String, CategoryOverride>,

    /// Forces every task onto one family. Set from the command line.
    #[serde(skip)]
    pub forced_backend: Option<BackendKind>,
}

/// Persona slot layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Number of persona slots, numbered from 1.
    pub slots: usize,

    /// Version tag in playlist file names.
    pub version: String,

    /// Preferred category per slot. Matched exactly, then as a substring.
    pub defaults: BTreeMap<usize, String>,

    /// Seed for playlist shuffling. If None, shuffles from entropy.
    pub shuffle_seed: Option<u64>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert(1, "Badran".to_string());
        defaults.insert(5, "Fortune".to_string());

        Self {
            slots: 5,
            version: "v3".to_string(),
            defaults,
            shuffle_seed: None,
        }
    }
}

/// Normalizer selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Which re-encoder to use.
    pub kind: NormalizerKind,

    /// Path or bare name of the ffmpeg binary.
    pub ffmpeg: PathBuf,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            kind: NormalizerKind::Auto,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Fixed prompt generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// JSON manifest of fixed system prompts. If None, no system prompts.
    pub manifest: Option<PathBuf>,

    /// Render the built-in time announcement table.
    pub time_announcements: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            time_announcements: true,
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory of `<category>[_<lang>].txt` corpus files.
    pub source_dir: Option<PathBuf>,

    /// Content-addressable artifact cache.
    pub cache_dir: Option<PathBuf>,

    /// Device-ready output tree (persona dirs, playlists, prompts).
    pub output_dir: Option<PathBuf>,

    /// Target PCM format.
    pub audio: AudioFormat,

    /// Supported languages. The first entry is the primary language.
    pub languages: Vec<Language>,

    /// Local backend settings.
    pub local: LocalBackendConfig,

    /// Remote backend settings.
    pub remote: RemoteBackendConfig,

    /// Backend/variant selection policy.
    pub selection: SelectionConfig,

    /// Persona slot layout.
    pub personas: PersonaConfig,

    /// Re-encoder selection.
    pub normalizer: NormalizerConfig,

    /// Fixed prompts.
    pub prompts: PromptConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            cache_dir: None,
            output_dir: None,
            audio: AudioFormat::default(),
            languages: vec![Language::EN, Language::DE],
            local: LocalBackendConfig::default(),
            remote: RemoteBackendConfig::default(),
            selection: SelectionConfig::default(),
            personas: PersonaConfig::default(),
            normalizer: NormalizerConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new PipelineConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a config from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::with_source(
                ErrorCode::ConfigInvalid,
                format!("cannot read config file {}", path.display()),
                e,
            )
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::with_source(
                ErrorCode::ConfigInvalid,
                format!("cannot parse config file {}: {}", path.display(), e),
                e,
            )
        })
    }

    /// Creates a PipelineConfig from environment variables.
    ///
    /// Equivalent to `PipelineConfig::default()` followed by [`apply_env`](Self::apply_env).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlays environment variables onto this config.
    ///
    /// Reads the following environment variables:
    /// - `VOICEPACK_SOURCE_DIR` - Corpus directory
    /// - `VOICEPACK_CACHE_DIR` - Artifact cache directory
    /// - `VOICEPACK_OUTPUT_DIR` - Output tree root
    /// - `VOICEPACK_LANGUAGES` - Comma-separated language codes, primary first
    /// - `VOICEPACK_SAMPLE_RATE` - Target sample rate in Hz
    /// - `VOICEPACK_PIPER_BIN` - Piper binary
    /// - `VOICEPACK_VOICES_DIR` - Piper voice model directory
    /// - `VOICEPACK_LOCAL_WORKERS` - Local worker count
    /// - `VOICEPACK_LOCAL_TIMEOUT` - Seconds before a piper run is killed
    /// - `VOICEPACK_REMOTE_WORKERS` - Remote worker count
    /// - `VOICEPACK_NORMALIZER` - auto, builtin or ffmpeg
    /// - `VOICEPACK_FFMPEG` - ffmpeg binary
    ///
    /// Unset or unparsable variables leave the current value in place.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlays variables from an arbitrary lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("VOICEPACK_SOURCE_DIR") {
            self.source_dir = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("VOICEPACK_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("VOICEPACK_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(path));
        }

        if let Some(list) = lookup("VOICEPACK_LANGUAGES") {
            let languages: Option<Vec<Language>> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Language::parse)
                .collect();
            if let Some(languages) = languages.filter(|l| !l.is_empty()) {
                self.languages = languages;
            }
        }

        if let Some(rate) = lookup("VOICEPACK_SAMPLE_RATE").and_then(|s| s.parse::<u32>().ok()) {
            if rate > 0 {
                self.audio.sample_rate = rate;
            }
        }

        if let Some(path) = lookup("VOICEPACK_PIPER_BIN") {
            self.local.binary = PathBuf::from(path);
        }

        if let Some(path) = lookup("VOICEPACK_VOICES_DIR") {
            self.local.voices_dir = Some(PathBuf::from(path));
        }

        if let Some(workers) = lookup("VOICEPACK_LOCAL_WORKERS").and_then(|s| s.parse::<usize>().ok()) {
            if workers > 0 {
                self.local.workers = Some(workers);
            }
        }

        if let Some(secs) = lookup("VOICEPACK_LOCAL_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            if secs > 0 {
                self.local.timeout_secs = secs;
            }
        }

        if let Some(workers) = lookup("VOICEPACK_REMOTE_WORKERS").and_then(|s| s.parse::<usize>().ok()) {
            if workers > 0 {
                self.remote.workers = workers;
            }
        }

        if let Some(kind) = lookup("VOICEPACK_NORMALIZER").and_then(|s| NormalizerKind::parse(&s)) {
            self.normalizer.kind = kind;
        }

        if let Some(path) = lookup("VOICEPACK_FFMPEG") {
            self.normalizer.ffmpeg = PathBuf::from(path);
        }
    }

    /// Returns the effective corpus directory, using platform defaults if not specified.
    pub fn effective_source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| default_data_path("corpus", "./corpus"))
    }

    /// Returns the effective cache directory, using platform defaults if not specified.
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_path)
    }

    /// Returns the effective output directory, using platform defaults if not specified.
    pub fn effective_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_data_path("output", "./output"))
    }

    /// Returns the effective voice model directory, using platform defaults if not specified.
    pub fn effective_voices_dir(&self) -> PathBuf {
        self.local
            .voices_dir
            .clone()
            .unwrap_or_else(|| default_data_path("voices", "./voices"))
    }

    /// Returns the effective local worker count.
    pub fn effective_local_workers(&self) -> usize {
        self.local.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.languages.is_empty() {
            return Some("languages must not be empty".to_string());
        }

        if self.audio.sample_rate == 0 {
            return Some("audio.sample_rate must be > 0".to_string());
        }

        if let Some(workers) = self.local.workers {
            if workers == 0 {
                return Some("local.workers must be > 0".to_string());
            }
            if workers > 256 {
                return Some(format!("local.workers too high: {} (max 256)", workers));
            }
        }

        if self.local.timeout_secs == 0 {
            return Some("local.timeout_secs must be > 0".to_string());
        }

        if self.remote.workers == 0 {
            return Some("remote.workers must be > 0".to_string());
        }

        if self.remote.timeout_secs == 0 {
            return Some("remote.timeout_secs must be > 0".to_string());
        }

        if !self.remote.endpoint.contains("{variant}") {
            return Some("remote.endpoint must contain {variant}".to_string());
        }

        if self.personas.slots == 0 || self.personas.slots > 99 {
            return Some(format!(
                "personas.slots must be 1-99, got {}",
                self.personas.slots
            ));
        }

        let version = &self.personas.version;
        if version.is_empty()
            || !version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Some(format!("personas.version is not file-name safe: {:?}", version));
        }

        if let Some(slot) = self
            .personas
            .defaults
            .keys()
            .find(|s| **s == 0 || **s > self.personas.slots)
        {
            return Some(format!("personas.defaults has out-of-range slot {}", slot));
        }

        for (category, rule) in &self.selection.categories {
            if rule.backend.is_none() && rule.variants.is_empty() {
                return Some(format!(
                    "selection.categories.{} overrides neither backend nor variants",
                    category
                ));
            }
        }

        None
    }

    /// Like [`validate`](Self::validate) but as a `CONFIG_INVALID` error.
    pub fn ensure_valid(&self) -> Result<()> {
        match self.validate() {
            Some(problem) => Err(PipelineError::config_invalid(problem)),
            None => Ok(()),
        }
    }
}

/// Returns the platform-specific default artifact cache path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/voicepack/artifacts
/// - Linux: ~/.cache/voicepack/artifacts
/// - Windows: C:\Users\<user>\AppData\Local\voicepack\cache\artifacts
fn default_cache_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "voicepack") {
        proj_dirs.cache_dir().join("artifacts")
    } else {
        // Fallback to current directory
        PathBuf::from("./cache")
    }
}

/// Returns a platform-specific data subdirectory (corpus, output, voices).
fn default_data_path(name: &str, fallback: &str) -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "voicepack") {
        proj_dirs.data_dir().join(name)
    } else {
        PathBuf::from(fallback)
    }
}
