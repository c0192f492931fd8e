//! Command-line interface.
//!
//! Flags override the config file and `VOICEPACK_*` environment.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{BackendKind, PipelineConfig};

/// Backend family forced onto every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Local piper synthesis
    Local,
    /// Remote HTTP synthesis
    Remote,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => BackendKind::Local,
            BackendArg::Remote => BackendKind::Remote,
        }
    }
}

/// An explicit `SLOT=CATEGORY` persona assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaArg {
    /// Slot number, from 1.
    pub slot: usize,
    /// Category name.
    pub category: String,
}

fn parse_persona(s: &str) -> Result<PersonaArg, String> {
    let (slot, category) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=CATEGORY, got {:?}", s))?;
    let slot: usize = slot
        .trim()
        .parse()
        .map_err(|_| format!("slot must be a number, got {:?}", slot))?;
    if slot == 0 {
        return Err("slots are numbered from 1".to_string());
    }
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("empty category for slot {}", slot));
    }
    Ok(PersonaArg {
        slot,
        category: category.to_string(),
    })
}

/// voicepack: sync a text corpus with a cache of rendered speech and build persona bundles
#[derive(Parser, Debug, Default)]
#[command(name = "voicepack")]
#[command(about = "Content-addressable speech asset pipeline")]
#[command(version)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Corpus directory of <category>[_<lang>].txt files
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Artifact cache directory
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Output tree root (persona dirs, playlists, prompts)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Local backend worker count
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=256))]
    pub local_workers: Option<u32>,

    /// Remote backend worker count
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub remote_workers: Option<u32>,

    /// Force every task onto one backend family
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Assign a category to a persona slot (repeatable)
    #[arg(short, long = "persona", value_name = "SLOT=CATEGORY", value_parser = parse_persona)]
    pub personas: Vec<PersonaArg>,

    /// Prompt for slots without an assignment
    #[arg(short, long)]
    pub interactive: bool,

    /// Stop after the cache is synchronized
    #[arg(long)]
    pub skip_assembly: bool,

    /// Do not render fixed prompts and time announcements
    #[arg(long)]
    pub skip_prompts: bool,

    /// Only run the format sweep over cache and output
    #[arg(long)]
    pub validate_only: bool,

    /// Plan and report without rendering, deleting or copying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write the run summary as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Applies command-line overrides on top of a config.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(ref path) = self.source {
            config.source_dir = Some(path.clone());
        }
        if let Some(ref path) = self.cache {
            config.cache_dir = Some(path.clone());
        }
        if let Some(ref path) = self.output {
            config.output_dir = Some(path.clone());
        }
        if let Some(workers) = self.local_workers {
            config.local.workers = Some(workers as usize);
        }
        if let Some(workers) = self.remote_workers {
            config.remote.workers = workers as usize;
        }
        if let Some(backend) = self.backend {
            config.selection.forced_backend = Some(backend.into());
        }
        for persona in &self.personas {
            config
                .personas
                .defaults
                .insert(persona.slot, persona.category.clone());
        }
        if self.skip_prompts {
            config.prompts.manifest = None;
            config.prompts.time_announcements = false;
        }
    }

    /// Returns the log filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
