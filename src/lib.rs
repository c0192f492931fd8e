//! voicepack: content-addressable speech asset pipeline.
//!
//! Synchronizes a corpus of text lines with a cache of rendered speech
//! artifacts, regenerating only what is missing, and assembles the cache
//! into per-persona directories with shuffled playlists.
//!
//! # Modules
//!
//! - [`types`]: Core data types (Language, ContentId, ArtifactName, CorpusLine)
//! - [`config`]: Runtime configuration (PipelineConfig, BackendKind)
//! - [`error`]: Error types and codes (PipelineError, ErrorCode, RenderFailure)
//! - [`corpus`], [`cache`], [`selection`], [`backend`], [`executor`],
//!   [`audio`], [`persona`], [`prompts`]: the pipeline stages
//! - [`pipeline`]: one synchronization run
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::atomic::AtomicBool;
//! use voicepack::backend::RenderAdapter;
//! use voicepack::config::PipelineConfig;
//! use voicepack::pipeline::{default_assigner, Pipeline, SyncOptions};
//!
//! let config = PipelineConfig::from_env();
//! let adapter = RenderAdapter::from_config(&config)?;
//! let pipeline = Pipeline::new(&config, &adapter);
//! let report = pipeline.run(
//!     SyncOptions::default(),
//!     &AtomicBool::new(false),
//!     &mut default_assigner(&config, false),
//! )?;
//! report.log_summary();
//! ```

pub mod audio;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod executor;
pub mod persona;
pub mod pipeline;
pub mod prompts;
pub mod selection;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::{BackendKind, PipelineConfig};
pub use error::{ErrorCode, PipelineError, Result};
pub use types::{ArtifactName, ContentId, CorpusLine, Language};
