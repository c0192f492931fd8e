//! voicepack: sync a text corpus with a cache of rendered speech.
//!
//! Loads config (file, then `VOICEPACK_*` environment, then flags), runs one
//! synchronization or a format sweep, prints the summary and optionally
//! writes it as JSON.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voicepack::backend::RenderAdapter;
use voicepack::cli::Cli;
use voicepack::config::PipelineConfig;
use voicepack::pipeline::{default_assigner, Pipeline, SyncOptions};

fn main() {
    let cli = Cli::parse_args();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let adapter = RenderAdapter::from_config(&config).context("cannot set up render backends")?;
    let pipeline = Pipeline::new(&config, &adapter);

    if cli.validate_only {
        let report = pipeline.sweep(cli.dry_run);
        if let Some(path) = &cli.report {
            write_report(path, &report)?;
        }
        return Ok(());
    }

    let abort = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(Arc::clone(&abort));

    let options = SyncOptions {
        dry_run: cli.dry_run,
        skip_assembly: cli.skip_assembly,
    };
    let mut assigner = default_assigner(&config, cli.interactive);
    let report = pipeline
        .run(options, &abort, &mut assigner)
        .context("synchronization failed")?;

    report.log_summary();
    if let Some(path) = &cli.report {
        write_report(path, &report)?;
    }
    if report.interrupted {
        warn!("Interrupted; run again to finish");
    }
    Ok(())
}

/// Builds the effective config: defaults, file, environment, flags.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::new(),
    };
    config.apply_env();
    cli.apply(&mut config);

    config.ensure_valid()?;

    info!(
        "Corpus {}, cache {}, output {}",
        config.effective_source_dir().display(),
        config.effective_cache_dir().display(),
        config.effective_output_dir().display()
    );
    Ok(config)
}

/// Sets `abort` on the first Ctrl-C; in-flight renders finish. A second
/// Ctrl-C exits at once.
fn watch_ctrl_c(abort: Arc<AtomicBool>) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("Interrupt received; finishing current work (Ctrl-C again to quit now)");
                abort.store(true, Ordering::SeqCst);

                if tokio::signal::ctrl_c().await.is_ok() {
                    error!("Second interrupt; exiting");
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        warn!("Ctrl-C handling unavailable: {}", e);
    }
}

fn write_report(path: &Path, report: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("cannot write report {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}
