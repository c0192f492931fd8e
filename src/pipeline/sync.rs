//! One synchronization run.
//!
//! Scan, plan, select and render, then evict, sweep and assemble. Only a
//! missing corpus directory, an invalid selection policy or a missing
//! backend abort the run; everything else is counted in the [`SyncReport`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::{FormatGuard, RepairOutcome, SweepReport};
use crate::backend::RenderAdapter;
use crate::cache::{evict_stale, plan, ArtifactCache, JanitorReport};
use crate::config::{BackendKind, PipelineConfig};
use crate::corpus::{scan_corpus, ScanIssue};
use crate::error::{PipelineError, Result};
use crate::executor::{Executor, Job, ProgressReporter, TaskOutcome};
use crate::persona::{
    AssemblyReport, CategoryAssigner, ChainAssigner, DefaultTableAssigner, InteractiveAssigner,
    PersonaAssembler, PositionalAssigner,
};
use crate::prompts::{self, FixedPrompt};
use crate::selection::{Selection, Selector};
use crate::types::Language;

/// Switches for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Plan and report only; nothing is rendered, deleted or written.
    pub dry_run: bool,
    /// Stop before persona assembly.
    pub skip_assembly: bool,
}

/// Counters and sub-reports of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Non-blank lines read from the corpus.
    pub lines: usize,
    /// Corpus files that were skipped.
    pub scan_issues: Vec<ScanIssue>,
    /// Lines whose artifact already existed.
    pub cached: usize,
    /// Lines sharing an artifact with an earlier line.
    pub duplicates: usize,
    /// Render tasks for missing artifacts.
    pub planned: usize,
    /// Missing fixed prompts.
    pub prompts_planned: usize,
    /// Jobs stored as rendered.
    pub rendered: usize,
    /// Jobs stored after a re-encode.
    pub repaired: usize,
    /// Jobs that failed and stay missing until the next run.
    pub failed: usize,
    /// Jobs not started because of an interrupt.
    pub skipped: usize,
    /// Label and reason of every failed job.
    pub failures: Vec<(String, String)>,
    /// True if an interrupt cut the run short.
    pub interrupted: bool,
    /// Stale artifact eviction; `None` if it did not run.
    pub janitor: Option<JanitorReport>,
    /// Format sweep over cache and output; `None` if it did not run.
    pub sweep: Option<SweepReport>,
    /// Persona slots; `None` if assembly did not run.
    pub assembly: Option<AssemblyReport>,
}

impl SyncReport {
    /// Evicted artifact count.
    pub fn evicted(&self) -> usize {
        self.janitor.as_ref().map_or(0, |j| j.evicted.len())
    }

    /// Logs the end-of-run summary.
    pub fn log_summary(&self) {
        info!(
            "Summary: {} rendered, {} fixed, {} failed, {} skipped, {} evicted",
            self.rendered,
            self.repaired + self.sweep.as_ref().map_or(0, |s| s.repaired),
            self.failed,
            self.skipped,
            self.evicted()
        );
        if let Some(sweep) = &self.sweep {
            info!(
                "Sweep: {} checked, {} repaired, {} deleted, {} would repair",
                sweep.checked,
                sweep.repaired,
                sweep.removed,
                sweep.would_repair.len()
            );
        }
        if let Some(assembly) = &self.assembly {
            info!(
                "Personas: {} assembled, {} skipped",
                assembly.assembled(),
                assembly.skipped()
            );
        }
        for (label, reason) in &self.failures {
            warn!("Failed: {} ({})", label, reason);
        }
    }
}

/// A resolved unit of rendering work: a corpus line or a fixed prompt.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Text to speak.
    pub text: String,
    /// Language of the text.
    pub language: Language,
    /// Backend and variant.
    pub selection: Selection,
    /// Final path of the validated file.
    pub destination: PathBuf,
}

/// Builds the category assigner for a run.
///
/// Default table (including `--persona` entries), then the console when
/// `interactive`, then the sorted category list by position.
pub fn default_assigner(config: &PipelineConfig, interactive: bool) -> ChainAssigner {
    let mut chain = ChainAssigner::new().then(DefaultTableAssigner::new(config.personas.defaults.clone()));
    if interactive {
        chain = chain.then(InteractiveAssigner::new(
            std::io::stdin().lock(),
            std::io::stdout(),
        ));
    }
    chain.then(PositionalAssigner)
}

/// Components of a run, built once from the config.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    adapter: &'a RenderAdapter,
    guard: FormatGuard,
    selector: Selector,
    executor: Executor,
    cache: ArtifactCache,
    output_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Wires the pipeline; the adapter's normalizer is also used for repairs.
    pub fn new(config: &'a PipelineConfig, adapter: &'a RenderAdapter) -> Self {
        Self {
            config,
            adapter,
            guard: FormatGuard::new(config.audio, adapter.normalizer()),
            selector: Selector::new(config),
            executor: Executor::from_config(config),
            cache: ArtifactCache::new(config.effective_cache_dir()),
            output_dir: config.effective_output_dir(),
        }
    }

    /// Returns the artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Runs the format sweep over the cache and output trees only.
    pub fn sweep(&self, dry_run: bool) -> SweepReport {
        let roots = [self.cache.dir().to_path_buf(), self.output_dir.clone()];
        let report = self.guard.sweep(&roots, dry_run);
        info!(
            "Swept {} files: {} valid, {} repaired, {} deleted",
            report.checked, report.valid, report.repaired, report.removed
        );
        report
    }

    /// Runs a full synchronization.
    ///
    /// `abort` is polled by the executor and again between phases and persona
    /// slots; once set, no new work starts and the run returns with
    /// `interrupted` set.
    pub fn run(
        &self,
        options: SyncOptions,
        abort: &AtomicBool,
        assigner: &mut dyn CategoryAssigner,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let source_dir = self.config.effective_source_dir();
        info!("Scanning {}", source_dir.display());
        let scan = scan_corpus(&source_dir, &self.config.languages)?;
        report.lines = scan.lines.len();
        report.scan_issues = scan.issues.clone();

        let plan = plan(&scan.lines, &self.cache);
        report.cached = plan.cached;
        report.duplicates = plan.duplicates;
        report.planned = plan.tasks.len();
        info!(
            "{} lines: {} cached, {} to render, {} duplicates",
            scan.lines.len(),
            plan.cached,
            plan.tasks.len(),
            plan.duplicates
        );

        let mut jobs = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            let line = &task.line;
            let selection = self
                .selector
                .select(&task.identifier, &line.category, line.language)?;
            jobs.push(Job {
                family: selection.backend,
                label: task.label(),
                payload: RenderJob {
                    text: line.text.clone(),
                    language: line.language,
                    selection,
                    destination: task.destination.clone(),
                },
            });
        }

        let prompt_jobs = self.prompt_jobs()?;
        report.prompts_planned = prompt_jobs.len();
        jobs.extend(prompt_jobs);

        if options.dry_run {
            for job in &jobs {
                debug!(
                    "Would render {} via {} {}",
                    job.label, job.payload.selection.backend, job.payload.selection.variant
                );
            }
        } else if !jobs.is_empty() {
            self.adapter.check_available(&needed_variants(&jobs))?;
            self.cache.ensure_dir()?;
            self.execute(jobs, abort, &mut report);
        }

        if interrupted(abort, &mut report) {
            return Ok(report);
        }

        if scan.is_complete() {
            report.janitor = Some(evict_stale(&self.cache, &plan.live, options.dry_run)?);
        } else {
            warn!("Some corpus files could not be read; skipping eviction");
        }
        if interrupted(abort, &mut report) {
            return Ok(report);
        }

        report.sweep = Some(self.sweep(options.dry_run));
        if interrupted(abort, &mut report) {
            return Ok(report);
        }

        if !options.skip_assembly {
            let assembler =
                PersonaAssembler::new(&self.cache, &self.output_dir, self.config.personas.clone())
                    .with_abort(abort);
            let assembly = assembler.assemble(&scan.category_names(), assigner, options.dry_run)?;
            if assembly.interrupted {
                warn!("Run interrupted during persona assembly");
                report.interrupted = true;
            }
            report.assembly = Some(assembly);
        }

        Ok(report)
    }

    /// Resolves the fixed prompts whose file is missing.
    fn prompt_jobs(&self) -> Result<Vec<Job<RenderJob>>> {
        let mut fixed: Vec<FixedPrompt> = Vec::new();
        if let Some(manifest) = &self.config.prompts.manifest {
            fixed.extend(prompts::load_manifest(manifest)?);
        }
        if self.config.prompts.time_announcements {
            fixed.extend(prompts::time_announcements(&self.config.languages));
        }

        let mut jobs = Vec::new();
        for (prompt, destination) in prompts::pending(&fixed, &self.output_dir, &self.config.languages) {
            let group = prompt_group(&prompt.path);
            let selection = self.selector.select_pinned(
                &prompt.identifier(),
                &group,
                prompt.language,
                prompt.voice.as_deref(),
            )?;
            jobs.push(Job {
                family: selection.backend,
                label: prompt.path.display().to_string(),
                payload: RenderJob {
                    text: prompt.text,
                    language: prompt.language,
                    selection,
                    destination,
                },
            });
        }

        if !jobs.is_empty() {
            info!("{} fixed prompts missing", jobs.len());
        }
        Ok(jobs)
    }

    fn execute(&self, jobs: Vec<Job<RenderJob>>, abort: &AtomicBool, report: &mut SyncReport) {
        let (events, reporter) = ProgressReporter::spawn();
        let summary = self
            .executor
            .run(jobs, abort, &events, |job| self.render_one(job));
        drop(events);
        let tally = reporter.finish();

        report.rendered = summary.count(|o| *o == TaskOutcome::Rendered);
        report.repaired = summary.count(|o| *o == TaskOutcome::Repaired);
        report.failed = summary.count(|o| matches!(o, TaskOutcome::Failed(_)));
        report.skipped = summary.skipped;
        report.failures = tally.failures;
    }

    /// Renders one job and installs it. Never panics and never aborts the batch.
    fn render_one(&self, job: &RenderJob) -> TaskOutcome {
        let bytes = match self.adapter.render(&job.text, job.language, &job.selection) {
            Ok(bytes) => bytes,
            Err(failure) => return TaskOutcome::Failed(failure.to_string()),
        };

        if let Err(e) = ensure_parent(&job.destination) {
            return TaskOutcome::Failed(e.message);
        }

        match self.guard.install(&bytes, &job.destination) {
            Ok(RepairOutcome::Repaired) => TaskOutcome::Repaired,
            Ok(_) => TaskOutcome::Rendered,
            Err(e) => TaskOutcome::Failed(e.message),
        }
    }
}

/// Marks the report interrupted if `abort` is set.
fn interrupted(abort: &AtomicBool, report: &mut SyncReport) -> bool {
    if abort.load(Ordering::SeqCst) {
        warn!("Run interrupted; cache keeps everything rendered so far");
        report.interrupted = true;
    }
    report.interrupted
}

/// Collects the variants each backend family must provide for `jobs`.
fn needed_variants(jobs: &[Job<RenderJob>]) -> BTreeMap<BackendKind, BTreeSet<String>> {
    let mut needed: BTreeMap<BackendKind, BTreeSet<String>> = BTreeMap::new();
    for job in jobs {
        needed
            .entry(job.payload.selection.backend)
            .or_default()
            .insert(job.payload.selection.variant.clone());
    }
    needed
}

/// Top-level directory of a prompt path, used as its selection category.
fn prompt_group(path: &Path) -> String {
    path.components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) => std::fs::create_dir_all(dir).map_err(|e| PipelineError::cache_io(dir, e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::adapter::testing::{fake_adapter, FakeBackend};
    use crate::error::ErrorCode;
    use crate::types::{ArtifactName, ContentId};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _root: TempDir,
        corpus: PathBuf,
        cache: PathBuf,
        output: PathBuf,
        config: PipelineConfig,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let corpus = root.path().join("corpus");
        let cache = root.path().join("cache");
        let output = root.path().join("output");
        std::fs::create_dir_all(&corpus).unwrap();

        let mut config = PipelineConfig::new();
        config.source_dir = Some(corpus.clone());
        config.cache_dir = Some(cache.clone());
        config.output_dir = Some(output.clone());
        config.local.workers = Some(2);
        config.prompts.time_announcements = false;
        config.personas.slots = 1;
        config.personas.defaults = [(1, "greet".to_string())].into_iter().collect();
        config.personas.shuffle_seed = Some(7);

        Fixture {
            _root: root,
            corpus,
            cache,
            output,
            config,
        }
    }

    fn write_corpus(fx: &Fixture, file: &str, lines: &[&str]) {
        std::fs::write(fx.corpus.join(file), lines.join("\n")).unwrap();
    }

    fn sync(fx: &Fixture, adapter: &RenderAdapter, options: SyncOptions) -> Result<SyncReport> {
        let pipeline = Pipeline::new(&fx.config, adapter);
        pipeline.run(options, &AtomicBool::new(false), &mut default_assigner(&fx.config, false))
    }

    fn cached_files(fx: &Fixture) -> BTreeSet<String> {
        match std::fs::read_dir(&fx.cache) {
            Ok(dir) => dir
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    fn artifact(category: &str, language: Language, text: &str) -> String {
        ArtifactName::new(category, language, ContentId::of(text)).file_name()
    }

    fn backends() -> (Arc<FakeBackend>, Arc<FakeBackend>) {
        (
            Arc::new(FakeBackend::new(BackendKind::Local)),
            Arc::new(FakeBackend::new(BackendKind::Remote)),
        )
    }

    #[test]
    fn edit_renders_new_artifact_and_evicts_old() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(Arc::clone(&local), remote);
        write_corpus(&fx, "greet_en.txt", &["Hello there"]);

        let first = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(first.planned, 1);
        assert_eq!(first.rendered, 1);
        let old = artifact("greet", Language::EN, "Hello there");
        assert_eq!(cached_files(&fx), [old.clone()].into_iter().collect());
        let guard = FormatGuard::new(fx.config.audio, adapter.normalizer());
        assert!(guard.is_valid(&fx.cache.join(&old)));

        let second = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(second.planned, 0);
        assert_eq!(second.evicted(), 0);
        assert_eq!(local.calls(), 1);
        assert_eq!(cached_files(&fx), [old.clone()].into_iter().collect());

        write_corpus(&fx, "greet_en.txt", &["Hello there!"]);
        let third = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(third.rendered, 1);
        assert_eq!(third.evicted(), 1);
        let new = artifact("greet", Language::EN, "Hello there!");
        assert_eq!(cached_files(&fx), [new].into_iter().collect());
    }

    #[test]
    fn removing_one_line_evicts_exactly_its_artifact() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(local, remote);
        write_corpus(&fx, "greet_en.txt", &["One", "Two", "Three"]);
        write_corpus(&fx, "greet_de.txt", &["Zwei"]);
        sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(cached_files(&fx).len(), 4);

        write_corpus(&fx, "greet_en.txt", &["One", "Three"]);
        let report = sync(&fx, &adapter, SyncOptions::default()).unwrap();

        let evicted = &report.janitor.as_ref().unwrap().evicted;
        assert_eq!(evicted, &vec![fx.cache.join(artifact("greet", Language::EN, "Two"))]);
        assert_eq!(cached_files(&fx).len(), 3);
        assert_eq!(report.planned, 0);
    }

    #[test]
    fn failed_render_is_not_cached_and_retried_next_run() {
        let fx = fixture();
        let local = Arc::new(FakeBackend::new(BackendKind::Local).failing_on("Broken"));
        let remote = Arc::new(FakeBackend::new(BackendKind::Remote));
        let adapter = fake_adapter(Arc::clone(&local), remote);
        write_corpus(&fx, "greet_en.txt", &["Fine", "Broken"]);

        let first = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(first.rendered, 1);
        assert_eq!(first.failed, 1);
        assert_eq!(first.failures.len(), 1);
        assert!(!fx.cache.join(artifact("greet", Language::EN, "Broken")).exists());

        let second = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(second.planned, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(local.calls(), 3);
    }

    #[test]
    fn missing_backend_aborts_before_any_render() {
        let fx = fixture();
        let mut local = FakeBackend::new(BackendKind::Local);
        local.available = false;
        let local = Arc::new(local);
        let adapter = fake_adapter(Arc::clone(&local), Arc::new(FakeBackend::new(BackendKind::Remote)));
        write_corpus(&fx, "greet_en.txt", &["Hello"]);

        let err = sync(&fx, &adapter, SyncOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BackendUnavailable);
        assert!(err.is_fatal());
        assert_eq!(local.calls(), 0);
        assert!(cached_files(&fx).is_empty());
    }

    #[test]
    fn forced_remote_family_is_used_for_every_task() {
        let mut fx = fixture();
        fx.config.selection.forced_backend = Some(BackendKind::Remote);
        let (local, remote) = backends();
        let adapter = fake_adapter(Arc::clone(&local), Arc::clone(&remote));
        write_corpus(&fx, "greet_en.txt", &["A", "B"]);
        write_corpus(&fx, "greet_de.txt", &["C"]);

        let report = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(report.rendered, 3);
        assert_eq!(local.calls(), 0);
        assert_eq!(remote.calls(), 3);
    }

    #[test]
    fn playlist_lists_every_artifact_of_category_and_language() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(local, remote);
        write_corpus(&fx, "greet_en.txt", &["Hi", "Hello", "Hey"]);
        write_corpus(&fx, "greet_de.txt", &["Hallo"]);
        write_corpus(&fx, "other_en.txt", &["Unrelated"]);

        let report = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        let assembly = report.assembly.unwrap();
        assert_eq!(assembly.assembled(), 1);
        assert_eq!(assembly.slots[0].category.as_deref(), Some("greet"));

        let read = |name: &str| -> Vec<String> {
            std::fs::read_to_string(fx.output.join("playlists").join(name))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        };
        let en = read("cat_1_en_v3.m3u");
        assert_eq!(en.len(), 3);
        assert!(en.iter().all(|l| l.starts_with("/persona_01/en/greet_en_")));
        assert_eq!(read("cat_1_de_v3.m3u").len(), 1);
    }

    #[test]
    fn dry_run_changes_nothing() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(Arc::clone(&local), remote);
        write_corpus(&fx, "greet_en.txt", &["Hello"]);

        let report = sync(
            &fx,
            &adapter,
            SyncOptions {
                dry_run: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();
        assert_eq!(report.planned, 1);
        assert_eq!(report.rendered, 0);
        assert_eq!(local.calls(), 0);
        assert!(!fx.cache.exists());
        assert!(!fx.output.join("persona_01").exists());
    }

    #[test]
    fn interrupt_stops_after_render_phase() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(Arc::clone(&local), remote);
        std::fs::create_dir_all(&fx.cache).unwrap();
        let stale = fx.cache.join(artifact("greet", Language::EN, "Old line"));
        std::fs::write(&stale, b"stale").unwrap();
        write_corpus(&fx, "greet_en.txt", &["New line"]);

        let pipeline = Pipeline::new(&fx.config, &adapter);
        let abort = AtomicBool::new(true);
        let report = pipeline
            .run(SyncOptions::default(), &abort, &mut default_assigner(&fx.config, false))
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.skipped, 1);
        assert_eq!(local.calls(), 0);
        assert!(report.janitor.is_none());
        assert!(report.assembly.is_none());
        assert!(stale.exists());
    }

    struct InterruptingAssigner<'a> {
        abort: &'a AtomicBool,
        asked: usize,
    }

    impl CategoryAssigner for InterruptingAssigner<'_> {
        fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
            self.asked += 1;
            self.abort.store(true, Ordering::SeqCst);
            available.get(slot - 1).cloned()
        }
    }

    #[test]
    fn interrupt_during_assembly_stops_remaining_slots() {
        let mut fx = fixture();
        fx.config.personas.slots = 3;
        fx.config.personas.defaults.clear();
        let (local, remote) = backends();
        let adapter = fake_adapter(local, remote);
        write_corpus(&fx, "a_en.txt", &["One"]);
        write_corpus(&fx, "b_en.txt", &["Two"]);
        write_corpus(&fx, "c_en.txt", &["Three"]);

        let pipeline = Pipeline::new(&fx.config, &adapter);
        let abort = AtomicBool::new(false);
        let mut assigner = InterruptingAssigner {
            abort: &abort,
            asked: 0,
        };
        let report = pipeline
            .run(SyncOptions::default(), &abort, &mut assigner)
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.rendered, 3);
        assert_eq!(assigner.asked, 1);
        assert_eq!(report.assembly.unwrap().assembled(), 0);
        for slot in 1..=3 {
            assert!(!fx.output.join(format!("persona_{:02}", slot)).exists());
        }
    }

    #[test]
    fn unreadable_corpus_file_blocks_eviction() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(local, remote);
        write_corpus(&fx, "greet_en.txt", &["Hello"]);
        sync(&fx, &adapter, SyncOptions::default()).unwrap();

        std::fs::write(fx.corpus.join("greet_en.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
        let report = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert!(report.janitor.is_none());
        assert_eq!(cached_files(&fx).len(), 1);
    }

    #[test]
    fn fixed_prompts_render_once_into_output_tree() {
        let mut fx = fixture();
        let manifest = fx.corpus.parent().unwrap().join("prompts.json");
        std::fs::write(
            &manifest,
            r#"[{"path": "system/welcome_en.wav", "text": "Welcome", "language": "en", "voice": "en_GB-jenny_dioco-medium.onnx"}]"#,
        )
        .unwrap();
        fx.config.prompts.manifest = Some(manifest);
        fx.config.personas.slots = 1;

        let (local, remote) = backends();
        let adapter = fake_adapter(Arc::clone(&local), remote);

        let first = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(first.prompts_planned, 1);
        assert_eq!(first.rendered, 1);
        assert!(fx.output.join("system/welcome_en.wav").is_file());
        assert_eq!(
            local.rendered.lock().unwrap()[0],
            ("Welcome".to_string(), "en_GB-jenny_dioco-medium.onnx".to_string())
        );

        let second = sync(&fx, &adapter, SyncOptions::default()).unwrap();
        assert_eq!(second.prompts_planned, 0);
        assert_eq!(local.calls(), 1);
        // Prompts live outside the cache and survive eviction.
        assert!(fx.output.join("system/welcome_en.wav").is_file());
    }

    #[test]
    fn sweep_only_repairs_output_tree() {
        let fx = fixture();
        let (local, remote) = backends();
        let adapter = fake_adapter(local, remote);
        std::fs::create_dir_all(fx.output.join("system")).unwrap();
        let bad = fx.output.join("system/stereo.wav");
        crate::audio::testing::write_fixture(
            &bad,
            hound::WavSpec {
                channels: 2,
                ..fx.config.audio.spec()
            },
            500,
        );

        let pipeline = Pipeline::new(&fx.config, &adapter);
        let dry = pipeline.sweep(true);
        assert_eq!(dry.would_repair, vec![bad.clone()]);

        let report = pipeline.sweep(false);
        assert_eq!(report.repaired, 1);
        assert!(FormatGuard::new(fx.config.audio, adapter.normalizer()).is_valid(&bad));
    }

    #[test]
    fn prompt_group_is_first_component() {
        assert_eq!(prompt_group(Path::new("time/de/h_1.wav")), "time");
        assert_eq!(prompt_group(Path::new("x.wav")), "x.wav");
    }
}
