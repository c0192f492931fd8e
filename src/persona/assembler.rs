//! Persona directory and playlist assembly.
//!
//! Output layout:
//!
//! ```text
//! <output>/persona_01/<lang>/<artifact>.wav
//! <output>/playlists/cat_1_<lang>_<version>.m3u
//! ```
//!
//! Playlist lines reference tracks from the output root, e.g.
//! `/persona_01/de/Fortune_de_<identifier>.wav`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::ArtifactCache;
use crate::config::PersonaConfig;
use crate::error::{PipelineError, Result};
use crate::types::{sanitize_category, CacheEntry, Language};

use super::assignment::CategoryAssigner;

/// Directory holding every playlist.
pub const PLAYLIST_DIR: &str = "playlists";

/// Returns the directory name of a slot, e.g. `persona_01`.
pub fn slot_dir_name(slot: usize) -> String {
    format!("persona_{:02}", slot)
}

/// Returns the playlist file name of a slot and language.
pub fn playlist_name(slot: usize, language: Language, version: &str) -> String {
    format!("cat_{}_{}_{}.m3u", slot, language, version)
}

/// Assembly outcome of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    /// Slot number, from 1.
    pub slot: usize,
    /// Category bound to the slot, if any.
    pub category: Option<String>,
    /// Tracks written per language.
    pub tracks: BTreeMap<Language, usize>,
    /// Why the slot was skipped or rolled back.
    pub error: Option<String>,
}

impl SlotReport {
    /// True if the slot was rebuilt.
    pub fn is_assembled(&self) -> bool {
        self.category.is_some() && self.error.is_none()
    }
}

/// Assembly outcome of every slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// One entry per slot, in slot order.
    pub slots: Vec<SlotReport>,
    /// True if an interrupt stopped assembly before the last slot.
    pub interrupted: bool,
}

impl AssemblyReport {
    /// Number of slots rebuilt.
    pub fn assembled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_assembled()).count()
    }

    /// Number of slots skipped or rolled back.
    pub fn skipped(&self) -> usize {
        self.slots.len() - self.assembled()
    }
}

/// Rebuilds persona directories and playlists from the cache.
pub struct PersonaAssembler<'a> {
    cache: &'a ArtifactCache,
    output_dir: PathBuf,
    config: PersonaConfig,
    abort: Option<&'a AtomicBool>,
}

impl<'a> PersonaAssembler<'a> {
    /// Creates an assembler writing under `output_dir`.
    pub fn new(cache: &'a ArtifactCache, output_dir: impl Into<PathBuf>, config: PersonaConfig) -> Self {
        Self {
            cache,
            output_dir: output_dir.into(),
            config,
            abort: None,
        }
    }

    /// Stops assembly at the next slot boundary once `abort` is set.
    pub fn with_abort(mut self, abort: &'a AtomicBool) -> Self {
        self.abort = Some(abort);
        self
    }

    fn aborted(&self) -> bool {
        self.abort.is_some_and(|a| a.load(Ordering::SeqCst))
    }

    /// Returns the playlist directory.
    pub fn playlist_dir(&self) -> PathBuf {
        self.output_dir.join(PLAYLIST_DIR)
    }

    /// Assembles every slot in order.
    ///
    /// A slot without a category is reported and left untouched. With
    /// `dry_run` the report is computed but nothing is written. An abort
    /// raised before a slot is built leaves that slot and the rest as they
    /// were.
    pub fn assemble(
        &self,
        available: &[String],
        assigner: &mut dyn CategoryAssigner,
        dry_run: bool,
    ) -> Result<AssemblyReport> {
        let entries = self.cache.entries()?;
        let mut report = AssemblyReport::default();

        for slot in 1..=self.config.slots {
            if self.aborted() {
                report.interrupted = true;
                break;
            }
            let mut slot_report = SlotReport {
                slot,
                ..SlotReport::default()
            };

            let category = assigner
                .choose_category(slot, available)
                .filter(|c| !sanitize_category(c).is_empty());
            let Some(category) = category else {
                let err = PipelineError::assembly_failed(format!("no category for persona {}", slot));
                warn!("{}", err);
                slot_report.error = Some(err.message);
                report.slots.push(slot_report);
                continue;
            };
            if self.aborted() {
                report.interrupted = true;
                break;
            }
            slot_report.category = Some(category.clone());

            let key = sanitize_category(&category);
            let mut by_language: BTreeMap<Language, Vec<&CacheEntry>> = BTreeMap::new();
            for entry in entries.iter().filter(|e| e.name.category == key) {
                by_language.entry(entry.name.language).or_default().push(entry);
            }
            slot_report.tracks = by_language.iter().map(|(l, v)| (*l, v.len())).collect();

            if dry_run {
                info!("Would assemble persona {} from {}", slot, category);
            } else if let Err(e) = self.build_slot(slot, &by_language) {
                warn!("Persona {} rolled back: {}", slot, e);
                self.roll_back(slot);
                slot_report.tracks.clear();
                slot_report.error = Some(e.to_string());
            } else {
                info!(
                    "Persona {} <- {} ({} tracks)",
                    slot,
                    category,
                    slot_report.tracks.values().sum::<usize>()
                );
            }

            report.slots.push(slot_report);
        }

        Ok(report)
    }

    fn build_slot(&self, slot: usize, by_language: &BTreeMap<Language, Vec<&CacheEntry>>) -> Result<()> {
        let slot_name = slot_dir_name(slot);
        let slot_dir = self.output_dir.join(&slot_name);
        let playlist_dir = self.playlist_dir();

        if slot_dir.exists() {
            std::fs::remove_dir_all(&slot_dir).map_err(|e| PipelineError::cache_io(&slot_dir, e))?;
        }
        std::fs::create_dir_all(&slot_dir).map_err(|e| PipelineError::cache_io(&slot_dir, e))?;
        std::fs::create_dir_all(&playlist_dir).map_err(|e| PipelineError::cache_io(&playlist_dir, e))?;

        let mut rng = match self.config.shuffle_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(slot as u64)),
            None => ChaCha8Rng::from_rng(rand::thread_rng())
                .map_err(|e| PipelineError::assembly_failed(format!("rng: {}", e)))?,
        };

        for (language, tracks) in by_language {
            let lang_dir = slot_dir.join(language.as_str());
            std::fs::create_dir_all(&lang_dir).map_err(|e| PipelineError::cache_io(&lang_dir, e))?;

            let mut lines = Vec::with_capacity(tracks.len());
            for entry in tracks {
                let file_name = entry.name.file_name();
                let dest = lang_dir.join(&file_name);
                std::fs::copy(&entry.path, &dest).map_err(|e| PipelineError::cache_io(&dest, e))?;
                lines.push(format!("/{}/{}/{}", slot_name, language, file_name));
            }

            lines.shuffle(&mut rng);
            let playlist = playlist_dir.join(playlist_name(slot, *language, &self.config.version));
            write_playlist(&playlist, &lines)?;
        }

        self.remove_stale_playlists(slot, |language| by_language.contains_key(&language))
    }

    /// Deletes the slot's directory and all of its playlists.
    fn roll_back(&self, slot: usize) {
        let slot_dir = self.output_dir.join(slot_dir_name(slot));
        if slot_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&slot_dir) {
                warn!("Could not remove {}: {}", slot_dir.display(), e);
            }
        }
        if let Err(e) = self.remove_stale_playlists(slot, |_| false) {
            warn!("Could not remove playlists of persona {}: {}", slot, e);
        }
    }

    /// Removes this slot's playlists (current version) for languages where `keep` is false.
    fn remove_stale_playlists(&self, slot: usize, keep: impl Fn(Language) -> bool) -> Result<()> {
        let dir = self.playlist_dir();
        let read_dir = match std::fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(PipelineError::cache_io(&dir, e)),
        };

        for path in read_dir.filter_map(|e| e.ok().map(|e| e.path())) {
            let Some(language) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| parse_playlist_name(n, slot, &self.config.version))
            else {
                continue;
            };
            if !keep(language) {
                std::fs::remove_file(&path).map_err(|e| PipelineError::cache_io(&path, e))?;
                info!("Removed stale playlist {}", path.display());
            }
        }
        Ok(())
    }
}

/// Returns the language of `cat_<slot>_<lang>_<version>.m3u` if it belongs to `slot`.
fn parse_playlist_name(name: &str, slot: usize, version: &str) -> Option<Language> {
    let rest = name.strip_prefix(&format!("cat_{}_", slot))?;
    let language = rest.strip_suffix(&format!("_{}.m3u", version))?;
    Language::parse(language)
}

/// Writes a playlist atomically, one entry per line.
fn write_playlist(path: &Path, lines: &[String]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::cache_io(dir, e))?;
    for line in lines {
        writeln!(temp, "{}", line).map_err(|e| PipelineError::cache_io(path, e))?;
    }
    temp.persist(path)
        .map_err(|e| PipelineError::cache_io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::assignment::{DefaultTableAssigner, PositionalAssigner};
    use crate::types::{ArtifactName, ContentId};
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn put(cache: &ArtifactCache, category: &str, language: Language, text: &str) -> ArtifactName {
        let name = ArtifactName::new(category, language, ContentId::of(text));
        std::fs::write(cache.path_for(&name), text).unwrap();
        name
    }

    fn config(slots: usize) -> PersonaConfig {
        PersonaConfig {
            slots,
            shuffle_seed: Some(7),
            ..PersonaConfig::default()
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn builds_dirs_and_playlists() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        let out = root.path().join("out");

        let a = put(&cache, "Fortune", Language::DE, "Glück");
        put(&cache, "Fortune", Language::DE, "Pech");
        put(&cache, "Fortune", Language::EN, "Luck");
        put(&cache, "Fortune_extra", Language::EN, "Not mine");

        let assembler = PersonaAssembler::new(&cache, &out, config(1));
        let available = vec!["Fortune".to_string(), "Fortune_extra".to_string()];
        let report = assembler
            .assemble(&available, &mut PositionalAssigner, false)
            .unwrap();

        assert_eq!(report.assembled(), 1);
        assert_eq!(report.slots[0].tracks[&Language::DE], 2);
        assert_eq!(report.slots[0].tracks[&Language::EN], 1);

        let de = read_lines(&out.join("playlists/cat_1_de_v3.m3u"));
        assert_eq!(de.len(), 2);
        assert!(de.contains(&format!("/persona_01/de/{}", a.file_name())));
        assert!(out.join("persona_01/de").join(a.file_name()).is_file());
        assert_eq!(read_lines(&out.join("playlists/cat_1_en_v3.m3u")).len(), 1);
    }

    #[test]
    fn rebuild_is_exclusive_and_removes_stale_playlists() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        let out = root.path().join("out");
        let assembler = PersonaAssembler::new(&cache, &out, config(1));
        let available = vec!["greet".to_string()];

        let en = put(&cache, "greet", Language::EN, "Hi");
        put(&cache, "greet", Language::DE, "Hallo");
        assembler.assemble(&available, &mut PositionalAssigner, false).unwrap();
        std::fs::write(out.join("persona_01/leftover.txt"), "x").unwrap();

        // German line removed from the cache.
        let de_path = cache.entries_for_category("greet").unwrap()
            .into_iter()
            .find(|e| e.name.language == Language::DE)
            .unwrap()
            .path;
        std::fs::remove_file(de_path).unwrap();

        assembler.assemble(&available, &mut PositionalAssigner, false).unwrap();
        assert!(!out.join("persona_01/leftover.txt").exists());
        assert!(!out.join("persona_01/de").exists());
        assert!(!out.join("playlists/cat_1_de_v3.m3u").exists());
        assert_eq!(
            read_lines(&out.join("playlists/cat_1_en_v3.m3u")),
            vec![format!("/persona_01/en/{}", en.file_name())]
        );
    }

    #[test]
    fn unassigned_slot_is_left_untouched() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        let out = root.path().join("out");
        std::fs::create_dir_all(out.join("persona_02/en")).unwrap();
        std::fs::write(out.join("persona_02/en/old.wav"), "x").unwrap();

        put(&cache, "greet", Language::EN, "Hi");
        let table = [(1, "greet".to_string())].into_iter().collect();
        let assembler = PersonaAssembler::new(&cache, &out, config(2));
        let report = assembler
            .assemble(&["greet".to_string()], &mut DefaultTableAssigner::new(table), false)
            .unwrap();

        assert_eq!(report.assembled(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.slots[1].error.is_some());
        assert!(out.join("persona_02/en/old.wav").exists());
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        for i in 0..20 {
            put(&cache, "Quotes", Language::EN, &format!("quote {}", i));
        }
        let available = vec!["Quotes".to_string()];

        let out_a = root.path().join("a");
        let out_b = root.path().join("b");
        PersonaAssembler::new(&cache, &out_a, config(1))
            .assemble(&available, &mut PositionalAssigner, false)
            .unwrap();
        PersonaAssembler::new(&cache, &out_b, config(1))
            .assemble(&available, &mut PositionalAssigner, false)
            .unwrap();

        let a = read_lines(&out_a.join("playlists/cat_1_en_v3.m3u"));
        let b = read_lines(&out_b.join("playlists/cat_1_en_v3.m3u"));
        assert_eq!(a, b);
        assert_eq!(a.iter().collect::<HashSet<_>>().len(), 20);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        put(&cache, "greet", Language::EN, "Hi");
        let out = root.path().join("out");

        let report = PersonaAssembler::new(&cache, &out, config(1))
            .assemble(&["greet".to_string()], &mut PositionalAssigner, true)
            .unwrap();
        assert_eq!(report.slots[0].tracks[&Language::EN], 1);
        assert!(!out.exists());
    }

    struct AbortingAssigner<'a> {
        abort: &'a AtomicBool,
        asked: Vec<usize>,
    }

    impl CategoryAssigner for AbortingAssigner<'_> {
        fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
            self.asked.push(slot);
            self.abort.store(true, Ordering::SeqCst);
            available.get(slot - 1).cloned()
        }
    }

    #[test]
    fn abort_during_choice_stops_before_building() {
        let root = tempdir().unwrap();
        let cache = ArtifactCache::new(root.path().join("cache"));
        cache.ensure_dir().unwrap();
        put(&cache, "a", Language::EN, "one");
        put(&cache, "b", Language::EN, "two");
        put(&cache, "c", Language::EN, "three");
        let out = root.path().join("out");
        let available = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let abort = AtomicBool::new(false);
        let mut assigner = AbortingAssigner {
            abort: &abort,
            asked: Vec::new(),
        };
        let report = PersonaAssembler::new(&cache, &out, config(3))
            .with_abort(&abort)
            .assemble(&available, &mut assigner, false)
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.assembled(), 0);
        assert_eq!(assigner.asked, vec![1]);
        assert!(!out.join("persona_01").exists());
        assert!(!out.join("playlists").exists());
    }

    #[test]
    fn playlist_names() {
        assert_eq!(slot_dir_name(3), "persona_03");
        assert_eq!(playlist_name(3, Language::DE, "v3"), "cat_3_de_v3.m3u");
        assert_eq!(parse_playlist_name("cat_3_de_v3.m3u", 3, "v3"), Some(Language::DE));
        assert_eq!(parse_playlist_name("cat_13_de_v3.m3u", 3, "v3"), None);
        assert_eq!(parse_playlist_name("cat_3_de_v2.m3u", 3, "v3"), None);
    }
}
