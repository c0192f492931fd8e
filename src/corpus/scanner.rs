//! Corpus directory scanner.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::types::{sanitize_category, CorpusLine, Language};

/// Extension of corpus files.
pub const CORPUS_EXTENSION: &str = "txt";

/// A corpus file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    /// The skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
    /// The name was fine but the content could not be read, so lines of
    /// this file may be missing from the live set.
    pub unreadable: bool,
}

impl ScanIssue {
    fn naming(path: &Path, reason: String) -> Self {
        Self {
            path: path.to_path_buf(),
            reason,
            unreadable: false,
        }
    }
}

/// Result of scanning a corpus directory.
#[derive(Debug, Clone, Default)]
pub struct CorpusScan {
    /// Every non-blank trimmed line, in file then line order.
    pub lines: Vec<CorpusLine>,
    /// Languages observed per category.
    pub categories: BTreeMap<String, BTreeSet<Language>>,
    /// Files that could not be used.
    pub issues: Vec<ScanIssue>,
}

impl CorpusScan {
    /// Returns the sorted category names.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Returns true if every readable-looking file was read, i.e. the
    /// identifiers in `lines` cover every artifact the corpus still owns.
    pub fn is_complete(&self) -> bool {
        !self.issues.iter().any(|i| i.unreadable)
    }

    /// Number of files scanned successfully.
    pub fn file_count(&self) -> usize {
        self.lines
            .iter()
            .map(|l| &l.source_file)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Splits a corpus file stem into category and optional language suffix.
///
/// If the last `_`-separated segment is exactly two characters it is the
/// language and the rest is the category; otherwise the whole stem is the
/// category and no language is given.
pub fn parse_corpus_filename(stem: &str) -> (String, Option<String>) {
    match stem.rsplit_once('_') {
        Some((category, lang)) if lang.chars().count() == 2 => {
            (category.to_string(), Some(lang.to_lowercase()))
        }
        _ => (stem.to_string(), None),
    }
}

/// Scans a corpus directory.
///
/// Files are visited in sorted order. Unreadable files, unsupported language
/// suffixes and categories with no file-safe characters are recorded as
/// [`ScanIssue`]s and skipped. Only a missing or unlistable directory is an
/// error.
pub fn scan_corpus(dir: &Path, languages: &[Language]) -> Result<CorpusScan> {
    let primary = Language::primary(languages);

    let read_dir = std::fs::read_dir(dir).map_err(|e| PipelineError::scan_failed(dir, e))?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(CORPUS_EXTENSION))
        })
        .collect();
    paths.sort();

    let mut scan = CorpusScan::default();

    for path in paths {
        match scan_file(&path, primary, languages) {
            Ok((category, language, lines)) => {
                debug!(
                    "{}: {} lines ({} / {})",
                    path.display(),
                    lines.len(),
                    category,
                    language
                );
                scan.categories
                    .entry(category)
                    .or_default()
                    .insert(language);
                scan.lines.extend(lines);
            }
            Err(issue) => {
                warn!("Skipping {}: {}", issue.path.display(), issue.reason);
                scan.issues.push(issue);
            }
        }
    }

    info!(
        "Scanned {} lines in {} categories ({} files skipped)",
        scan.lines.len(),
        scan.categories.len(),
        scan.issues.len()
    );

    Ok(scan)
}

fn scan_file(
    path: &Path,
    primary: Language,
    languages: &[Language],
) -> std::result::Result<(String, Language, Vec<CorpusLine>), ScanIssue> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ScanIssue::naming(path, "file name is not valid UTF-8".to_string()))?;

    let (category, raw_language) = parse_corpus_filename(stem);
    let language = match raw_language {
        None => primary,
        Some(raw) => Language::parse(&raw)
            .filter(|l| languages.contains(l))
            .ok_or_else(|| ScanIssue::naming(path, format!("unsupported language suffix {:?}", raw)))?,
    };

    if sanitize_category(&category).is_empty() {
        return Err(ScanIssue::naming(
            path,
            format!("category {:?} has no file-safe characters", category),
        ));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ScanIssue {
        path: path.to_path_buf(),
        reason: e.to_string(),
        unreadable: true,
    })?;
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|text| CorpusLine {
            text: text.to_string(),
            category: category.clone(),
            language,
            source_file: path.to_path_buf(),
        })
        .collect();

    Ok((category, language, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LANGS: [Language; 2] = [Language::EN, Language::DE];

    #[test]
    fn filename_convention() {
        assert_eq!(parse_corpus_filename("greet_en"), ("greet".to_string(), Some("en".to_string())));
        assert_eq!(parse_corpus_filename("dad_jokes_DE"), ("dad_jokes".to_string(), Some("de".to_string())));
        assert_eq!(parse_corpus_filename("dad_jokes"), ("dad_jokes".to_string(), None));
        assert_eq!(parse_corpus_filename("greet"), ("greet".to_string(), None));
        assert_eq!(parse_corpus_filename("_en"), (String::new(), Some("en".to_string())));
    }

    #[test]
    fn scan_reads_trimmed_non_blank_lines() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("greet_en.txt"), "  Hello there \n\n\t\nGood morning\n").unwrap();
        std::fs::write(dir.path().join("greet_de.txt"), "Hallo\n").unwrap();
        std::fs::write(dir.path().join("Fortune.txt"), "You will sleep well\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored\n").unwrap();

        let scan = scan_corpus(dir.path(), &LANGS).unwrap();

        assert_eq!(scan.lines.len(), 4);
        assert!(scan.issues.is_empty());
        assert_eq!(scan.category_names(), vec!["Fortune".to_string(), "greet".to_string()]);
        assert_eq!(
            scan.categories["greet"],
            [Language::EN, Language::DE].into_iter().collect()
        );
        // No suffix: primary language.
        assert_eq!(scan.categories["Fortune"], [Language::EN].into_iter().collect());

        let hello = scan.lines.iter().find(|l| l.text == "Hello there").unwrap();
        assert_eq!(hello.category, "greet");
        assert_eq!(hello.language, Language::EN);
        assert_eq!(scan.file_count(), 3);
        assert!(scan.is_complete());
    }

    #[test]
    fn bad_files_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("greet_en.txt"), "Hi\n").unwrap();
        std::fs::write(dir.path().join("greet_fr.txt"), "Salut\n").unwrap();
        std::fs::write(dir.path().join("binary_en.txt"), [0xffu8, 0xfe, 0x00, 0x41]).unwrap();
        std::fs::write(dir.path().join("!!!_en.txt"), "what\n").unwrap();

        let scan = scan_corpus(dir.path(), &LANGS).unwrap();
        assert_eq!(scan.lines.len(), 1);
        assert_eq!(scan.issues.len(), 3);
        assert!(scan.issues.iter().any(|i| i.reason.contains("\"fr\"")));
        assert!(!scan.is_complete());
        assert_eq!(scan.issues.iter().filter(|i| i.unreadable).count(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(scan_corpus(&dir.path().join("absent"), &LANGS).is_err());
    }
}
