//! Corpus scanning.
//!
//! Reads `<category>[_<lang>].txt` files into [`CorpusLine`](crate::types::CorpusLine)s.

pub mod scanner;

pub use scanner::{parse_corpus_filename, scan_corpus, CorpusScan, ScanIssue};
