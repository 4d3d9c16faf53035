use anyhow::{Context, Result};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::traits::DocumentParser;
use crate::types::{Document, LoadFailure, LoadReport};

/// Plain UTF-8 text; falls back to lossy decoding for other encodings.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn parse(&self, path: &Path) -> Result<Vec<(String, Option<usize>)>> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let text = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(vec![(text, None)])
    }
}

/// PDF via `pdf-extract`; pages are separated by form feeds in its output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn parse(&self, path: &Path) -> Result<Vec<(String, Option<usize>)>> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        // pdf-extract panics on some malformed inputs.
        let text = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&bytes)))
            .map_err(|_| anyhow::anyhow!("PDF parser panicked"))?
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;

        Ok(pdf_pages(&text))
    }
}

/// Split extracted PDF text on form feeds into `(text, page)` pairs. Pages are
/// numbered from 1 by their position in the file; blank pages are left out but
/// keep their number.
pub fn pdf_pages(text: &str) -> Vec<(String, Option<usize>)> {
    text.split('\x0C')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| (page.trim().to_string(), Some(i + 1)))
        .collect()
}

/// Walks a corpus directory and turns every recognized file into documents.
pub struct DocumentLoader {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader {
    /// Loader with the built-in PDF and plain-text parsers.
    pub fn new() -> Self {
        Self::empty().with_parser(PdfParser).with_parser(PlainTextParser)
    }

    pub fn empty() -> Self {
        Self { parsers: Vec::new() }
    }

    pub fn with_parser<P: DocumentParser + 'static>(mut self, parser: P) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    fn parser_for(&self, path: &Path) -> Option<&dyn DocumentParser> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.parsers
            .iter()
            .find(|p| p.extensions().iter().any(|e| *e == ext))
            .map(|p| p.as_ref())
    }

    /// Load every supported file under `root` (recursively, in path order).
    ///
    /// Per-file failures land in the report; only a missing directory or an
    /// empty result is an error.
    pub fn load(&self, root: &Path) -> crate::error::Result<LoadReport> {
        if !root.is_dir() {
            return Err(Error::CorpusNotFound(root.to_path_buf()));
        }

        let mut report = LoadReport::default();
        let (files, walk_errors) = list_files(root);
        for err in walk_errors {
            let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            warn!(path = %path.display(), error = %err, "cannot read corpus entry, skipping");
            report.failures.push(LoadFailure { path, reason: err.to_string() });
        }
        for path in files {
            report.files_seen += 1;
            let Some(parser) = self.parser_for(&path) else {
                debug!(path = %path.display(), "skipping unsupported file");
                report.skipped_unsupported += 1;
                continue;
            };
            match parser.parse(&path) {
                Ok(parts) => {
                    let source = path.to_string_lossy().to_string();
                    let before = report.documents.len();
                    report.documents.extend(
                        parts
                            .into_iter()
                            .filter(|(text, _)| !text.trim().is_empty())
                            .map(|(text, page)| Document { text, source: source.clone(), page }),
                    );
                    if report.documents.len() == before {
                        warn!(path = %path.display(), "file produced no text");
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load file, skipping");
                    report.failures.push(LoadFailure { path: path.clone(), reason: format!("{:#}", e) });
                }
            }
        }

        info!(
            files = report.files_seen,
            documents = report.documents.len(),
            failed = report.failures.len(),
            unsupported = report.skipped_unsupported,
            "corpus loaded"
        );

        if report.documents.is_empty() {
            return Err(Error::CorpusEmpty {
                path: root.to_path_buf(),
                failures: report.failures,
                skipped: report.skipped_unsupported,
            });
        }
        Ok(report)
    }
}

/// Regular files under `root` in path order, plus the entries the walk could not read
/// (dangling symlinks, unreadable directories, link loops).
fn list_files(root: &Path) -> (Vec<PathBuf>, Vec<walkdir::Error>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }
    files.sort();
    (files, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_pages_are_numbered_from_one() {
        let pages = pdf_pages("first page\x0Csecond page\x0Cthird");
        assert_eq!(
            pages,
            vec![
                ("first page".to_string(), Some(1)),
                ("second page".to_string(), Some(2)),
                ("third".to_string(), Some(3)),
            ]
        );
    }

    #[test]
    fn blank_pdf_pages_are_skipped_without_renumbering() {
        let pages = pdf_pages("  cover \x0C \n\t \x0CArticle 4\x0C");
        assert_eq!(pages, vec![("cover".to_string(), Some(1)), ("Article 4".to_string(), Some(3))]);
    }

    #[test]
    fn pdf_without_form_feeds_is_one_page() {
        assert_eq!(pdf_pages("whole text"), vec![("whole text".to_string(), Some(1))]);
        assert!(pdf_pages(" \x0C ").is_empty());
    }
}
