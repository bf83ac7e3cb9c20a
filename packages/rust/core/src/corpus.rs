//! Corpus merger.
//!
//! Reads line-delimited JSON files into a single ordered [`Corpus`]. Lines
//! that cannot be decoded are skipped and reported; they never abort a merge.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use topicscrape_shared::{Corpus, CorpusRecord, PipelineError, Result};

/// Extension of line-delimited JSON corpus files.
pub const CORPUS_EXTENSION: &str = "jl";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A line that was left out of the merged corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Result of a merge: the corpus plus everything that was dropped.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub corpus: Corpus,
    pub skipped: Vec<SkippedLine>,
}

/// Merge `paths` in order into one corpus.
///
/// Record order is file order, then line order. Blank lines are ignored
/// silently; malformed lines are skipped with a warning.
#[instrument(skip_all, fields(files = paths.len()))]
pub fn merge(paths: &[PathBuf]) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    for path in paths {
        read_into(path, &mut report)?;
    }

    info!(
        records = report.corpus.len(),
        skipped = report.skipped.len(),
        "corpus merged"
    );
    Ok(report)
}

/// Read a single corpus file.
pub fn read_corpus(path: &Path) -> Result<MergeReport> {
    merge(&[path.to_path_buf()])
}

fn read_into(path: &Path, report: &mut MergeReport) -> Result<()> {
    if !path.is_file() {
        return Err(PipelineError::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let before = report.corpus.len();

    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let raw = if idx == 0 {
            raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
        } else {
            raw
        };
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        match parse_line(raw) {
            Ok(Some(record)) => report.corpus.records.push(record),
            Ok(None) => {}
            Err(reason) => {
                warn!(file = %path.display(), line = idx + 1, %reason, "skipping malformed line");
                report.skipped.push(SkippedLine {
                    file: path.to_path_buf(),
                    line: idx + 1,
                    reason,
                });
            }
        }
    }

    debug!(
        file = %path.display(),
        records = report.corpus.len() - before,
        "read corpus file"
    );
    Ok(())
}

fn parse_line(raw: &[u8]) -> std::result::Result<Option<CorpusRecord>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("invalid UTF-8: {e}"))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| format!("invalid record: {e}"))
}

/// Write `corpus` as line-delimited JSON, one record per line.
pub fn write_corpus(corpus: &Corpus, path: &Path) -> Result<()> {
    let mut out = String::new();
    for record in &corpus.records {
        let line = serde_json::to_string(record).map_err(|e| {
            PipelineError::validation(format!("JSON serialization failed: {e}"))
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|e| PipelineError::io(path, e))?;
    debug!(path = %path.display(), records = corpus.len(), "wrote corpus");
    Ok(())
}

/// Every `*.jl` file below `dir`, recursively, in sorted path order.
///
/// Symlinked directories are not followed.
pub fn collect_corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::PathNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PipelineError::io(&path, e))?;
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "not following symlinked directory");
        } else if path.extension().is_some_and(|ext| ext == CORPUS_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}
