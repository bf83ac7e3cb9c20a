//! External scraper invocation.
//!
//! The scraper is an opaque process: it is started with a fixed argument
//! vocabulary, writes a line-delimited JSON file into its own output
//! directory, and that file is then relocated into the domain workspace.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use topicscrape_shared::{DomainSpec, PipelineError, Result, ScraperSettings, Workspace};

// ---------------------------------------------------------------------------
// ScrapeResult
// ---------------------------------------------------------------------------

/// Summary of one completed scrape job.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Domain the job ran for.
    pub domain: String,
    /// Where the relocated output file now lives.
    pub output: PathBuf,
    /// Wall-clock time spent in the scraper process.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Argument vector passed to the scraper after the configured command.
///
/// `-o <output file> -d <domain> -c <css selector> -l <depth> -p <page cap>`
pub fn scrape_args(spec: &DomainSpec, output_file: &str) -> Vec<String> {
    vec![
        "-o".into(),
        output_file.into(),
        "-d".into(),
        spec.domain.clone(),
        "-c".into(),
        spec.css_selector.clone(),
        "-l".into(),
        spec.depth_limit.to_string(),
        "-p".into(),
        spec.page_cap.to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run the scraper for one domain and move its output into `workspace`.
///
/// Blocks (asynchronously) until the scraper exits. A non-zero exit status
/// is a [`PipelineError::ScrapeProcess`]; a missing output file after a
/// clean exit is a [`PipelineError::ScrapeOutputMissing`].
#[instrument(skip_all, fields(domain = %spec.domain))]
pub async fn run(
    spec: &DomainSpec,
    settings: &ScraperSettings,
    workspace: &Workspace,
) -> Result<ScrapeResult> {
    let file_name = spec.scrape_file_name();
    let (program, leading) = settings.command.split_first().ok_or_else(|| {
        PipelineError::ScrapeProcess {
            domain: spec.domain.clone(),
            message: "scraper command is empty".into(),
        }
    })?;

    info!(
        program = %program,
        depth = spec.depth_limit,
        pages = spec.page_cap,
        "starting scraper"
    );

    let start = Instant::now();
    let status = Command::new(program)
        .args(leading)
        .args(scrape_args(spec, &file_name))
        .stdin(Stdio::null())
        .stderr(Stdio::inherit()) // Scraper logs go to parent stderr
        .status()
        .await
        .map_err(|e| PipelineError::ScrapeProcess {
            domain: spec.domain.clone(),
            message: format!("failed to start `{program}`: {e}"),
        })?;
    let duration = start.elapsed();

    if !status.success() {
        return Err(PipelineError::ScrapeProcess {
            domain: spec.domain.clone(),
            message: format!("scraper exited with {status}"),
        });
    }

    let source = settings.output_dir.join(&file_name);
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(PipelineError::ScrapeOutputMissing { path: source });
    }

    let dest = workspace.raw_file(&file_name);
    relocate(&source, &dest).await?;

    info!(
        output = %dest.display(),
        elapsed_ms = duration.as_millis() as u64,
        "scrape complete"
    );

    Ok(ScrapeResult {
        domain: spec.domain.clone(),
        output: dest,
        duration,
    })
}

/// Move `source` to `dest`, replacing any previous file.
///
/// Falls back to copy-then-remove when the two paths are on different
/// filesystems.
async fn relocate(source: &Path, dest: &Path) -> Result<()> {
    match tokio::fs::rename(source, dest).await {
        Ok(()) => {
            debug!(from = %source.display(), to = %dest.display(), "moved scrape output");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "rename failed, copying scrape output instead");
            tokio::fs::copy(source, dest)
                .await
                .map_err(|e| PipelineError::io(dest, e))?;
            tokio::fs::remove_file(source)
                .await
                .map_err(|e| PipelineError::io(source, e))?;
            Ok(())
        }
    }
}
