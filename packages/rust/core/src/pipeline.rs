//! Pipeline orchestrator.
//!
//! Sequences workspace → scrape → merge → model → write for every configured
//! domain, strictly one domain at a time. Failures local to a domain are
//! recorded in its [`DomainOutcome`] and the run moves on; configuration and
//! input-path errors abort the whole run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use topicscrape_artifacts::{WrittenArtifacts, write_artifacts};
use topicscrape_shared::{
    DomainSpec, PipelineConfig, PipelineError, Result, Workspace,
    ensure_domain_workspace, output_name,
};
use topicscrape_topics::{EngineFactory, TopicModelDriver};

use crate::corpus::{self, MergeReport};

/// Artifact prefix used for every domain in per-domain runs.
pub const INDIVIDUAL_DOMAIN_OUTPUT_NAME: &str = "individual_domain";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Where a single domain (or ad-hoc corpus) ended up.
#[derive(Debug)]
pub enum DomainStatus {
    /// Modelled and every artifact written.
    Completed {
        artifacts: WrittenArtifacts,
        records: usize,
        skipped_lines: usize,
        /// `false` when fitting fell back to a null assignment.
        fitted: bool,
    },
    /// Scrape-only run finished for this domain.
    Scraped { output: PathBuf },
    /// Not enough data to model; nothing was written.
    Skipped { reason: String },
    /// Any other domain-local failure.
    Failed { error: String },
}

#[derive(Debug)]
pub struct DomainOutcome {
    pub domain: String,
    pub workspace: PathBuf,
    pub status: DomainStatus,
}

impl DomainOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            DomainStatus::Completed { .. } | DomainStatus::Scraped { .. }
        )
    }
}

/// Summary of a multi-domain run.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<DomainOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a domain's first stage.
    fn domain_started(&self, domain: &str, current: usize, total: usize);
    /// Called once a domain has an outcome.
    fn domain_finished(&self, outcome: &DomainOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn domain_started(&self, _domain: &str, _current: usize, _total: usize) {}
    fn domain_finished(&self, _outcome: &DomainOutcome) {}
}

// ---------------------------------------------------------------------------
// Run modes
// ---------------------------------------------------------------------------

/// Scrape, merge, model and write every configured domain.
#[instrument(skip_all, fields(domains = config.domains.len()))]
pub async fn run_per_domain(
    config: &PipelineConfig,
    factory: &dyn EngineFactory,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let search_term = config.require_search_term()?;

    run_domains(config, progress, move |spec, ws| async move {
        progress.phase(&format!("Scraping {}", spec.domain));
        let scrape = topicscrape_scrape::run(spec, &config.general.scraper, &ws).await?;

        progress.phase(&format!("Merging {}", spec.domain));
        let merged = corpus::merge(&[scrape.output])?;

        progress.phase(&format!("Modelling {}", spec.domain));
        model_and_write(
            merged,
            search_term,
            factory,
            &ws,
            INDIVIDUAL_DOMAIN_OUTPUT_NAME,
        )
    })
    .await
}

/// Scrape every configured domain without modelling.
#[instrument(skip_all, fields(domains = config.domains.len()))]
pub async fn scrape_only(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    run_domains(config, progress, move |spec, ws| async move {
        progress.phase(&format!("Scraping {}", spec.domain));
        let scrape = topicscrape_scrape::run(spec, &config.general.scraper, &ws).await?;
        Ok(DomainStatus::Scraped {
            output: scrape.output,
        })
    })
    .await
}

/// Model a single existing corpus file.
///
/// Artifacts land in `<output_dir>/<name>/` prefixed with the formatted `name`.
#[instrument(skip_all, fields(corpus = %corpus_path.display(), name = %name))]
pub async fn model_only(
    corpus_path: &Path,
    output_dir: &Path,
    name: &str,
    search_term: &str,
    factory: &dyn EngineFactory,
    progress: &dyn ProgressReporter,
) -> Result<DomainOutcome> {
    if !corpus_path.is_file() {
        return Err(PipelineError::PathNotFound {
            path: corpus_path.to_path_buf(),
        });
    }

    progress.phase("Preparing workspace");
    let ws = ensure_domain_workspace(output_dir, name)?;
    let prefix = output_name(name);

    progress.phase("Reading corpus");
    let merged = corpus::read_corpus(corpus_path)?;

    progress.phase("Modelling topics");
    let outcome = finish(
        name,
        &ws.root,
        model_and_write(merged, search_term, factory, &ws, &prefix),
    )?;
    progress.domain_finished(&outcome);
    Ok(outcome)
}

/// Merge every `*.jl` file below `input_dir`, persist the merged corpus,
/// then model it.
#[instrument(skip_all, fields(input = %input_dir.display(), name = %name))]
pub async fn merge_and_model(
    input_dir: &Path,
    output_dir: &Path,
    name: &str,
    search_term: &str,
    factory: &dyn EngineFactory,
    progress: &dyn ProgressReporter,
) -> Result<DomainOutcome> {
    let mut files = corpus::collect_corpus_files(input_dir)?;

    progress.phase("Preparing workspace");
    let ws = ensure_domain_workspace(output_dir, name)?;
    let prefix = output_name(name);
    let merged_path = ws.raw_file(&format!("{prefix}_merged_file.jl"));

    // A previous merge output below the input folder must not be merged again.
    let previous = canonical(&merged_path);
    files.retain(|f| canonical(f) != previous);
    info!(files = files.len(), "collected corpus files");

    progress.phase(&format!("Merging {} files", files.len()));
    let merged = corpus::merge(&files)?;
    corpus::write_corpus(&merged.corpus, &merged_path)?;
    info!(path = %merged_path.display(), records = merged.corpus.len(), "merged corpus written");

    progress.phase("Modelling topics");
    let outcome = finish(
        name,
        &ws.root,
        model_and_write(merged, search_term, factory, &ws, &prefix),
    )?;
    progress.domain_finished(&outcome);
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Drive `stage` for every domain in order, isolating domain-local failures.
async fn run_domains<'a, F, Fut>(
    config: &'a PipelineConfig,
    progress: &dyn ProgressReporter,
    stage: F,
) -> Result<RunReport>
where
    F: Fn(&'a DomainSpec, Workspace) -> Fut,
    Fut: Future<Output = Result<DomainStatus>>,
{
    let start = Instant::now();
    let total = config.domains.len();
    let root = &config.general.output_dir;
    let mut outcomes = Vec::with_capacity(total);

    info!(domains = total, output = %root.display(), "starting run");

    for (i, spec) in config.domains.iter().enumerate() {
        progress.domain_started(&spec.domain, i + 1, total);

        let status = match ensure_domain_workspace(root, &spec.domain) {
            Ok(ws) => stage(spec, ws).await,
            Err(e) => Err(e),
        };
        let outcome = finish(&spec.domain, &root.join(spec.folder_name()), status)?;

        progress.domain_finished(&outcome);
        outcomes.push(outcome);
    }

    let report = RunReport {
        outcomes,
        elapsed: start.elapsed(),
    };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );
    Ok(report)
}

/// Fit, refine, query and persist one corpus.
fn model_and_write(
    merged: MergeReport,
    search_term: &str,
    factory: &dyn EngineFactory,
    ws: &Workspace,
    prefix: &str,
) -> Result<DomainStatus> {
    let MergeReport { corpus, skipped } = merged;
    let records = corpus.len();
    let result = TopicModelDriver::new(factory).run(&corpus, search_term)?;

    let artifacts = write_artifacts(&result, ws, prefix)?;
    Ok(DomainStatus::Completed {
        artifacts,
        records,
        skipped_lines: skipped.len(),
        fitted: result.is_fitted(),
    })
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Turn a stage result into an outcome. Run-fatal errors are returned.
fn finish(domain: &str, workspace: &Path, status: Result<DomainStatus>) -> Result<DomainOutcome> {
    let status = match status {
        Ok(status) => status,
        Err(e) if e.is_run_fatal() => return Err(e),
        Err(PipelineError::ModelDataInsufficiency(reason)) => {
            warn!(
                %domain,
                %reason,
                "not enough data to model topics, skipping artifact writing"
            );
            DomainStatus::Skipped { reason }
        }
        Err(e) => {
            error!(%domain, error = %e, "domain failed, continuing with the next one");
            DomainStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    Ok(DomainOutcome {
        domain: domain.to_string(),
        workspace: workspace.to_path_buf(),
        status,
    })
}
