//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use topicscrape_core::{
    DomainOutcome, DomainStatus, ProgressReporter, RunReport, merge_and_model, model_only,
    run_per_domain, scrape_only,
};
use topicscrape_shared::{EngineSettings, PipelineConfig, load};
use topicscrape_topics::BridgeEngineFactory;

/// Settings file used when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "settings.ini";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// topicscrape: scrape websites and model what they talk about.
#[derive(Parser)]
#[command(
    name = "topicscrape",
    version,
    about = "Scrape configured domains, merge the results and run topic modelling on them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Topic engine command, overriding TOPIC_ENGINE_COMMAND from the settings file.
    #[arg(long, env = "TOPICSCRAPE_ENGINE_COMMAND", global = true)]
    pub engine_command: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape, model and write artifacts for every configured domain.
    #[command(alias = "individual-snb")]
    Run {
        /// Settings file (prompted if omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Scrape every configured domain without modelling.
    #[command(alias = "only-scrape")]
    Scrape {
        /// Settings file (prompted if omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Model a single existing corpus file.
    #[command(alias = "only-bert")]
    Model {
        /// Line-delimited JSON corpus file.
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Output root directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Name used for the workspace folder and artifact prefix.
        #[arg(short, long)]
        name: Option<String>,

        /// Term to search topics for.
        #[arg(short, long)]
        search_term: Option<String>,

        /// Settings file to take the engine command from.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Merge every corpus file below a directory, then model the result.
    #[command(alias = "combined-bert")]
    Merge {
        /// Directory searched recursively for `*.jl` files.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output root directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Name used for the workspace folder and artifact prefix.
        #[arg(short, long)]
        name: Option<String>,

        /// Term to search topics for.
        #[arg(short, long)]
        search_term: Option<String>,

        /// Settings file to take the engine command from.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a settings file and print the resolved configuration.
    Check {
        /// Settings file.
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topicscrape=info",
        1 => "topicscrape=debug",
        _ => "topicscrape=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let engine_override = cli.engine_command.as_deref();

    match cli.command {
        Command::Run { config } => cmd_run(config, engine_override).await,
        Command::Scrape { config } => cmd_scrape(config).await,
        Command::Model {
            corpus,
            out,
            name,
            search_term,
            config,
        } => {
            let corpus = path_or_prompt(corpus, "Corpus file (.jl)")?;
            let job = ModelJob::resolve(out, name, search_term, config, engine_override)?;
            cmd_model(&corpus, job).await
        }
        Command::Merge {
            input,
            out,
            name,
            search_term,
            config,
        } => {
            let input = path_or_prompt(input, "Folder with corpus files")?;
            let job = ModelJob::resolve(out, name, search_term, config, engine_override)?;
            cmd_merge(&input, job).await
        }
        Command::Check { config } => cmd_check(&config),
    }
}

async fn cmd_run(config: Option<PathBuf>, engine_override: Option<&str>) -> Result<()> {
    let config_path = path_or_prompt(config, "Settings file")?;
    let config = load(&config_path)?;
    let factory = BridgeEngineFactory::new(engine_settings(engine_override, &config)?);

    info!(
        config = %config_path.display(),
        domains = config.domains.len(),
        "running per-domain pipeline"
    );

    let reporter = CliProgress::new();
    let report = run_per_domain(&config, &factory, &reporter).await?;
    reporter.finish();

    print_report("Per-domain run finished", &report);
    Ok(())
}

async fn cmd_scrape(config: Option<PathBuf>) -> Result<()> {
    let config_path = path_or_prompt(config, "Settings file")?;
    let config = load(&config_path)?;

    info!(domains = config.domains.len(), "scraping configured domains");

    let reporter = CliProgress::new();
    let report = scrape_only(&config, &reporter).await?;
    reporter.finish();

    print_report("Scrape finished", &report);
    Ok(())
}

async fn cmd_model(corpus: &Path, job: ModelJob) -> Result<()> {
    let factory = BridgeEngineFactory::new(job.engine);
    let reporter = CliProgress::new();
    let outcome = model_only(
        corpus,
        &job.out,
        &job.name,
        &job.search_term,
        &factory,
        &reporter,
    )
    .await?;
    reporter.finish();

    print_single(&outcome)
}

async fn cmd_merge(input: &Path, job: ModelJob) -> Result<()> {
    let factory = BridgeEngineFactory::new(job.engine);
    let reporter = CliProgress::new();
    let outcome = merge_and_model(
        input,
        &job.out,
        &job.name,
        &job.search_term,
        &factory,
        &reporter,
    )
    .await?;
    reporter.finish();

    print_single(&outcome)
}

fn cmd_check(path: &Path) -> Result<()> {
    let config = load(path)?;
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to serialize config: {e}"))?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Parameter resolution
// ---------------------------------------------------------------------------

/// Parameters shared by the model-only and merge-and-model modes.
struct ModelJob {
    out: PathBuf,
    name: String,
    search_term: String,
    engine: EngineSettings,
}

impl ModelJob {
    fn resolve(
        out: Option<PathBuf>,
        name: Option<String>,
        search_term: Option<String>,
        config: Option<PathBuf>,
        engine_override: Option<&str>,
    ) -> Result<Self> {
        let config = config.as_deref().map(load).transpose()?;

        let out = path_or_prompt(out, "Output folder")?;
        let name = text_or_prompt(name, "Output name", None)?;
        let default_term = config.as_ref().and_then(|c| c.general.search_term.clone());
        let search_term = text_or_prompt(search_term, "Search term", default_term)?;

        let engine = match &config {
            Some(config) => engine_settings(engine_override, config)?,
            None => match engine_override {
                Some(cmd) => parse_engine_command(cmd)?,
                None => EngineSettings::default(),
            },
        };

        Ok(Self {
            out,
            name,
            search_term,
            engine,
        })
    }
}

fn engine_settings(engine_override: Option<&str>, config: &PipelineConfig) -> Result<EngineSettings> {
    match engine_override {
        Some(cmd) => parse_engine_command(cmd),
        None => Ok(config.general.engine.clone()),
    }
}

fn parse_engine_command(raw: &str) -> Result<EngineSettings> {
    let command: Vec<String> = raw.split_whitespace().map(String::from).collect();
    if command.is_empty() {
        return Err(eyre!("engine command must name a program"));
    }
    Ok(EngineSettings { command })
}

fn path_or_prompt(value: Option<PathBuf>, prompt: &str) -> Result<PathBuf> {
    match value {
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(text_or_prompt(None, prompt, None)?)),
    }
}

fn text_or_prompt(value: Option<String>, prompt: &str, default: Option<String>) -> Result<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }

    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    let answer = input.interact_text()?;
    Ok(answer.trim().to_string())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(title: &str, report: &RunReport) {
    println!();
    println!("  {title}");
    for outcome in &report.outcomes {
        println!("  {}", describe(outcome));
    }
    println!(
        "  Done:   {} succeeded, {} not completed",
        report.succeeded(),
        report.failed()
    );
    println!("  Time:   {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_single(outcome: &DomainOutcome) -> Result<()> {
    println!();
    println!("  {}", describe(outcome));
    println!("  Path:   {}", outcome.workspace.display());
    println!();

    match &outcome.status {
        DomainStatus::Failed { error } => Err(eyre!("{}: {error}", outcome.domain)),
        _ => Ok(()),
    }
}

fn describe(outcome: &DomainOutcome) -> String {
    match &outcome.status {
        DomainStatus::Completed {
            artifacts,
            records,
            skipped_lines,
            fitted,
        } => {
            let fit_note = if *fitted { "" } else { ", no topic assignment" };
            format!(
                "✓ {}: {records} documents ({skipped_lines} lines skipped), {} artifacts{fit_note}",
                outcome.domain,
                artifacts.len()
            )
        }
        DomainStatus::Scraped { output } => {
            format!("✓ {}: scraped to {}", outcome.domain, output.display())
        }
        DomainStatus::Skipped { reason } => {
            format!("- {}: skipped ({reason})", outcome.domain)
        }
        DomainStatus::Failed { error } => format!("✗ {}: {error}", outcome.domain),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn domain_started(&self, domain: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {domain}"));
    }

    fn domain_finished(&self, outcome: &DomainOutcome) {
        self.spinner.println(describe(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_mode_names_are_aliases() {
        let cli = Cli::parse_from(["topicscrape", "individual-snb", "--config", "s.ini"]);
        assert!(matches!(cli.command, Command::Run { config: Some(_) }));

        let cli = Cli::parse_from(["topicscrape", "only-scrape"]);
        assert!(matches!(cli.command, Command::Scrape { config: None }));

        let cli = Cli::parse_from(["topicscrape", "only-bert", "--corpus", "c.jl"]);
        assert!(matches!(cli.command, Command::Model { corpus: Some(_), .. }));

        let cli = Cli::parse_from(["topicscrape", "combined-bert", "--input", "parts"]);
        assert!(matches!(cli.command, Command::Merge { input: Some(_), .. }));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "topicscrape",
            "model",
            "-vv",
            "--log-format",
            "json",
            "--engine-command",
            "uv run bridge.py",
            "--name",
            "city.news",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert_eq!(cli.engine_command.as_deref(), Some("uv run bridge.py"));
    }

    #[test]
    fn engine_override_wins_over_config() {
        let config = PipelineConfig::from_ini_str(
            "[General Settings]\nOUTPUT_FILE_DIRECTORY = out\nTOPIC_ENGINE_COMMAND = python3 bridge.py\n",
        )
        .unwrap();

        let settings = engine_settings(None, &config).unwrap();
        assert_eq!(settings.command, vec!["python3", "bridge.py"]);

        let settings = engine_settings(Some("uv run  bridge.py"), &config).unwrap();
        assert_eq!(settings.command, vec!["uv", "run", "bridge.py"]);

        assert!(parse_engine_command("   ").is_err());
    }

    #[test]
    fn provided_values_skip_the_prompt() {
        assert_eq!(
            text_or_prompt(Some("policy".into()), "Search term", None).unwrap(),
            "policy"
        );
        assert_eq!(
            path_or_prompt(Some(PathBuf::from("/tmp/out")), "Output folder").unwrap(),
            PathBuf::from("/tmp/out")
        );
    }
}
