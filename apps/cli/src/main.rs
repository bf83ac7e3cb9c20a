//! topicscrape CLI: scrape configured domains and model their topics.
//!
//! Drives the external scraper and topic engine, and writes per-domain
//! topic tables, a serialized model and HTML visualizations.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
