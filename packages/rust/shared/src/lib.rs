//! Shared types, error model, configuration and workspace layout for topicscrape.
//!
//! This crate is the foundation depended on by all other topicscrape crates.
//! It provides:
//! - [`PipelineError`]: the closed error taxonomy
//! - Configuration ([`PipelineConfig`], [`DomainSpec`], [`load`])
//! - Corpus types ([`Corpus`], [`CorpusRecord`])
//! - The per-domain [`Workspace`] layout

pub mod config;
pub mod error;
pub mod types;
pub mod workspace;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    DomainSpec, EngineSettings, GENERAL_SETTINGS, GeneralSettings, PipelineConfig,
    ScraperSettings, load,
};
pub use error::{PipelineError, Result};
pub use types::{Corpus, CorpusRecord, output_name};
pub use workspace::{
    DirState, ML_DATA_DIR, VISUALIZATIONS_DIR, Workspace, ensure_dir, ensure_domain_workspace,
};
