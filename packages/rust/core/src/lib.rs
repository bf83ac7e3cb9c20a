//! Core pipeline orchestration for topicscrape.
//!
//! This crate ties together the scrape runner, corpus merging, the topic
//! model driver and the artifact writer into the four run modes
//! (per-domain, scrape-only, model-only, merge-and-model).

pub mod corpus;
pub mod pipeline;

pub use corpus::{MergeReport, SkippedLine, collect_corpus_files, merge, read_corpus, write_corpus};
pub use pipeline::{
    DomainOutcome, DomainStatus, INDIVIDUAL_DOMAIN_OUTPUT_NAME, ProgressReporter, RunReport,
    SilentProgress, merge_and_model, model_only, run_per_domain, scrape_only,
};
