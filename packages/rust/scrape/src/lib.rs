//! Scrape job runner.
//!
//! This crate provides:
//! - [`runner`]: starts the external scraper for one domain and relocates
//!   its output into the domain workspace

pub mod runner;

pub use runner::{ScrapeResult, run, scrape_args};
