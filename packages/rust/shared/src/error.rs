//! Error types for topicscrape.
//!
//! Library crates use [`PipelineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The settings file does not exist or is not a regular file.
    #[error("config file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// The settings file is missing a required section or key, or a value is invalid.
    #[error("malformed config: {message}")]
    ConfigMalformed { message: String },

    /// A user-supplied input path (corpus file or directory) does not exist.
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The external scraper could not be started or exited unsuccessfully.
    #[error("scrape process failed for {domain}: {message}")]
    ScrapeProcess { domain: String, message: String },

    /// The scraper finished but its output file is not where it should be.
    #[error("scrape output missing: {}", path.display())]
    ScrapeOutputMissing { path: PathBuf },

    /// The topic engine ran out of accelerator (or host) memory while fitting.
    #[error("topic engine exhausted resources: {0}")]
    ModelResourceExhaustion(String),

    /// The corpus is too small for the topic engine to extract topics.
    #[error("not enough data to model topics: {0}")]
    ModelDataInsufficiency(String),

    /// Any other topic engine or bridge failure.
    #[error("topic engine error: {0}")]
    Engine(String),

    /// Data validation error (bad record shape, invalid name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a malformed-config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigMalformed {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole run rather than a single domain.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigMalformed { .. } | Self::PathNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PipelineError::config("missing key CSS_SELECTORS in [example.com]");
        assert_eq!(
            err.to_string(),
            "malformed config: missing key CSS_SELECTORS in [example.com]"
        );

        let err = PipelineError::ScrapeOutputMissing {
            path: PathBuf::from("spider/example_com.jl"),
        };
        assert!(err.to_string().contains("spider/example_com.jl"));
    }

    #[test]
    fn run_fatal_classification() {
        assert!(PipelineError::config("x").is_run_fatal());
        assert!(
            PipelineError::ConfigNotFound {
                path: "settings.ini".into()
            }
            .is_run_fatal()
        );
        assert!(!PipelineError::ModelDataInsufficiency("2 docs".into()).is_run_fatal());
        assert!(!PipelineError::Engine("bridge closed".into()).is_run_fatal());
        assert!(
            !PipelineError::ScrapeProcess {
                domain: "example.com".into(),
                message: "exit status 1".into(),
            }
            .is_run_fatal()
        );
    }
}
