//! Per-domain workspace layout.
//!
//! ```text
//! <output_root>/<domain_folder>/
//! ├── <domain_folder>.jl      raw scrape output (and merged corpora)
//! ├── ml_data/                tabular and model artifacts
//! └── visualizations/         HTML artifacts
//! ```
//!
//! Creation is idempotent: directories left by an earlier run are reused
//! with a warning, never treated as a failure.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::types::output_name;

/// Name of the tabular/model artifact area.
pub const ML_DATA_DIR: &str = "ml_data";

/// Name of the HTML artifact area.
pub const VISUALIZATIONS_DIR: &str = "visualizations";

/// Handle to a domain's directory subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Domain directory; also the raw scrape output area.
    pub root: PathBuf,
    /// `<root>/ml_data`.
    pub ml_data: PathBuf,
    /// `<root>/visualizations`.
    pub visualizations: PathBuf,
}

/// Whether [`ensure_dir`] created the directory or found it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirState {
    Created,
    Existing,
}

impl Workspace {
    /// Path of a raw-area file (scrape output, merged corpus).
    pub fn raw_file(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// `ml_data/<output_name>_<tag>.<ext>`.
    pub fn artifact_path(&self, output_name: &str, tag: &str, ext: &str) -> PathBuf {
        self.ml_data.join(format!("{output_name}_{tag}.{ext}"))
    }

    /// `visualizations/<file_name>`.
    pub fn visualization_path(&self, file_name: &str) -> PathBuf {
        self.visualizations.join(file_name)
    }
}

/// Create (or reuse) the workspace for `domain_name` under `root`.
///
/// `domain_name` is formatted with [`output_name`] first, so
/// `example.com` lands in `<root>/example_com`.
#[instrument(skip_all, fields(root = %root.display(), domain = domain_name))]
pub fn ensure_domain_workspace(root: &Path, domain_name: &str) -> Result<Workspace> {
    let folder = output_name(domain_name.trim());
    if folder.is_empty() {
        return Err(PipelineError::validation("domain name must not be empty"));
    }

    // PathBuf::join normalises trailing separators on the configured root.
    let domain_dir = root.join(&folder);
    let workspace = Workspace {
        ml_data: domain_dir.join(ML_DATA_DIR),
        visualizations: domain_dir.join(VISUALIZATIONS_DIR),
        root: domain_dir,
    };

    for dir in [&workspace.root, &workspace.ml_data, &workspace.visualizations] {
        if ensure_dir(dir)? == DirState::Existing {
            warn!(path = %dir.display(), "directory already exists, reusing it");
        }
    }

    debug!(path = %workspace.root.display(), "workspace ready");
    Ok(workspace)
}

/// Check-or-create a directory as one logical step.
///
/// A path that exists but is not a directory is an error.
pub fn ensure_dir(path: &Path) -> Result<DirState> {
    if path.is_dir() {
        return Ok(DirState::Existing);
    }

    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(DirState::Created),
        // Lost a race with another creator; still fine if it is a directory now.
        Err(_) if path.is_dir() => Ok(DirState::Existing),
        Err(e) => Err(PipelineError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_all_three_areas() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "example.com").unwrap();

        assert_eq!(ws.root, tmp.path().join("example_com"));
        assert!(ws.root.is_dir());
        assert!(ws.ml_data.is_dir());
        assert!(ws.visualizations.is_dir());
    }

    #[test]
    fn rerun_reuses_existing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let first = ensure_domain_workspace(tmp.path(), "example.com").unwrap();
        std::fs::write(first.ml_data.join("keep.csv"), "old").unwrap();

        let second = ensure_domain_workspace(tmp.path(), "example.com").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            std::fs::read_to_string(second.ml_data.join("keep.csv")).unwrap(),
            "old"
        );

        // Exactly one domain directory, no matter how often we ensure it.
        let count = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn partial_workspace_is_completed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("example_com/ml_data")).unwrap();

        let ws = ensure_domain_workspace(tmp.path(), "example.com").unwrap();
        assert!(ws.visualizations.is_dir());
    }

    #[test]
    fn trailing_slash_on_root_is_normalised() {
        let tmp = tempfile::tempdir().unwrap();
        let with_slash = PathBuf::from(format!("{}/", tmp.path().display()));

        let a = ensure_domain_workspace(tmp.path(), "a.org").unwrap();
        let b = ensure_domain_workspace(&with_slash, "a.org").unwrap();
        assert_eq!(a.root.canonicalize().unwrap(), b.root.canonicalize().unwrap());
        assert!(b.root.ends_with("a_org"));
    }

    #[test]
    fn missing_output_root_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested/out");
        let ws = ensure_domain_workspace(&root, "a.org").unwrap();
        assert!(ws.ml_data.is_dir());
    }

    #[test]
    fn file_in_the_way_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a_org"), "not a dir").unwrap();

        let err = ensure_domain_workspace(tmp.path(), "a.org").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn artifact_naming_convention() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "a.org").unwrap();

        assert_eq!(
            ws.artifact_path("individual_domain", "TOPIC_INFO", "csv"),
            ws.ml_data.join("individual_domain_TOPIC_INFO.csv")
        );
        assert_eq!(
            ws.visualization_path("topics_visual.html"),
            ws.visualizations.join("topics_visual.html")
        );
        assert_eq!(ws.raw_file("a_org.jl"), ws.root.join("a_org.jl"));
    }
}
