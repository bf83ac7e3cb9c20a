//! Artifact writer.
//!
//! Persists everything in a [`TopicModelResult`] under a domain
//! [`Workspace`]:
//!
//! ```text
//! <workspace>/
//! ├── ml_data/
//! │   ├── <name>_TOPIC_INFO.csv
//! │   ├── <name>_ALL_TOPIC_INFO.csv
//! │   ├── <name>_FOUND_TOPICS.csv
//! │   ├── <name>_REPRESENTATIVE_DOCS.csv
//! │   ├── <name>_TOPIC_FREQUENCY.csv
//! │   ├── <name>_FORMATTED_FOUND_TOPICS.csv
//! │   ├── <name>_FORMATTED_ALL_TOPICS.csv
//! │   └── <name>_TOPIC_MODEL.bin
//! └── visualizations/
//!     └── {topics,hierarchy,barchart,heatmap}_visual.html
//! ```
//!
//! Every file is written to a hidden temp file first and renamed into place,
//! so an existing artifact is either fully replaced or left untouched.

pub mod format;
pub mod table;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use topicscrape_shared::{PipelineError, Result, Workspace};
use topicscrape_topics::TopicModelResult;

pub use format::{formatted_all_topics, formatted_found_topics};
pub use table::Table;

// ---------------------------------------------------------------------------
// Artifact tags
// ---------------------------------------------------------------------------

/// The fixed set of `ml_data` artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactTag {
    TopicInfo,
    AllTopicInfo,
    FoundTopics,
    RepresentativeDocs,
    TopicFrequency,
    FormattedFoundTopics,
    FormattedAllTopics,
    TopicModel,
}

impl ArtifactTag {
    pub const ALL: [ArtifactTag; 8] = [
        ArtifactTag::TopicInfo,
        ArtifactTag::AllTopicInfo,
        ArtifactTag::FoundTopics,
        ArtifactTag::RepresentativeDocs,
        ArtifactTag::TopicFrequency,
        ArtifactTag::FormattedFoundTopics,
        ArtifactTag::FormattedAllTopics,
        ArtifactTag::TopicModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopicInfo => "TOPIC_INFO",
            Self::AllTopicInfo => "ALL_TOPIC_INFO",
            Self::FoundTopics => "FOUND_TOPICS",
            Self::RepresentativeDocs => "REPRESENTATIVE_DOCS",
            Self::TopicFrequency => "TOPIC_FREQUENCY",
            Self::FormattedFoundTopics => "FORMATTED_FOUND_TOPICS",
            Self::FormattedAllTopics => "FORMATTED_ALL_TOPICS",
            Self::TopicModel => "TOPIC_MODEL",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::TopicModel => "bin",
            _ => "csv",
        }
    }

    /// `ml_data/<output_name>_<TAG>.<ext>` inside `workspace`.
    pub fn path(&self, workspace: &Workspace, output_name: &str) -> PathBuf {
        workspace.artifact_path(output_name, self.as_str(), self.extension())
    }

    fn render(&self, result: &TopicModelResult) -> Vec<u8> {
        let text = match self {
            Self::TopicInfo => format::topic_info_table(&result.topic_info).to_text(),
            Self::AllTopicInfo => format::all_topics_text(&result.all_topics),
            Self::FoundTopics => format::found_topics_table(&result.found_topics).to_text(),
            Self::RepresentativeDocs => {
                format::representative_docs_text(&result.representative_docs)
            }
            Self::TopicFrequency => {
                format::topic_frequency_table(&result.topic_frequency).to_text()
            }
            Self::FormattedFoundTopics => formatted_found_topics(result).to_csv(),
            Self::FormattedAllTopics => formatted_all_topics(result).to_csv(),
            Self::TopicModel => return result.model_blob.clone(),
        };
        text.into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub ml_data: Vec<PathBuf>,
    pub visualizations: Vec<PathBuf>,
}

impl WrittenArtifacts {
    pub fn len(&self) -> usize {
        self.ml_data.len() + self.visualizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write all artifacts for `result` into `workspace`, prefixed by `output_name`.
///
/// Existing files with the same names are replaced; anything else already
/// in the workspace is left alone.
#[instrument(skip_all, fields(workspace = %workspace.root.display(), output_name = %output_name))]
pub fn write_artifacts(
    result: &TopicModelResult,
    workspace: &Workspace,
    output_name: &str,
) -> Result<WrittenArtifacts> {
    let mut written = WrittenArtifacts::default();

    for tag in ArtifactTag::ALL {
        let path = tag.path(workspace, output_name);
        write_atomic(&path, &tag.render(result))?;
        written.ml_data.push(path);
    }

    for (kind, html) in &result.visualizations {
        let path = workspace.visualization_path(&kind.file_name());
        write_atomic(&path, html.as_bytes())?;
        written.visualizations.push(path);
    }

    info!(
        ml_data = written.ml_data.len(),
        visualizations = written.visualizations.len(),
        "artifacts written"
    );
    Ok(written)
}

/// Write `content` to a hidden sibling temp file, then rename over `target`.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            PipelineError::validation(format!("not a file path: {}", target.display()))
        })?;
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| PipelineError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| PipelineError::io(target, e))?;

    debug!(file = %file_name, size = content.len(), "wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicscrape_shared::ensure_domain_workspace;
    use topicscrape_topics::{TopicInfo, Visualization};

    fn result() -> TopicModelResult {
        TopicModelResult {
            search_term: "policy".into(),
            topic_info: vec![TopicInfo {
                topic: 0,
                count: 5,
                name: "0_budget_tax".into(),
            }],
            model_blob: vec![0, 159, 146, 150],
            visualizations: Visualization::ALL
                .iter()
                .map(|k| (*k, format!("<html>{}</html>", k.as_str())))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn tag_file_names() {
        let names: Vec<String> = ArtifactTag::ALL
            .iter()
            .map(|t| format!("x_{}.{}", t.as_str(), t.extension()))
            .collect();
        assert!(names.contains(&"x_REPRESENTATIVE_DOCS.csv".to_string()));
        assert!(names.contains(&"x_TOPIC_MODEL.bin".to_string()));
        assert_eq!(names.iter().filter(|n| n.ends_with(".csv")).count(), 7);
    }

    #[test]
    fn writes_full_artifact_set() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "example.com").unwrap();

        let written = write_artifacts(&result(), &ws, "individual_domain").unwrap();
        assert_eq!(written.ml_data.len(), 8);
        assert_eq!(written.visualizations.len(), 4);

        let info = std::fs::read_to_string(ws.ml_data.join("individual_domain_TOPIC_INFO.csv"))
            .unwrap();
        assert!(info.contains("0_budget_tax"));

        let blob = std::fs::read(ws.ml_data.join("individual_domain_TOPIC_MODEL.bin")).unwrap();
        assert_eq!(blob, vec![0, 159, 146, 150]);

        for kind in Visualization::ALL {
            assert!(ws.visualizations.join(kind.file_name()).is_file());
        }
    }

    #[test]
    fn skipped_visuals_are_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "a.org").unwrap();
        let mut r = result();
        r.visualizations.retain(|(k, _)| *k != Visualization::Hierarchy);

        let written = write_artifacts(&r, &ws, "a_org").unwrap();
        assert_eq!(written.visualizations.len(), 3);
        assert!(!ws.visualizations.join("hierarchy_visual.html").exists());
    }

    #[test]
    fn overwrites_own_files_and_keeps_others() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "a.org").unwrap();
        let target = ws.ml_data.join("a_org_TOPIC_INFO.csv");
        let unrelated = ws.ml_data.join("notes.txt");
        std::fs::write(&target, "stale").unwrap();
        std::fs::write(&unrelated, "mine").unwrap();

        write_artifacts(&result(), &ws, "a_org").unwrap();

        assert_ne!(std::fs::read_to_string(&target).unwrap(), "stale");
        assert_eq!(std::fs::read_to_string(&unrelated).unwrap(), "mine");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = ensure_domain_workspace(tmp.path(), "a.org").unwrap();
        write_artifacts(&result(), &ws, "a_org").unwrap();

        for dir in [&ws.ml_data, &ws.visualizations] {
            for entry in std::fs::read_dir(dir).unwrap() {
                let name = entry.unwrap().file_name().to_string_lossy().to_string();
                assert!(!name.starts_with('.'), "temp file left behind: {name}");
            }
        }
    }
}
