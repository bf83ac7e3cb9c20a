//! Core domain types shared by every topicscrape crate.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Format a domain identifier (or user-supplied name) into a folder/file stem.
///
/// `.` and `/` both become `_`, so `example.com/blog` maps to `example_com_blog`.
pub fn output_name(domain: &str) -> String {
    domain.replace(['.', '/'], "_")
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// One line of a line-delimited JSON corpus.
///
/// Only `content` is interpreted; every other field passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Document text fed to the topic engine.
    pub content: String,
    /// Opaque extra fields (url, title, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CorpusRecord {
    /// A record with no extra fields.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Ordered text records gathered for one modelling run.
///
/// Order is file order, then line order; representative documents are
/// correlated back to this sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub records: Vec<CorpusRecord>,
}

impl Corpus {
    pub fn new(records: Vec<CorpusRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `content` column, in corpus order.
    pub fn documents(&self) -> Vec<String> {
        self.records.iter().map(|r| r.content.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_replaces_dots_and_slashes() {
        assert_eq!(output_name("example.com"), "example_com");
        assert_eq!(output_name("news.example.org/world"), "news_example_org_world");
        assert_eq!(output_name("plain"), "plain");
    }

    #[test]
    fn record_keeps_extra_fields() {
        let line = r#"{"content":"Budget policy passed","url":"https://a.com/1","depth":2}"#;
        let record: CorpusRecord = serde_json::from_str(line).expect("parse");
        assert_eq!(record.content, "Budget policy passed");
        assert_eq!(record.extra["url"], "https://a.com/1");
        assert_eq!(record.extra["depth"], 2);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["url"], "https://a.com/1");
        assert_eq!(back["content"], "Budget policy passed");
    }

    #[test]
    fn record_without_content_is_rejected() {
        let line = r#"{"url":"https://a.com/1"}"#;
        assert!(serde_json::from_str::<CorpusRecord>(line).is_err());

        let line = r#"{"content":42}"#;
        assert!(serde_json::from_str::<CorpusRecord>(line).is_err());
    }

    #[test]
    fn corpus_documents_preserve_order() {
        let corpus = Corpus::new(vec![
            CorpusRecord::new("first"),
            CorpusRecord::new("second"),
        ]);
        assert_eq!(corpus.documents(), vec!["first", "second"]);
        assert_eq!(corpus.len(), 2);
        assert!(!corpus.is_empty());
    }
}
