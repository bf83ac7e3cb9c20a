//! Topic engine contract.
//!
//! The embedding and clustering math lives in an external engine. This
//! module describes what the driver needs from it: a fit/transform call,
//! label refinement and a handful of read-only queries over the fitted model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use topicscrape_shared::Result;

/// Topic identifier. `-1` is the engine's outlier bucket.
pub type TopicId = i64;

// ---------------------------------------------------------------------------
// Engine data
// ---------------------------------------------------------------------------

/// One row of the aggregate topic table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic: TopicId,
    /// Number of documents assigned to the topic.
    pub count: u64,
    /// Human-readable label, e.g. `0_budget_policy_tax`.
    pub name: String,
}

/// A term and its weight within a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// One row of the topic frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicFrequency {
    pub topic: TopicId,
    pub count: u64,
}

/// Topics most similar to a search term, best first.
///
/// `topics` and `similarity` are parallel; both are empty when nothing
/// matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoundTopics {
    pub topics: Vec<TopicId>,
    pub similarity: Vec<f64>,
}

impl FoundTopics {
    /// `(topic, similarity)` pairs in rank order.
    pub fn pairs(&self) -> impl Iterator<Item = (TopicId, f64)> + '_ {
        self.topics.iter().copied().zip(self.similarity.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Output of fit/transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitOutput {
    /// Topic assigned to each document, in corpus order.
    pub topics: Option<Vec<TopicId>>,
    /// Assignment confidence for each document, in corpus order.
    pub probabilities: Option<Vec<f64>>,
}

/// Tokenization policy used when re-deriving topic labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerPolicy {
    pub stop_words: String,
    /// Inclusive n-gram length range.
    pub ngram_range: (u32, u32),
}

impl VectorizerPolicy {
    /// English stop words removed, n-grams of length 1 through 5.
    pub fn refine() -> Self {
        Self {
            stop_words: "english".into(),
            ngram_range: (1, 5),
        }
    }
}

/// The four HTML visualizations the engine can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visualization {
    Topics,
    Hierarchy,
    Barchart,
    Heatmap,
}

impl Visualization {
    pub const ALL: [Visualization; 4] = [
        Visualization::Topics,
        Visualization::Hierarchy,
        Visualization::Barchart,
        Visualization::Heatmap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topics => "topics",
            Self::Hierarchy => "hierarchy",
            Self::Barchart => "barchart",
            Self::Heatmap => "heatmap",
        }
    }

    /// File name under the workspace `visualizations/` area.
    pub fn file_name(&self) -> String {
        format!("{}_visual.html", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Engine traits
// ---------------------------------------------------------------------------

/// A fitted-or-fittable topic model.
///
/// Implementations report failures with the pipeline error kinds:
/// `ModelResourceExhaustion` when fitting runs out of memory,
/// `ModelDataInsufficiency` when the corpus is too small, `Engine` otherwise.
pub trait TopicEngine {
    fn fit_transform(&mut self, documents: &[String]) -> Result<FitOutput>;

    /// Re-derive topic labels with `policy`. `topics` is `None` when fitting
    /// produced no assignment.
    fn update_topics(
        &mut self,
        documents: &[String],
        topics: Option<&[TopicId]>,
        policy: &VectorizerPolicy,
    ) -> Result<()>;

    fn topic_info(&mut self) -> Result<Vec<TopicInfo>>;

    /// Ranked terms for every topic.
    fn topics(&mut self) -> Result<BTreeMap<TopicId, Vec<TermWeight>>>;

    fn find_topics(&mut self, search_term: &str, top_n: usize) -> Result<FoundTopics>;

    fn representative_docs(&mut self) -> Result<BTreeMap<TopicId, Vec<String>>>;

    fn topic_freq(&mut self) -> Result<Vec<TopicFrequency>>;

    /// Opaque serialized model.
    fn serialize_model(&mut self) -> Result<Vec<u8>>;

    /// Render one visualization as a standalone HTML document.
    fn visualize(&mut self, kind: Visualization) -> Result<String>;

    /// Release engine resources. Called once after the last query.
    fn shutdown(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Creates one fresh engine per modelling run.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn TopicEngine>>;
}
