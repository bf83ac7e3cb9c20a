//! Topic model driver.
//!
//! Runs one engine through fit, label refinement and the search-term query,
//! collecting everything the artifact writer needs into a
//! [`TopicModelResult`].

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use topicscrape_shared::{Corpus, PipelineError, Result};

use crate::engine::{
    EngineFactory, FitOutput, FoundTopics, TermWeight, TopicEngine, TopicFrequency, TopicId,
    TopicInfo, VectorizerPolicy, Visualization,
};

/// Number of topics retrieved for the search term.
pub const TOP_N_TOPICS: usize = 15;

// ---------------------------------------------------------------------------
// TopicModelResult
// ---------------------------------------------------------------------------

/// Everything produced by one modelling run. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicModelResult {
    pub search_term: String,
    /// Per-document topic, `None` when fitting ran out of resources.
    pub assignments: Option<Vec<TopicId>>,
    /// Per-document confidence, `None` when fitting ran out of resources.
    pub probabilities: Option<Vec<f64>>,
    pub topic_info: Vec<TopicInfo>,
    pub all_topics: BTreeMap<TopicId, Vec<TermWeight>>,
    pub found_topics: FoundTopics,
    /// Terms of each found topic, in rank order.
    pub found_topic_terms: Vec<(TopicId, Vec<TermWeight>)>,
    pub representative_docs: BTreeMap<TopicId, Vec<String>>,
    pub topic_frequency: Vec<TopicFrequency>,
    pub model_blob: Vec<u8>,
    /// Rendered HTML, in [`Visualization::ALL`] order minus any skipped.
    pub visualizations: Vec<(Visualization, String)>,
}

impl TopicModelResult {
    /// Whether fitting produced a topic assignment.
    pub fn is_fitted(&self) -> bool {
        self.assignments.is_some()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Drives a [`TopicEngine`] obtained from a factory.
pub struct TopicModelDriver<'a> {
    factory: &'a dyn EngineFactory,
}

impl<'a> TopicModelDriver<'a> {
    pub fn new(factory: &'a dyn EngineFactory) -> Self {
        Self { factory }
    }

    /// Fit, refine and query one corpus.
    ///
    /// Resource exhaustion during fit is recovered from. Data insufficiency
    /// anywhere except a single visualization is returned to the caller.
    #[instrument(skip_all, fields(documents = corpus.len(), search_term = %search_term))]
    pub fn run(&self, corpus: &Corpus, search_term: &str) -> Result<TopicModelResult> {
        if corpus.is_empty() {
            return Err(PipelineError::ModelDataInsufficiency(
                "corpus has no documents".into(),
            ));
        }

        let documents = corpus.documents();
        let mut engine = self.factory.create()?;
        let result = drive(engine.as_mut(), &documents, search_term);

        if let Err(e) = engine.shutdown() {
            warn!(error = %e, "topic engine did not shut down cleanly");
        }
        result
    }
}

fn drive(
    engine: &mut dyn TopicEngine,
    documents: &[String],
    search_term: &str,
) -> Result<TopicModelResult> {
    // Fitted
    let fit = match engine.fit_transform(documents) {
        Ok(fit) => fit,
        Err(PipelineError::ModelResourceExhaustion(msg)) => {
            warn!(
                error = %msg,
                "topic engine ran out of resources while fitting, continuing without assignments"
            );
            FitOutput::default()
        }
        Err(e) => return Err(e),
    };
    info!(fitted = fit.topics.is_some(), "fit complete");

    // Refined
    engine.update_topics(documents, fit.topics.as_deref(), &VectorizerPolicy::refine())?;

    // Queried
    let found_topics = engine.find_topics(search_term, TOP_N_TOPICS)?;
    let all_topics = engine.topics()?;
    let found_topic_terms = found_topics
        .topics
        .iter()
        .map(|id| (*id, all_topics.get(id).cloned().unwrap_or_default()))
        .collect();

    let topic_info = engine.topic_info()?;
    let representative_docs = engine.representative_docs()?;
    let topic_frequency = engine.topic_freq()?;
    let model_blob = engine.serialize_model()?;

    let mut visualizations = Vec::with_capacity(Visualization::ALL.len());
    for kind in Visualization::ALL {
        match engine.visualize(kind) {
            Ok(html) => visualizations.push((kind, html)),
            Err(PipelineError::ModelDataInsufficiency(msg)) => {
                warn!(visual = kind.as_str(), error = %msg, "not enough topics to render, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        topics = topic_info.len(),
        matched = found_topics.topics.len(),
        "topic model queried"
    );

    Ok(TopicModelResult {
        search_term: search_term.to_string(),
        assignments: fit.topics,
        probabilities: fit.probabilities,
        topic_info,
        all_topics,
        found_topics,
        found_topic_terms,
        representative_docs,
        topic_frequency,
        model_blob,
        visualizations,
    })
}
