//! Topic model driver and engine bridge.
//!
//! This crate provides:
//! - [`engine`]: the [`TopicEngine`] contract and the data it returns
//! - [`bridge`]: a JSON-lines subprocess implementation of that contract
//! - [`driver`]: fit → refine → query sequencing with its recovery rules

pub mod bridge;
pub mod driver;
pub mod engine;

pub use bridge::{BridgeEngine, BridgeEngineFactory};
pub use driver::{TOP_N_TOPICS, TopicModelDriver, TopicModelResult};
pub use engine::{
    EngineFactory, FitOutput, FoundTopics, TermWeight, TopicEngine, TopicFrequency, TopicId,
    TopicInfo, VectorizerPolicy, Visualization,
};
