//! Subprocess topic engine.
//!
//! Starts the configured engine command and talks to it over a JSON-lines
//! protocol on stdin/stdout. The engine announces itself with a `ready`
//! message, then answers one `call` at a time until it receives `shutdown`.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use topicscrape_shared::{EngineSettings, PipelineError, Result};

use crate::engine::{
    EngineFactory, FitOutput, FoundTopics, TermWeight, TopicEngine, TopicFrequency, TopicId,
    TopicInfo, VectorizerPolicy, Visualization,
};

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// A method call, serialized as `{"method": ..., "params": ...}`.
#[derive(Debug, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
enum EngineCall<'a> {
    FitTransform {
        documents: &'a [String],
    },
    UpdateTopics {
        documents: &'a [String],
        topics: Option<&'a [TopicId]>,
        vectorizer: &'a VectorizerPolicy,
    },
    TopicInfo,
    Topics,
    FindTopics {
        search_term: &'a str,
        top_n: usize,
    },
    RepresentativeDocs,
    TopicFreq,
    SerializeModel,
    Visualize {
        kind: Visualization,
    },
}

impl EngineCall<'_> {
    fn method(&self) -> &'static str {
        match self {
            Self::FitTransform { .. } => "fit_transform",
            Self::UpdateTopics { .. } => "update_topics",
            Self::TopicInfo => "topic_info",
            Self::Topics => "topics",
            Self::FindTopics { .. } => "find_topics",
            Self::RepresentativeDocs => "representative_docs",
            Self::TopicFreq => "topic_freq",
            Self::SerializeModel => "serialize_model",
            Self::Visualize { .. } => "visualize",
        }
    }
}

/// Request message sent to the engine.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Call { id: String, call: EngineCall<'a> },
    Shutdown,
}

/// Failure class reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EngineErrorKind {
    ResourceExhausted,
    InsufficientData,
    #[default]
    #[serde(other)]
    Other,
}

/// Response message received from the engine.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Result {
        id: String,
        #[serde(default)]
        result: serde_json::Value,
    },
    Error {
        id: String,
        #[serde(default)]
        kind: EngineErrorKind,
        error: String,
    },
}

fn engine_error(kind: EngineErrorKind, message: String) -> PipelineError {
    match kind {
        EngineErrorKind::ResourceExhausted => PipelineError::ModelResourceExhaustion(message),
        EngineErrorKind::InsufficientData => PipelineError::ModelDataInsufficiency(message),
        EngineErrorKind::Other => PipelineError::Engine(message),
    }
}

// ---------------------------------------------------------------------------
// Bridge engine
// ---------------------------------------------------------------------------

/// Handle to a spawned engine process.
pub struct BridgeEngine {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
    finished: bool,
}

impl BridgeEngine {
    /// Spawn the engine and wait for its ready signal.
    pub fn spawn(settings: &EngineSettings) -> Result<Self> {
        let (program, args) = settings
            .command
            .split_first()
            .ok_or_else(|| PipelineError::Engine("engine command is empty".into()))?;

        info!(cmd = %program, "spawning topic engine");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Engine logs go to parent stderr
            .spawn()
            .map_err(|e| {
                PipelineError::Engine(format!(
                    "failed to spawn engine: {e}. Is `{program}` installed?"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::Engine("failed to capture engine stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Engine("failed to capture engine stdout".into()))?;

        let mut engine = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
            finished: false,
        };
        engine.wait_for_ready()?;
        Ok(engine)
    }

    fn read_message(&mut self) -> Result<(ResponseMessage, String)> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| PipelineError::Engine(format!("engine read error: {e}")))?;

        if line.is_empty() {
            return Err(PipelineError::Engine(
                "engine closed stdout unexpectedly".into(),
            ));
        }

        let msg = serde_json::from_str(line.trim()).map_err(|e| {
            PipelineError::Engine(format!(
                "invalid engine message: {e} (got: {})",
                truncate(&line, 200)
            ))
        })?;
        Ok((msg, line))
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            (ResponseMessage::Ready, _) => {
                info!("topic engine is ready");
                Ok(())
            }
            (_, line) => Err(PipelineError::Engine(format!(
                "expected ready message, got: {}",
                truncate(&line, 200)
            ))),
        }
    }

    /// Send one call and decode its result.
    fn call<T: DeserializeOwned>(&mut self, call: EngineCall<'_>) -> Result<T> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);
        let method = call.method();

        let json = serde_json::to_string(&RequestMessage::Call {
            id: id.clone(),
            call,
        })
        .map_err(|e| PipelineError::Engine(format!("failed to serialize request: {e}")))?;

        debug!(%id, method, "engine call");
        writeln!(self.stdin, "{json}").map_err(|e| {
            PipelineError::Engine(format!("failed to write to engine stdin: {e}"))
        })?;
        self.stdin
            .flush()
            .map_err(|e| PipelineError::Engine(format!("failed to flush engine stdin: {e}")))?;

        match self.read_message()?.0 {
            ResponseMessage::Result {
                id: resp_id,
                result,
            } if resp_id == id => serde_json::from_value(result).map_err(|e| {
                PipelineError::Engine(format!("unexpected {method} result shape: {e}"))
            }),
            ResponseMessage::Error {
                id: resp_id,
                kind,
                error,
            } if resp_id == id => Err(engine_error(kind, error)),
            ResponseMessage::Ready => Err(PipelineError::Engine(format!(
                "unexpected ready message during {method}"
            ))),
            ResponseMessage::Result { id: resp_id, .. }
            | ResponseMessage::Error { id: resp_id, .. } => Err(PipelineError::Engine(format!(
                "response id mismatch: sent {id}, got {resp_id}"
            ))),
        }
    }
}

impl TopicEngine for BridgeEngine {
    fn fit_transform(&mut self, documents: &[String]) -> Result<FitOutput> {
        self.call(EngineCall::FitTransform { documents })
    }

    fn update_topics(
        &mut self,
        documents: &[String],
        topics: Option<&[TopicId]>,
        policy: &VectorizerPolicy,
    ) -> Result<()> {
        let _: serde_json::Value = self.call(EngineCall::UpdateTopics {
            documents,
            topics,
            vectorizer: policy,
        })?;
        Ok(())
    }

    fn topic_info(&mut self) -> Result<Vec<TopicInfo>> {
        self.call(EngineCall::TopicInfo)
    }

    fn topics(&mut self) -> Result<BTreeMap<TopicId, Vec<TermWeight>>> {
        self.call(EngineCall::Topics)
    }

    fn find_topics(&mut self, search_term: &str, top_n: usize) -> Result<FoundTopics> {
        self.call(EngineCall::FindTopics { search_term, top_n })
    }

    fn representative_docs(&mut self) -> Result<BTreeMap<TopicId, Vec<String>>> {
        self.call(EngineCall::RepresentativeDocs)
    }

    fn topic_freq(&mut self) -> Result<Vec<TopicFrequency>> {
        self.call(EngineCall::TopicFreq)
    }

    fn serialize_model(&mut self) -> Result<Vec<u8>> {
        let encoded: String = self.call(EngineCall::SerializeModel)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| PipelineError::Engine(format!("model blob is not valid base64: {e}")))
    }

    fn visualize(&mut self, kind: Visualization) -> Result<String> {
        self.call(EngineCall::Visualize { kind })
    }

    /// Send shutdown and wait for the engine to exit.
    fn shutdown(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        this.finished = true;

        if let Ok(json) = serde_json::to_string(&RequestMessage::Shutdown) {
            let _ = writeln!(this.stdin, "{json}");
            let _ = this.stdin.flush();
        }

        match this.child.wait() {
            Ok(status) => info!(?status, "topic engine exited"),
            Err(e) => warn!("topic engine wait error: {e}"),
        }
        Ok(())
    }
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn truncate(line: &str, max: usize) -> &str {
    let line = line.trim_end();
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Spawns a fresh [`BridgeEngine`] per modelling run.
#[derive(Debug, Clone)]
pub struct BridgeEngineFactory {
    settings: EngineSettings,
}

impl BridgeEngineFactory {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl EngineFactory for BridgeEngineFactory {
    fn create(&self) -> Result<Box<dyn TopicEngine>> {
        Ok(Box::new(BridgeEngine::spawn(&self.settings)?))
    }
}
