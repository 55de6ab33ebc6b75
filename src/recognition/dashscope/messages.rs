//! Duplex task protocol of the DashScope inference WebSocket
//!
//! - Outgoing: `run-task` (JSON), raw binary PCM, `finish-task` (JSON)
//! - Incoming: `task-started`, `result-generated`, `task-finished`, `task-failed`

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::RecognitionConfig;
use crate::recognition::engine::RecognitionError;
use crate::recognition::result::{RecognitionResult, Sentence};

pub fn run_task(task_id: &str, config: &RecognitionConfig) -> Value {
    json!({
        "header": {
            "action": "run-task",
            "task_id": task_id,
            "streaming": "duplex"
        },
        "payload": {
            "task_group": "audio",
            "task": "asr",
            "function": "recognition",
            "model": config.model,
            "parameters": {
                "format": config.format,
                "sample_rate": config.sample_rate,
                "punctuation_prediction_enabled": config.punctuation_prediction_enabled
            },
            "input": {}
        }
    })
}

pub fn finish_task(task_id: &str) -> Value {
    json!({
        "header": {
            "action": "finish-task",
            "task_id": task_id,
            "streaming": "duplex"
        },
        "payload": {
            "input": {}
        }
    })
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    header: ServerHeader,
    #[serde(default)]
    payload: Option<ServerPayload>,
}

#[derive(Debug, Deserialize)]
struct ServerHeader {
    event: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerPayload {
    #[serde(default)]
    output: Option<ServerOutput>,
}

#[derive(Debug, Deserialize)]
struct ServerOutput {
    #[serde(default)]
    sentence: Option<Sentence>,
}

#[derive(Debug)]
pub enum DashScopeEvent {
    TaskStarted,
    ResultGenerated(DashScopeResult),
    TaskFinished,
    TaskFailed(RecognitionError),
    Unknown(String),
}

impl DashScopeEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let message: ServerMessage = serde_json::from_str(text)?;

        Ok(match message.header.event.as_str() {
            "task-started" => Self::TaskStarted,
            "result-generated" => Self::ResultGenerated(DashScopeResult {
                sentence: message
                    .payload
                    .and_then(|p| p.output)
                    .and_then(|o| o.sentence),
            }),
            "task-finished" => Self::TaskFinished,
            "task-failed" => {
                let text = message
                    .header
                    .error_message
                    .unwrap_or_else(|| "Recognition task failed".to_string());
                Self::TaskFailed(match message.header.error_code {
                    Some(code) => RecognitionError::with_code(code, text),
                    None => RecognitionError::new(text),
                })
            }
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// `result-generated` payload
#[derive(Debug, Clone)]
pub struct DashScopeResult {
    pub sentence: Option<Sentence>,
}

impl RecognitionResult for DashScopeResult {
    fn sentence(&self) -> Option<&Sentence> {
        self.sentence.as_ref()
    }

    /// `sentence_end` when present, otherwise a non-null `end_time`
    fn is_sentence_end(&self, sentence: &Sentence) -> Option<anyhow::Result<bool>> {
        if let Some(flag) = sentence.get("sentence_end") {
            return Some(
                flag.as_bool()
                    .ok_or_else(|| anyhow!("sentence_end is not a boolean: {}", flag)),
            );
        }

        Some(Ok(sentence.get("end_time").is_some_and(|v| !v.is_null())))
    }
}
