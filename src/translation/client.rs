use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::language::TranslationRequest;
use crate::config::TranslationConfig;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation service returned {status}: {code} - {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("translation service returned no text")]
    Empty,

    #[error("translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Request/response translation service
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    result_format: &'static str,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// DashScope text-generation API used as a translator
pub struct DashScopeTranslator {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl DashScopeTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build translation HTTP client")?;

        Ok(Self {
            http,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
        })
    }
}

#[async_trait]
impl Translator for DashScopeTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let body = GenerationRequest {
            model: &self.model,
            input: GenerationInput {
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: request.system_instruction,
                    },
                    ChatMessage {
                        role: "user",
                        content: &request.text,
                    },
                ],
            },
            parameters: GenerationParameters {
                result_format: "message",
            },
        };

        let mut call = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        debug!("Translating {} -> {}: {}", request.source, request.target, request.text);

        let response = call.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let failure = response.json::<FailureBody>().await.unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                code: failure.code,
                message: failure.message,
            });
        }

        let generation: GenerationResponse = response.json().await?;

        generation
            .output
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(TranslationError::Empty)
    }
}
