//! OpenAI-compatible API provider.
//!
//! Works with OpenAI's API and any compatible endpoint. Single-shot calls
//! retry connection failures only; timeouts and API rejections surface at once.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::StreamExt;
use modus_core::{
    config::OpenAiConfig,
    error::ModusError,
    message::{ChatMessage, GenerationRequest, Readiness},
    traits::{Provider, TextStream},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{ensure_success, error_summary, response_lines, transport_error};
use crate::retry::{with_retry, RetryPolicy};

const NAME: &str = "openai";

const MISSING_KEY: &str = "OPENAI_API_KEY is not set. Set it in your environment and run again.";

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(cfg: &OpenAiConfig, retry: RetryPolicy) -> Result<Self, ModusError> {
        let client = reqwest::Client::builder()
            .read_timeout(cfg.timeout())
            .build()
            .map_err(|e| ModusError::Config(format!("openai: failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.trim().to_string(),
            model: cfg.model.clone(),
            timeout: cfg.timeout(),
            retry,
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn body(&self, request: &GenerationRequest, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: request.messages(),
            temperature: request.temperature,
            stream,
        }
    }

    fn require_key(&self) -> Result<(), ModusError> {
        if self.api_key.is_empty() {
            return Err(ModusError::MissingCredential(MISSING_KEY.to_string()));
        }
        Ok(())
    }

    async fn send(
        &self,
        body: &ChatCompletionRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ModusError> {
        let mut builder = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let resp = builder.send().await.map_err(|e| transport_error(NAME, e))?;
        ensure_success(NAME, resp).await
    }
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
pub(crate) struct ChunkChoice {
    pub delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
pub(crate) struct ChunkDelta {
    pub content: Option<String>,
}

/// Text of the first choice, empty when absent.
fn response_text(parsed: ChatCompletionResponse) -> String {
    parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default()
}

/// Outcome of one server-sent-event line.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    /// The server reported a failure mid-stream.
    Error(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
        return SseEvent::Skip;
    };
    if payload == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
        return SseEvent::Skip;
    };
    if value.get("error").is_some_and(|e| !e.is_null()) {
        return SseEvent::Error(error_summary(payload));
    }
    serde_json::from_value::<ChatCompletionChunk>(value)
        .ok()
        .and_then(|c| c.choices.into_iter().next())
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|t| !t.is_empty())
        .map(SseEvent::Delta)
        .unwrap_or(SseEvent::Skip)
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn check_ready(&self) -> Readiness {
        if self.api_key.is_empty() {
            return Readiness::failed(
                "OPENAI_API_KEY is not set. Set it in your environment before running.",
            );
        }
        Readiness::ready()
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ModusError> {
        self.require_key()?;
        let body = &self.body(request, false);

        let resp = with_retry(&self.retry, NAME, ModusError::is_connection, move |attempt| {
            debug!(
                "openai: POST {} model={} attempt={attempt}",
                self.url(),
                self.model
            );
            self.send(body, Some(self.timeout))
        })
        .await?;

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(NAME, e)
            } else {
                ModusError::Api {
                    provider: NAME.to_string(),
                    status: None,
                    message: format!("failed to parse response: {e}"),
                }
            }
        })?;

        Ok(response_text(parsed).trim().to_string())
    }

    async fn complete_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModusError> {
        self.require_key()?;
        let body = self.body(request, true);
        debug!("openai: POST {} model={} (stream)", self.url(), self.model);

        let resp = self.send(&body, None).await?;
        let mut lines = response_lines(NAME, resp);

        let stream = try_stream! {
            while let Some(line) = lines.next().await {
                match parse_sse_line(&line?) {
                    SseEvent::Delta(text) => yield text,
                    SseEvent::Error(message) => {
                        Err::<(), _>(ModusError::Api {
                            provider: NAME.to_string(),
                            status: None,
                            message,
                        })?;
                    }
                    SseEvent::Done => break,
                    SseEvent::Skip => {}
                }
            }
        };
        Ok(stream.boxed())
    }
}
