//! Ollama local model provider.
//!
//! Connects to a locally running Ollama server. No API key required.
//! Single-shot calls retry both connection failures and timeouts, since a
//! local server that is still loading a model often answers late.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::StreamExt;
use modus_core::{
    config::OllamaConfig,
    error::ModusError,
    message::{ChatMessage, GenerationRequest, Readiness},
    traits::{Provider, TextStream},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::http::{ensure_success, response_lines, transport_error};
use crate::retry::{with_retry, RetryPolicy};

const NAME: &str = "ollama";

/// Ollama provider backed by a local server.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    probe_timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaProvider {
    /// Create from config values.
    pub fn from_config(cfg: &OllamaConfig, retry: RetryPolicy) -> Result<Self, ModusError> {
        let client = reqwest::Client::builder()
            .read_timeout(cfg.timeout())
            .build()
            .map_err(|e| ModusError::Config(format!("ollama: failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            timeout: cfg.timeout(),
            probe_timeout: cfg.probe_timeout(),
            retry,
        })
    }

    fn body(&self, request: &GenerationRequest, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: request.messages(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    async fn post_chat(
        &self,
        body: &OllamaChatRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ModusError> {
        let mut builder = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(body);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let resp = builder.send().await.map_err(|e| transport_error(NAME, e))?;
        ensure_success(NAME, resp).await
    }

    /// One non-streaming attempt, including reading the body.
    async fn attempt(&self, body: &OllamaChatRequest) -> Result<String, ModusError> {
        let resp = self.post_chat(body, Some(self.timeout)).await?;
        let parsed: OllamaChatResponse = resp.json().await.map_err(|e| {
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
        Ok(parsed.content())
    }

    async fn installed_models(&self) -> Result<Vec<String>, reqwest::Error> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await?
            .error_for_status()?;
        let tags: OllamaTags = resp.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

// --- Serde types ---

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OllamaChatResponse {
    fn content(self) -> String {
        self.message
            .and_then(|m| m.content)
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    #[serde(default)]
    name: String,
}

/// Content of one newline-delimited stream object. Lines that fail to parse
/// or carry no content yield `None`.
fn stream_line_content(line: &str) -> Option<String> {
    serde_json::from_str::<OllamaChatResponse>(line)
        .ok()?
        .message?
        .content
        .filter(|c| !c.is_empty())
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn check_ready(&self) -> Readiness {
        let models = match self.installed_models().await {
            Ok(m) => m,
            Err(e) if e.is_connect() => {
                warn!("ollama not available: {e}");
                return Readiness::failed(format!(
                    "Could not connect to Ollama at {}. Start Ollama using: ollama serve",
                    self.base_url
                ));
            }
            Err(e) => {
                warn!("ollama status check failed: {e}");
                return Readiness::failed(format!("Failed to check Ollama status: {e}"));
            }
        };

        if !models.iter().any(|m| m == &self.model) {
            return Readiness::failed(format!(
                "Model '{0}' is not installed. Run: ollama pull {0}",
                self.model
            ));
        }
        Readiness::ready()
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ModusError> {
        let body = &self.body(request, false);
        with_retry(
            &self.retry,
            NAME,
            |e| e.is_connection() || e.is_timeout(),
            move |attempt| {
                debug!(
                    "ollama: POST {}/api/chat model={} attempt={attempt}",
                    self.base_url, self.model
                );
                self.attempt(body)
            },
        )
        .await
    }

    async fn complete_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModusError> {
        let body = self.body(request, true);
        debug!(
            "ollama: POST {}/api/chat model={} (stream)",
            self.base_url, self.model
        );

        let resp = self.post_chat(&body, None).await?;
        let mut lines = response_lines(NAME, resp);

        let stream = try_stream! {
            while let Some(line) = lines.next().await {
                if let Some(text) = stream_line_content(&line?) {
                    yield text;
                }
            }
        };
        Ok(stream.boxed())
    }
}
