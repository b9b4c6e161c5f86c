//! Mode resolution and backend dispatch.
//!
//! Every front end goes through [`Dispatcher`]: it resolves `auto` with the
//! classifier, derives the generation controls from the mode, and hands the
//! request to whichever provider was chosen at startup.

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use modus_core::{
    classifier::classify,
    config::{ProviderConfig, ProviderKind},
    error::ModusError,
    message::{Generation, GenerationMetadata, GenerationRequest, Readiness},
    mode::{Mode, ModeSelector},
    traits::{inline_errors, Provider, TextStream},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::retry::RetryPolicy;

/// Mode used when `auto` finds no keyword.
pub const AUTO_FALLBACK: Mode = Mode::Detailed;

/// An answer being produced incrementally.
pub struct StreamingGeneration {
    /// Mode chosen for this answer, known before the first fragment.
    pub mode: Mode,
    /// Fragments in order. Opening the backend happens on first poll.
    pub stream: TextStream,
}

impl StreamingGeneration {
    /// Fragments with any failure rendered as a trailing error marker.
    pub fn into_text(self) -> BoxStream<'static, String> {
        inline_errors(self.stream)
    }
}

/// Routes prompts to the configured provider.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn Provider>,
}

/// Build the provider named by `cfg.default`.
pub fn build_provider(cfg: &ProviderConfig) -> Result<Arc<dyn Provider>, ModusError> {
    let retry = RetryPolicy::from(&cfg.retry);
    let provider: Arc<dyn Provider> = match cfg.kind()? {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(&cfg.openai, retry)?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_config(&cfg.ollama, retry)?),
    };
    Ok(provider)
}

/// Pre-flight check for a configuration. Fails closed on an unknown provider.
pub async fn check_ready(cfg: &ProviderConfig) -> Readiness {
    match build_provider(cfg) {
        Ok(p) => p.check_ready().await,
        Err(e) => Readiness::failed(e.to_string()),
    }
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Build the dispatcher for the configured provider.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, ModusError> {
        Ok(Self::new(build_provider(cfg)?))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Verify the backend is usable. Cheap enough to call before every request.
    pub async fn check_ready(&self) -> Readiness {
        self.provider.check_ready().await
    }

    /// The mode a selector resolves to for `input`.
    pub fn resolve_mode(&self, input: &str, selector: ModeSelector) -> Mode {
        match selector {
            ModeSelector::Auto => classify(input, AUTO_FALLBACK),
            ModeSelector::Fixed(m) => m,
        }
    }

    fn prepare(&self, input: &str, mode: &str) -> Result<GenerationRequest, ModusError> {
        let selector = ModeSelector::parse(mode)?;
        let resolved = self.resolve_mode(input, selector);
        debug!("dispatch: selector={selector} resolved={resolved}");
        Ok(GenerationRequest::new(resolved, input))
    }

    /// Generate one complete answer.
    ///
    /// `mode` is `auto` or a catalog mode name; anything else fails with
    /// [`ModusError::InvalidMode`] before the backend is contacted.
    pub async fn generate(&self, input: &str, mode: &str) -> Result<Generation, ModusError> {
        let request = self.prepare(input, mode)?;
        let start = Instant::now();

        let text = self.provider.complete(&request).await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: answered in {elapsed_ms}ms (mode={})",
            self.provider.name(),
            request.mode
        );

        Ok(Generation {
            mode: request.mode,
            text,
            metadata: GenerationMetadata {
                provider_used: self.provider.name().to_string(),
                model: Some(self.provider.model().to_string()),
                processing_time_ms: elapsed_ms,
            },
        })
    }

    /// Start an incremental answer.
    ///
    /// Only mode validation fails eagerly. Backend failures, including a
    /// refused connection, arrive as the stream's error item.
    pub fn generate_stream(
        &self,
        input: &str,
        mode: &str,
    ) -> Result<StreamingGeneration, ModusError> {
        let request = self.prepare(input, mode)?;
        let mode = request.mode;
        let provider = Arc::clone(&self.provider);

        let stream = stream! {
            match provider.complete_stream(&request).await {
                Ok(mut inner) => {
                    while let Some(item) = inner.next().await {
                        let failed = item.is_err();
                        yield item;
                        if failed {
                            break;
                        }
                    }
                }
                Err(e) => yield Err(e),
            }
        };

        Ok(StreamingGeneration {
            mode,
            stream: stream.boxed(),
        })
    }
}

#[cfg(test)]
mod tests;
