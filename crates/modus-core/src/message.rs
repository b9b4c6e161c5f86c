use serde::{Deserialize, Serialize};

use crate::mode::Mode;

/// One message of the exchange sent to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Everything a backend needs to produce one answer.
///
/// Built by the dispatcher; every mode-dependent control has already been
/// derived by the time a backend sees it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Mode that shaped this request.
    pub mode: Mode,
    /// System instruction for `mode`.
    pub system: String,
    /// User text, possibly with folded history.
    pub prompt: String,
    pub temperature: f32,
    /// Output-length budget in tokens.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Derive a request for `prompt` under `mode`.
    pub fn new(mode: Mode, prompt: &str) -> Self {
        Self {
            mode,
            system: mode.instruction().to_string(),
            prompt: prompt.to_string(),
            temperature: mode.temperature(),
            max_tokens: mode.max_tokens(),
        }
    }

    /// The two-message exchange: system instruction, then user text.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: self.system.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: self.prompt.clone(),
            },
        ]
    }
}

/// A finished single-shot answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// Mode actually used, after classification.
    pub mode: Mode,
    /// Trimmed answer text. Empty when the backend sent no content.
    pub text: String,
    pub metadata: GenerationMetadata,
}

/// Metadata about how an answer was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Model identifier (if the backend reported one).
    pub model: Option<String>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Outcome of a pre-flight backend check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub ok: bool,
    /// Explanation when not ready; empty otherwise.
    pub message: String,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}
