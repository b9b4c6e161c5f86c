mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ModusError;
use defaults::*;

/// Top-level Modus configuration.
///
/// Built once at startup and treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub modus: ModusConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub web: WebConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModusConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ModusConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// The backends Modus can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted OpenAI chat completions.
    OpenAi,
    /// Locally running Ollama server.
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ModusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ModusError::MisconfiguredProvider(
                "Invalid AI_PROVIDER. Use 'ollama' or 'openai'.".to_string(),
            )),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend handles every request: "openai" or "ollama".
    #[serde(default = "default_provider")]
    pub default: String,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the configured provider identity.
    pub fn kind(&self) -> Result<ProviderKind, ModusError> {
        self.default.parse()
    }
}

/// OpenAI-compatible provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Per-attempt bound on a single-shot call, and the idle bound on a stream.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ollama local provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Per-attempt bound on a generation call. Local inference can be slow.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// Bound on the readiness probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            timeout_secs: default_generation_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Retry policy for single-shot generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n` units before the next try.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// Web front end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Require a form login before the chat endpoints answer.
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default = "default_web_username")]
    pub username: String,
    #[serde(default = "default_web_password")]
    pub password: String,
    /// How long a login stays valid.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Most concurrent logins kept; the oldest is dropped beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            auth_enabled: false,
            username: default_web_username(),
            password: default_web_password(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl WebConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Startup overrides, usually sourced from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub ollama_model: Option<String>,
    pub web_auth_enabled: Option<String>,
    pub web_username: Option<String>,
    pub web_password: Option<String>,
}

/// Interpret a flag the way shell users write them.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Layer `overrides` on top of the file values.
    ///
    /// Values are trimmed. An empty model name keeps the default model.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(p) = overrides.provider {
            self.provider.default = p.trim().to_lowercase();
        }
        if let Some(key) = overrides.openai_api_key {
            self.provider.openai.api_key = key.trim().to_string();
        }
        if let Some(m) = overrides.openai_model {
            let m = m.trim();
            self.provider.openai.model = if m.is_empty() {
                default_openai_model()
            } else {
                m.to_string()
            };
        }
        if let Some(url) = overrides.ollama_base_url {
            self.provider.ollama.base_url = url.trim().to_string();
        }
        if let Some(m) = overrides.ollama_model {
            let m = m.trim();
            self.provider.ollama.model = if m.is_empty() {
                default_ollama_model()
            } else {
                m.to_string()
            };
        }
        if let Some(flag) = overrides.web_auth_enabled {
            self.web.auth_enabled = parse_flag(&flag);
        }
        if let Some(user) = overrides.web_username {
            self.web.username = user;
        }
        if let Some(pass) = overrides.web_password {
            self.web.password = pass;
        }
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, ModusError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::debug!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ModusError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| ModusError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
