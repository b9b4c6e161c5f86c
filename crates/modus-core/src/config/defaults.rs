//! Default value functions used by serde for config deserialization.

pub fn default_log_level() -> String {
    "warn".to_string()
}

pub fn default_provider() -> String {
    "ollama".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_openai_timeout() -> u64 {
    600
}

pub fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

pub fn default_generation_timeout() -> u64 {
    180
}

pub fn default_probe_timeout() -> u64 {
    8
}

pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_backoff_secs() -> u64 {
    1
}

pub fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_web_port() -> u16 {
    5000
}

pub fn default_web_username() -> String {
    "admin".to_string()
}

pub fn default_web_password() -> String {
    "admin123".to_string()
}

pub fn default_session_ttl() -> u64 {
    12 * 60 * 60
}

pub fn default_max_sessions() -> usize {
    1024
}
