use thiserror::Error;

use crate::mode::Mode;

/// Top-level error type for Modus.
#[derive(Debug, Error)]
pub enum ModusError {
    /// Caller asked for a mode token that is neither `auto` nor a catalog mode.
    #[error("Invalid mode: {0}. Use auto or one of: {modes}", modes = Mode::names())]
    InvalidMode(String),

    /// Catalog lookup for a name that is not a catalog mode.
    #[error("Unsupported mode: {0}. Supported modes: {modes}", modes = Mode::names())]
    UnsupportedMode(String),

    /// The selected backend needs a credential that is not configured.
    #[error("{0}")]
    MissingCredential(String),

    /// Provider identity is not one of the recognized backends.
    #[error("{0}")]
    MisconfiguredProvider(String),

    /// The backend could not be reached.
    #[error("{provider} connection failed: {message}")]
    Connection { provider: String, message: String },

    /// An attempt exceeded its time bound.
    #[error("{provider} request timed out: {message}")]
    Timeout { provider: String, message: String },

    /// The backend rejected the credential.
    #[error("{provider} authentication failed: {message}")]
    Authentication { provider: String, message: String },

    /// The backend is throttling requests.
    #[error("{provider} rate limit reached: {message}")]
    RateLimited { provider: String, message: String },

    /// Any other backend-side rejection.
    #[error("{provider} API error{}: {message}", status_suffix(.status))]
    Api {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The operator interrupted the request.
    #[error("request cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ModusError {
    /// Whether this is a transport-level failure to reach the backend.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Whether this is an attempt that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
