//! Response modes and the catalog of system instructions they carry.
//!
//! The catalog order declared in [`Mode::ALL`] is the stable order used
//! everywhere a list of modes is shown or scored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModusError;

/// A named response style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Concise,
    Detailed,
    Creative,
    Technical,
}

impl Mode {
    /// Every catalog mode, in catalog order.
    pub const ALL: [Mode; 4] = [Mode::Concise, Mode::Detailed, Mode::Creative, Mode::Technical];

    /// Lowercase token used on the wire and in the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Detailed => "detailed",
            Self::Creative => "creative",
            Self::Technical => "technical",
        }
    }

    /// System instruction sent ahead of the user's text.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Concise => {
                "You are a concise assistant. Provide the direct answer first, keep it short, \
                 and use only essential detail."
            }
            Self::Detailed => {
                "You are a detailed assistant. Explain clearly with structured depth, practical \
                 context, and helpful examples when useful."
            }
            Self::Creative => {
                "You are a creative assistant. Offer original, vivid, and engaging responses \
                 while staying relevant and accurate."
            }
            Self::Technical => {
                "You are a technical assistant. Be precise, explicit about assumptions, and \
                 provide implementation-oriented guidance."
            }
        }
    }

    /// Sampling temperature: loose for creative work, tight otherwise.
    pub fn temperature(&self) -> f32 {
        match self {
            Self::Creative => 0.7,
            _ => 0.3,
        }
    }

    /// Output-length budget in tokens.
    pub fn max_tokens(&self) -> u32 {
        match self {
            Self::Technical => 400,
            _ => 512,
        }
    }

    /// Comma-separated catalog names, for error and help text.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Mode::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ModusError::UnsupportedMode(s.to_string()))
    }
}

/// Look up the system instruction for a catalog mode by name.
pub fn instruction_for(name: &str) -> Result<&'static str, ModusError> {
    name.parse::<Mode>().map(|m| m.instruction())
}

/// What the caller asked for: a fixed mode, or classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelector {
    #[default]
    Auto,
    Fixed(Mode),
}

impl ModeSelector {
    /// Parse a caller token. Surrounding whitespace and case are ignored and
    /// an empty token means `auto`.
    pub fn parse(token: &str) -> Result<Self, ModusError> {
        let token = token.trim().to_lowercase();
        if token.is_empty() || token == "auto" {
            return Ok(Self::Auto);
        }
        token
            .parse::<Mode>()
            .map(Self::Fixed)
            .map_err(|_| ModusError::InvalidMode(token))
    }

    /// Selector names offered to users, `auto` first.
    pub fn choices() -> Vec<&'static str> {
        std::iter::once("auto")
            .chain(Mode::ALL.iter().map(Mode::as_str))
            .collect()
    }
}

impl FromStr for ModeSelector {
    type Err = ModusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(m) => m.fmt(f),
        }
    }
}
