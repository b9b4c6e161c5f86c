//! Folding recent conversation turns into a single prompt.

use serde::{Deserialize, Serialize};

/// How many trailing history entries are folded into a prompt.
pub const HISTORY_WINDOW: usize = 6;

/// First line of a prompt that carries conversation history.
pub const CONTEXT_HEADER: &str = "Use the recent conversation for context.";

/// A single entry in the conversation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Turn {
    /// "user" or "assistant". Anything else is ignored when folding.
    #[serde(default)]
    pub role: String,
    /// The message content.
    #[serde(default)]
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Transcript line for this turn, or `None` if it should be skipped.
    fn transcript_line(&self) -> Option<String> {
        let text = self.content.trim();
        if text.is_empty() {
            return None;
        }
        match self.role.trim().to_lowercase().as_str() {
            "user" => Some(format!("User: {text}")),
            "assistant" => Some(format!("Assistant: {text}")),
            _ => None,
        }
    }
}

/// Fold the tail of `history` and the new input into one prompt string.
///
/// Returns `user_input` unchanged when no history entry survives filtering.
pub fn build_prompt(user_input: &str, history: &[Turn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let lines: Vec<String> = history[start..]
        .iter()
        .filter_map(Turn::transcript_line)
        .collect();

    if lines.is_empty() {
        return user_input.to_string();
    }

    let transcript = lines.join("\n");
    format!("{CONTEXT_HEADER}\n{transcript}\nUser: {user_input}")
}
