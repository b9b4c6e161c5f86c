//! Keyword scoring that picks a response mode from free text.

use crate::mode::Mode;

/// Lowercase trigger phrases for one mode. Phrases may contain spaces and
/// are matched as contiguous substrings.
fn keywords(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::Concise => &["brief", "short", "quick", "summary", "tldr", "one line"],
        Mode::Detailed => &[
            "explain",
            "deep",
            "detail",
            "step by step",
            "comprehensive",
            "thorough",
            "compare",
        ],
        Mode::Creative => &[
            "story",
            "poem",
            "creative",
            "idea",
            "brainstorm",
            "imagine",
            "fiction",
        ],
        Mode::Technical => &[
            "code",
            "python",
            "bug",
            "error",
            "api",
            "architecture",
            "algorithm",
            "database",
            "optimize",
        ],
    }
}

/// Number of `mode`'s phrases that occur in already-normalized `text`.
pub fn score(mode: Mode, text: &str) -> usize {
    keywords(mode)
        .iter()
        .filter(|phrase| text.contains(*phrase))
        .count()
}

/// Pick the best-scoring mode for `text`, or `fallback` when nothing matches.
///
/// Ties go to the mode that comes first in [`Mode::ALL`].
pub fn classify(text: &str, fallback: Mode) -> Mode {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return fallback;
    }

    let mut best = fallback;
    let mut best_score = 0;
    for mode in Mode::ALL {
        let s = score(mode, &text);
        if s > best_score {
            best = mode;
            best_score = s;
        }
    }
    best
}
