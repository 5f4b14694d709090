//! Response text validation and quality scoring.
//!
//! Pure functions over advisor free-text answers. The response form calls
//! [`validate_response_text`] before allowing submission; the service calls
//! [`calculate_response_quality`] once at submission time and the resulting
//! score is immutable afterward.

use serde::{Deserialize, Serialize};

/// Minimum trimmed character count for a response to carry enough substance
pub const MIN_RESPONSE_CHARS: usize = 40;

/// Minimum word count accepted when the character minimum is not met
pub const MIN_RESPONSE_WORDS: usize = 8;

/// Character length at which the quality length component saturates
const QUALITY_LENGTH_SATURATION: usize = 280;

/// Phrases that signal the advisor is grounding a claim in an example
const EXAMPLE_MARKERS: [&str; 6] = [
    "for example",
    "for instance",
    "e.g.",
    "such as",
    "one time",
    "a project",
];

/// Outcome of a validation check, with human-readable failure reasons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// A passing report
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing report with the given reasons
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Build a report from collected errors; empty means valid
    pub fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::ok()
        } else {
            Self::failed(errors)
        }
    }
}

/// Validate an advisor's free-text answer.
///
/// Rejects empty or whitespace-only text, and answers below the substance
/// floor: fewer than [`MIN_RESPONSE_CHARS`] characters and fewer than
/// [`MIN_RESPONSE_WORDS`] words. A short-but-dense answer passes on the word
/// count alone.
pub fn validate_response_text(text: &str) -> ValidationReport {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return ValidationReport::failed(vec!["response is empty".to_string()]);
    }

    let chars = trimmed.chars().count();
    let words = word_count(trimmed);

    if chars < MIN_RESPONSE_CHARS && words < MIN_RESPONSE_WORDS {
        return ValidationReport::failed(vec![format!(
            "response is too short: add more detail (at least {MIN_RESPONSE_CHARS} characters or {MIN_RESPONSE_WORDS} words)"
        )]);
    }

    ValidationReport::ok()
}

/// Estimate the richness of an answer as a score in `[0, 1]`.
///
/// Deterministic over the input text. The score rewards length (saturating
/// at [`QUALITY_LENGTH_SATURATION`] characters), multi-sentence structure,
/// concrete-example phrasing, and quantified results. Weights:
///
/// - length          0.35
/// - sentences       0.20 (saturates at three)
/// - example marker  0.25
/// - quantification  0.20
pub fn calculate_response_quality(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let length = trimmed.chars().count() as f64;
    let length_score = (length / QUALITY_LENGTH_SATURATION as f64).min(1.0) * 0.35;

    let sentences = sentence_count(trimmed).min(3) as f64;
    let sentence_score = sentences / 3.0 * 0.20;

    let example_score = if has_example_marker(trimmed) { 0.25 } else { 0.0 };
    let quantified_score = if has_quantified_result(trimmed) { 0.20 } else { 0.0 };

    (length_score + sentence_score + example_score + quantified_score).clamp(0.0, 1.0)
}

/// Whitespace-delimited word count
fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count of terminated sentences; an unterminated trailing fragment counts
/// once it carries several words
fn sentence_count(text: &str) -> usize {
    let terminated = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
    if terminated == 0 && word_count(text) >= MIN_RESPONSE_WORDS {
        1
    } else {
        terminated
    }
}

fn has_example_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    EXAMPLE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Digits or percent signs mark a quantified claim
fn has_quantified_result(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '%')
}
