//! Transcript normalization
//!
//! Post-processes raw inference output into display-ready text.

use tracing::debug;

/// Substituted when the engine produces no text for the clip
pub const NO_SPEECH_MESSAGE: &str = "No speech detected.";

/// Normalize raw engine output into a displayable transcript
///
/// Trims surrounding whitespace, capitalizes the first letter, and appends a
/// period unless the text already ends in terminal punctuation. Empty output
/// becomes [`NO_SPEECH_MESSAGE`] rather than an empty string.
pub fn normalize_transcript(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NO_SPEECH_MESSAGE.to_string();
    }

    let mut chars = trimmed.chars();
    let mut text = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return NO_SPEECH_MESSAGE.to_string(),
    };

    if !matches!(text.chars().last(), Some('.' | '!' | '?')) {
        text.push('.');
    }

    debug!("Normalized transcript: '{}' -> '{}'", raw, text);
    text
}
