//! Detection of serialized numeric vectors stored as text.
//!
//! Vector stores that keep chunk text in metadata occasionally hand back an
//! embedding dumped as a string (`"0.0123, -0.442, 0.981, ..."`). Such text
//! carries no meaning for the language model and would only eat context
//! budget, so retrieval drops it before assembly.

use crate::models::RetrievedSegment;

/// Minimum fraction of float-parseable tokens for a string to count as a
/// serialized vector.
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.6;

/// Returns `true` if `s` looks like a list of numbers rather than prose.
///
/// Any alphabetic character rules the string out immediately. Otherwise the
/// string is split on runs of whitespace and commas, and it is flagged when
/// at least `threshold` of the tokens parse as floats. Bracket characters
/// are left on the tokens, so `"[0.1, 0.2]"` has two unparseable tokens out
/// of two.
///
/// ```rust
/// use docqa_core::noise::looks_like_serialized_vector;
///
/// assert!(looks_like_serialized_vector("3.14 2.71 1.41", 0.6));
/// assert!(!looks_like_serialized_vector("Revenue grew 3.5 percent", 0.6));
/// assert!(!looks_like_serialized_vector("", 0.6));
/// ```
pub fn looks_like_serialized_vector(s: &str, threshold: f64) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    if s.chars().any(char::is_alphabetic) {
        return false;
    }

    let tokens: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return false;
    }

    let numeric = tokens.iter().filter(|t| t.parse::<f64>().is_ok()).count();
    numeric as f64 / tokens.len() as f64 >= threshold
}

/// Drop segments whose text is empty or looks like a serialized vector.
pub fn filter_noise(segments: Vec<RetrievedSegment>, threshold: f64) -> Vec<RetrievedSegment> {
    segments
        .into_iter()
        .filter(|seg| {
            if seg.text.trim().is_empty() {
                return false;
            }
            if looks_like_serialized_vector(&seg.text, threshold) {
                tracing::debug!(
                    chunk_id = %seg.chunk_id,
                    source = %seg.source_name,
                    "dropping embedding-like segment"
                );
                return false;
            }
            true
        })
        .collect()
}
