//! Character-budgeted context assembly.
//!
//! Ranks retrieved segments by score and concatenates them, separated by a
//! blank line, until `max_chars` is reached. The segment that overflows is
//! cut and marked with `"..."` when a useful amount of room is left.

use crate::models::RetrievedSegment;

/// Default context budget, in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 6000;

/// Marker appended to a truncated segment.
pub const ELLIPSIS: &str = "...";

const SEPARATOR: &str = "\n\n";

/// Each included segment is charged for its separator.
const SEPARATOR_COST: usize = 2;

/// A truncated tail is only worth including above this many chars.
const MIN_PARTIAL_CHARS: usize = 20;

/// Build a single context string from retrieved segments.
///
/// Segments are ordered by score, highest first (a missing score ranks as
/// `0.0`, ties keep their input order). Empty segments are skipped. The
/// result never exceeds `max_chars + 3` characters.
///
/// ```rust
/// use docqa_core::context::assemble_context;
/// use docqa_core::models::RetrievedSegment;
///
/// let seg = |text: &str, score: f64| RetrievedSegment {
///     chunk_id: text.to_string(),
///     source_name: "doc.pdf".to_string(),
///     chunk_index: 0,
///     text: text.to_string(),
///     score: Some(score),
/// };
/// assert_eq!(assemble_context(&[], 6000), "");
/// assert_eq!(assemble_context(&[seg("B", 0.9), seg("A", 0.95)], 6000), "A\n\nB");
/// ```
pub fn assemble_context(segments: &[RetrievedSegment], max_chars: usize) -> String {
    let mut ranked: Vec<&RetrievedSegment> = segments.iter().collect();
    ranked.sort_by(|a, b| RetrievedSegment::by_score_desc(a, b));

    let mut pieces: Vec<String> = Vec::new();
    let mut total = 0usize;

    for seg in ranked {
        if seg.text.is_empty() {
            continue;
        }
        let len = seg.text.chars().count();

        if total + len + SEPARATOR_COST > max_chars {
            let remaining = max_chars.saturating_sub(total);
            if remaining > MIN_PARTIAL_CHARS {
                let mut partial: String = seg.text.chars().take(remaining).collect();
                partial.push_str(ELLIPSIS);
                pieces.push(partial);
            }
            break;
        }

        pieces.push(seg.text.clone());
        total += len + SEPARATOR_COST;
    }

    pieces.join(SEPARATOR)
}
