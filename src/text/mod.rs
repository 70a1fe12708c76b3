//! Text sanitization
//!
//! Normalizes arbitrary text to a safe ASCII repertoire before it is
//! parsed, compared, persisted, or logged. Emoji and pictograph code
//! points are stripped outright; every other non-ASCII character is
//! replaced with a single `?` placeholder.

use std::fmt;

/// Code point ranges stripped entirely (emoticons, pictographs,
/// transport symbols, flags, dingbats, enclosed characters).
const STRIPPED_RANGES: [(u32, u32); 6] = [
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
    (0x2702, 0x27B0),
    (0x24C2, 0x1F251),
];

fn is_stripped(c: char) -> bool {
    let cp = c as u32;
    STRIPPED_RANGES.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
}

/// Sanitize text to ASCII.
///
/// Emoji-range characters are removed; any remaining non-ASCII character
/// becomes a `?` (one placeholder per character, nothing silently
/// dropped). Total over all inputs and idempotent on its own output.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_stripped(c))
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

/// Sanitize an optional value, propagating absence.
pub fn sanitize_opt(text: Option<&str>) -> Option<String> {
    text.map(sanitize)
}

/// Sanitize any displayable value via its string form.
pub fn sanitize_display(value: impl fmt::Display) -> String {
    sanitize(&value.to_string())
}
