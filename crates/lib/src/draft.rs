//! Draft reply text and the character cap applied to everything sent outbound.

use std::fmt;

/// Cap `text` at `max` characters (not bytes). Returns the original slice when short enough.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Agent-proposed reply, already trimmed and capped; shown to the operator before any send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReply(String);

impl DraftReply {
    /// Build a draft from accumulated stream text: trim, substitute `fallback` when empty, cap at `max_chars`.
    pub fn from_accumulated(text: &str, fallback: &str, max_chars: usize) -> Self {
        let trimmed = text.trim();
        let body = if trimmed.is_empty() { fallback } else { trimmed };
        Self(truncate_chars(body, max_chars).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
