//! Small text helpers shared by prompt builders.

/// The longest prefix of `text` with at most `max_chars` characters.
///
/// Counts Unicode scalar values, so Devanagari or Telugu text is never
/// split inside a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
