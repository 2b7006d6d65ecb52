//! Recovering a JSON object from free-text model output.
//!
//! Models asked for "strict JSON" still wrap it in code fences, add prose
//! before or after it, or occasionally paste a second copy of the whole
//! record inside one of its string fields. Extraction is an ordered list of
//! strategies, each a pure `&str -> Option<JsonObject>`; the first one that
//! yields an object wins.
//!
//! ## Strategies (in order)
//! 1. [`parse_direct`]: the trimmed text is the object
//! 2. [`strip_fences`]: remove every ```` ```json ```` / ```` ``` ```` marker
//! 3. [`fenced_block`]: the first fenced `{...}` block
//! 4. [`brace_span`]: first `{` to last `}`
//!
//! [`extract_shaped`] adds a repair pass on top: when a string field of the
//! recovered object itself mentions the expected keys, that string is
//! extracted again and, if it holds a record of the same shape, replaces
//! the outer one.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// A JSON object as recovered from model output.
pub type JsonObject = Map<String, Value>;

/// One extraction strategy.
pub type ExtractStrategy = fn(&str) -> Option<JsonObject>;

/// Strategies in the order they are tried.
pub const STRATEGIES: [(&str, ExtractStrategy); 4] = [
    ("direct", parse_direct),
    ("strip_fences", strip_fences),
    ("fenced_block", fenced_block),
    ("brace_span", brace_span),
];

/// How many times an inner duplicate may replace its container.
const MAX_REPAIR_DEPTH: usize = 3;

lazy_static! {
    /// First fenced block holding an object, with or without a `json` tag.
    static ref FENCED_OBJECT: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap();
}

/// Recover the first JSON object from raw model text.
pub fn extract(raw: &str) -> Option<JsonObject> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(raw);
        if found.is_some() {
            tracing::trace!(strategy = name, "Recovered JSON object");
        }
        found
    })
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse the whole trimmed text.
pub fn parse_direct(raw: &str) -> Option<JsonObject> {
    parse_object(raw)
}

/// Drop all code-fence markers and parse what remains.
pub fn strip_fences(raw: &str) -> Option<JsonObject> {
    if !raw.contains("```") {
        return None;
    }
    let cleaned = raw
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "");
    parse_object(&cleaned)
}

/// Parse the first fenced block whose body is an object.
pub fn fenced_block(raw: &str) -> Option<JsonObject> {
    FENCED_OBJECT
        .captures_iter(raw)
        .find_map(|caps| caps.get(1).and_then(|m| parse_object(m.as_str())))
}

/// Parse the span from the first `{` to the last `}`.
pub fn brace_span(raw: &str) -> Option<JsonObject> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&raw[start..=end])
}

/// The keys a record of some type is expected to carry.
#[derive(Debug, Clone, Copy)]
pub struct Shape<'a> {
    /// Every top-level key of the record
    pub keys: &'a [&'a str],

    /// Keys an inner candidate must have to replace the outer record
    pub required: &'a [&'a str],
}

impl<'a> Shape<'a> {
    pub const fn new(keys: &'a [&'a str], required: &'a [&'a str]) -> Self {
        Self { keys, required }
    }

    /// Whether a string field looks like it embeds a record of this shape.
    fn mentioned_in(&self, text: &str) -> bool {
        let threshold = self.required.len().max(2);
        let mentions = self
            .keys
            .iter()
            .filter(|key| text.contains(&format!("\"{}\"", key)))
            .count();
        mentions >= threshold
    }

    /// Whether an object carries every required key.
    pub fn accepts(&self, object: &JsonObject) -> bool {
        self.required.iter().all(|key| object.contains_key(*key))
    }
}

/// Extract an object and prefer an embedded duplicate of the same shape.
pub fn extract_shaped(raw: &str, shape: &Shape<'_>) -> Option<JsonObject> {
    let outer = extract(raw)?;
    Some(repair_nested(outer, shape, MAX_REPAIR_DEPTH))
}

/// Replace `outer` with a same-shaped record found inside one of its string fields.
pub fn repair_nested(outer: JsonObject, shape: &Shape<'_>, depth: usize) -> JsonObject {
    if depth == 0 {
        return outer;
    }

    let inner = outer.iter().find_map(|(field, value)| {
        let text = value.as_str()?;
        if !shape.mentioned_in(text) {
            return None;
        }
        let candidate = extract(text)?;
        if shape.accepts(&candidate) {
            tracing::debug!(field = %field, "Replacing record with embedded duplicate");
            Some(candidate)
        } else {
            None
        }
    });

    match inner {
        Some(inner) => repair_nested(inner, shape, depth - 1),
        None => outer,
    }
}
