//! Lenient parsing of completion text into link objects

use serde_json::{Map, Value};

/// Ways of recovering JSON from free-form completion text, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole text is JSON.
    Direct,
    /// From the first `{` to the last `}`.
    FirstObject,
    /// From the first `[` to the last `]`.
    FirstArray,
}

impl ParseStrategy {
    pub const ORDER: [ParseStrategy; 3] = [
        ParseStrategy::Direct,
        ParseStrategy::FirstObject,
        ParseStrategy::FirstArray,
    ];

    pub fn apply(&self, text: &str) -> Option<Value> {
        let candidate = match self {
            ParseStrategy::Direct => text,
            ParseStrategy::FirstObject => span(text, '{', '}')?,
            ParseStrategy::FirstArray => span(text, '[', ']')?,
        };
        serde_json::from_str(candidate).ok()
    }
}

fn span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Runs each strategy in order and returns the first successful parse.
pub fn parse_lenient(text: &str) -> Option<(ParseStrategy, Value)> {
    ParseStrategy::ORDER
        .iter()
        .find_map(|s| s.apply(text).map(|v| (*s, v)))
}

/// The relationship entries of a parsed response: `Links` (or `links`) of an
/// object, or a top-level array. Non-object entries are skipped.
pub fn link_objects(value: &Value) -> Vec<Map<String, Value>> {
    let list = match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => obj
            .get("Links")
            .or_else(|| obj.get("links"))
            .and_then(Value::as_array),
        _ => None,
    };
    list.into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .cloned()
        .collect()
}
