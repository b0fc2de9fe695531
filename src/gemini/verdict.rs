use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

static JSON_BLOCK_RE: OnceLock<Regex> = OnceLock::new();

fn json_block_re() -> &'static Regex {
    JSON_BLOCK_RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid json-block regex"))
}

/// Finds the outermost `{...}` block in a model reply, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
    json_block_re().find(text).map(|found| found.as_str())
}

/// Parses the numeric metric map a scorecard or sentiment prompt asks for.
///
/// Entries with non-numeric values are dropped; a reply without a parsable
/// block yields `None` and the caller falls back to the raw text.
pub fn parse_metric_map(text: &str) -> Option<Vec<(String, f64)>> {
    let block = extract_json_block(text)?;
    let value: Value = serde_json::from_str(block).ok()?;
    let object = value.as_object()?;

    let metrics: Vec<(String, f64)> = object
        .iter()
        .filter_map(|(key, value)| value.as_f64().map(|number| (key.clone(), number)))
        .collect();
    if metrics.is_empty() { None } else { Some(metrics) }
}

/// Returns the reply with the JSON block removed, for narrative display.
pub fn narrative_text(text: &str) -> String {
    match json_block_re().find(text) {
        Some(found) => {
            let mut narrative = String::with_capacity(text.len());
            narrative.push_str(&text[..found.start()]);
            narrative.push_str(&text[found.end()..]);
            narrative.trim().to_string()
        }
        None => text.trim().to_string(),
    }
}
