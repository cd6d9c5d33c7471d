//! Lenient parsing of model replies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fenced block pattern is a valid regex"));

/// Recover a JSON document from a model reply.
///
/// Tried in order: the whole reply, the first fenced ```json block, and the
/// span from the first `{` to the last `}`.
pub fn parse_json_response(response: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(response.trim()) {
        return Some(value);
    }

    if let Some(block) = FENCED_JSON.captures(response).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str(block.as_str()) {
            return Some(value);
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Deserialize the array under `key`, skipping items that do not fit `T`.
///
/// A missing key or a non-array value yields an empty list.
pub fn parse_section<T: DeserializeOwned>(document: &Value, key: &str) -> Vec<T> {
    let Some(items) = document.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                debug!(section = key, error = %err, "skipping malformed item");
                None
            }
        })
        .collect()
}
