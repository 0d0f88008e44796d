//! Guidance content pushed into the overlay
//!
//! The backend publishes `popup_message` events in more than one shape
//! (`header`/`title`, `body`/`message`). Everything downstream of the bridge
//! only ever sees the canonical [`ContentUpdate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header used when the payload carries neither `header` nor `title`
pub const DEFAULT_HEADER: &str = "Step";

/// Canonical overlay content
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContentUpdate {
    pub header: String,
    pub body: String,
    /// Original event payload, untouched
    pub raw: Value,
}

impl ContentUpdate {
    /// Normalize a backend payload.
    ///
    /// A field counts as present only when it is a non-empty string, so
    /// `{"header": "", "title": "Hi"}` resolves to `"Hi"`.
    pub fn from_payload(raw: Value) -> Self {
        let header = first_text(&raw, &["header", "title"]).unwrap_or(DEFAULT_HEADER);
        let body = first_text(&raw, &["body", "message"]).unwrap_or("");

        Self {
            header: header.to_string(),
            body: body.to_string(),
            raw,
        }
    }
}

fn first_text<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
}
