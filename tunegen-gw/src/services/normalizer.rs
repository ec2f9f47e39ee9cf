//! Result normalization for heterogeneous provider responses
//!
//! Model versions differ in how they wrap the output: a bare URL string, a
//! list of URLs, an object keyed `audioUrl`/`audio_url`/`url`/`audio`/
//! `output`/`files`, or any of those nested under `result`/`data`/
//! `prediction`. The walk is depth-first and short-circuits on the first
//! match; the key order is a contract so that an ambiguous response always
//! extracts the same URL.

use serde_json::Value;

/// URL-bearing keys, checked in this order
const URL_KEYS: [&str; 6] = ["audioUrl", "audio_url", "url", "audio", "output", "files"];

/// Nested containers recursed into after the direct keys miss
const CONTAINER_KEYS: [&str; 3] = ["result", "data", "prediction"];

/// Extract a single absolute audio URL from an arbitrary provider value.
///
/// A string only counts as a URL when it starts with `http`; this keeps
/// prompt text and provider-side identifiers from being echoed back as a
/// download link.
pub fn extract_audio_url(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if s.starts_with("http") => Some(s.clone()),
        Value::String(_) => None,
        Value::Array(items) => items.iter().find_map(extract_audio_url),
        Value::Object(map) => {
            for key in URL_KEYS {
                if let Some(url) = map.get(key).and_then(extract_audio_url) {
                    return Some(url);
                }
            }
            for key in CONTAINER_KEYS {
                if let Some(url) = map.get(key).and_then(extract_audio_url) {
                    return Some(url);
                }
            }
            None
        }
        _ => None,
    }
}
