//! Caller-input coercion and upload persistence
//!
//! The frontend is loose about field types: `duration` arrives as a number
//! or a string, `genres`/`moods` as a JSON list or a JSON-encoded string of
//! a list. Everything coerces to a usable value; malformed input falls back
//! to a default instead of surfacing an error to the caller.

use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default track length in seconds when the caller omits or mangles it
pub const DEFAULT_DURATION_SECS: u32 = 10;

/// Default conversion intensity
pub const DEFAULT_INTENSITY: u32 = 3;

pub const DEFAULT_GENERATE_PROMPT: &str = "instrumental background music";
pub const DEFAULT_CONVERT_PROMPT: &str = "convert style";

/// Coerce a duration field to seconds. Accepts a positive number or a
/// numeric string; anything else (including 0) yields the default.
pub fn coerce_duration(raw: Option<&Value>) -> u32 {
    let parsed = match raw {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| v.min(u32::MAX as u64) as u32)
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u32)),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|v| *v > 0).unwrap_or(DEFAULT_DURATION_SECS)
}

/// Coerce an intensity field. Accepts a number or numeric string;
/// missing or unparseable yields the default.
pub fn coerce_intensity(raw: Option<&Value>) -> u32 {
    match raw {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32).unwrap_or(DEFAULT_INTENSITY),
        Some(Value::String(s)) => s.trim().parse::<u32>().unwrap_or(DEFAULT_INTENSITY),
        _ => DEFAULT_INTENSITY,
    }
}

/// Coerce a tag list: a native JSON array keeps its string elements in
/// order; a string is parsed as a JSON-encoded list; malformed input
/// becomes an empty list.
pub fn coerce_tags(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => serde_json::from_str::<Vec<String>>(s).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Coerce a free-text field, substituting the default when missing or blank
pub fn coerce_text(raw: Option<&Value>, default: &str) -> String {
    raw.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Strip path components and shell-hostile characters from an uploaded
/// filename, keeping the extension so the provider payload can carry a
/// sensible MIME type.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Persist uploaded audio bytes under a collision-resistant name.
///
/// The file is written before the task id is handed back to the caller;
/// the owning job deletes it on every exit path.
pub async fn save_upload(
    tmp_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(tmp_dir).await?;
    let name = format!(
        "{}_{}",
        Uuid::new_v4().simple(),
        sanitize_filename(original_name)
    );
    let path = tmp_dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
