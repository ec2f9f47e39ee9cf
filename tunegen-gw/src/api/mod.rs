//! HTTP API handlers for the gateway

pub mod convert;
pub mod generate;
pub mod health;
pub mod status;

pub use convert::convert_routes;
pub use generate::generate_routes;
pub use health::health_routes;
pub use status::status_routes;

use crate::error::ApiError;
use axum::extract::Multipart;
use serde_json::{Map, Value};

/// Drain a multipart form into text fields plus an optional `file` part.
///
/// Text fields come back as JSON strings so the same coercion helpers serve
/// both the JSON and the multipart intake paths. A zero-length file part
/// (browser with no file chosen) counts as no file.
pub(crate) async fn collect_form(
    mut multipart: Multipart,
) -> Result<(Map<String, Value>, Option<(String, Vec<u8>)>), ApiError> {
    let mut fields = Map::new();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read uploaded file: {e}")))?;
            if !bytes.is_empty() {
                upload = Some((filename, bytes.to_vec()));
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read field {name}: {e}")))?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok((fields, upload))
}
