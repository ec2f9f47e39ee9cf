//! Remote music-model provider client
//!
//! The gateway drives a Replicate-style prediction API: create a prediction
//! for the configured model slug, poll it until terminal, and hand the raw
//! terminal body to the result normalizer. The `MusicModelProvider` trait is
//! the seam the job runner depends on, so tests can substitute a scripted
//! provider without touching the network.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tunegen_common::config::ProviderConfig;

/// Per-request HTTP timeout; the overall job deadline is separate
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider-call failure, carried verbatim into the task's error string
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider API token configured (set REPLICATE_API_TOKEN)")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("provider API error {0}: {1}")]
    Api(u16, String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("provider job failed: {0}")]
    JobFailed(String),

    #[error("provider job timed out after {0} seconds")]
    TimedOut(u64),
}

/// Audio bytes shipped with a prediction, with the original filename kept
/// for MIME sniffing
#[derive(Debug, Clone)]
pub struct AudioAttachment {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Input payload for one provider call
#[derive(Debug, Clone)]
pub struct ProviderInput {
    pub prompt: String,
    /// Requested length in seconds. Forwarded to the model, which may
    /// ignore it depending on the version.
    pub duration: Option<u32>,
    /// Guide/source audio. When present the model mimics its style rather
    /// than continuing it (`continuation: false`).
    pub audio: Option<AudioAttachment>,
}

/// Seam between the job runner and the remote inference service
#[async_trait]
pub trait MusicModelProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    /// True when credentials are present; health reporting only
    fn is_configured(&self) -> bool;
    /// Run one inference job to completion and return the raw terminal
    /// response for normalization
    async fn run(&self, input: ProviderInput) -> Result<Value, ProviderError>;
}

/// Typed slice of the prediction envelope used for polling control
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

struct PredictionState {
    control: Prediction,
    raw: Value,
}

/// Replicate HTTP API client
pub struct ReplicateClient {
    http_client: reqwest::Client,
    api_token: Option<String>,
    model: String,
    base_url: String,
    poll_interval: Duration,
    job_timeout: Duration,
}

impl ReplicateClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_token: config
                .api_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
        })
    }

    /// Build the model input block from a `ProviderInput`
    fn build_input(&self, input: &ProviderInput) -> Value {
        let mut payload = json!({
            "prompt": input.prompt,
            "output_format": "mp3",
            "normalization_strategy": "peak",
        });
        if let Some(duration) = input.duration {
            payload["duration"] = json!(duration);
        }
        if let Some(audio) = &input.audio {
            payload["input_audio"] = json!(audio_data_uri(&audio.bytes, &audio.filename));
            // Mimic the source clip's style instead of extending it
            payload["continuation"] = json!(false);
        }
        payload
    }

    async fn create_prediction(
        &self,
        token: &str,
        input: Value,
    ) -> Result<PredictionState, ProviderError> {
        let url = format!("{}/v1/models/{}/predictions", self.base_url, self.model);
        debug!(model = %self.model, "creating prediction");
        let request = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Token {token}"))
            .json(&json!({ "input": input }));
        self.send_prediction_request(request).await
    }

    async fn fetch_prediction(
        &self,
        token: &str,
        url: &str,
    ) -> Result<PredictionState, ProviderError> {
        let request = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, format!("Token {token}"));
        self.send_prediction_request(request).await
    }

    async fn send_prediction_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<PredictionState, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        let control: Prediction = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(PredictionState { control, raw })
    }

    /// Poll until the prediction reaches a terminal status
    async fn run_to_completion(
        &self,
        token: &str,
        input: Value,
    ) -> Result<Value, ProviderError> {
        let mut state = self.create_prediction(token, input).await?;
        loop {
            match state.control.status.as_str() {
                "succeeded" => return Ok(state.raw),
                "failed" | "canceled" => {
                    return Err(ProviderError::JobFailed(describe_failure(
                        state.control.error.as_ref(),
                    )))
                }
                other => {
                    debug!(
                        prediction_id = %state.control.id,
                        status = %other,
                        "prediction still in flight"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                    let poll_url = match &state.control.urls {
                        Some(urls) => urls.get.clone(),
                        None => format!(
                            "{}/v1/predictions/{}",
                            self.base_url, state.control.id
                        ),
                    };
                    state = self.fetch_prediction(token, &poll_url).await?;
                }
            }
        }
    }
}

#[async_trait]
impl MusicModelProvider for ReplicateClient {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    async fn run(&self, input: ProviderInput) -> Result<Value, ProviderError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(ProviderError::NotConfigured)?;
        let payload = self.build_input(&input);

        let deadline_secs = self.job_timeout.as_secs();
        match tokio::time::timeout(self.job_timeout, self.run_to_completion(token, payload)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::TimedOut(deadline_secs)),
        }
    }
}

/// Render a prediction-level failure into a human-readable message
fn describe_failure(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(message)) => message.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => "provider reported failure without details".to_string(),
    }
}

/// Encode audio bytes as a `data:` URI for the prediction input block
fn audio_data_uri(bytes: &[u8], filename: &str) -> String {
    format!(
        "data:{};base64,{}",
        audio_mime_type(filename),
        BASE64.encode(bytes)
    )
}

fn audio_mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
