//! HTTP API integration tests
//!
//! Drives the router in-process with a scripted provider, so no test
//! touches the network.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tunegen_common::config::Config;
use tunegen_gw::services::provider::{MusicModelProvider, ProviderError, ProviderInput};
use tunegen_gw::{build_router, AppState};

const TRACK_URL: &str = "https://cdn.example.com/track.mp3";

/// Scripted provider: sleeps, then returns a fixed body or a fixed failure
struct ScriptedProvider {
    output: Value,
    fail_with: Option<String>,
    delay: Duration,
}

impl ScriptedProvider {
    fn success() -> Self {
        Self {
            output: json!({ "output": [TRACK_URL] }),
            fail_with: None,
            delay: Duration::from_millis(20),
        }
    }
}

#[async_trait]
impl MusicModelProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock/musicgen"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn run(&self, _input: ProviderInput) -> Result<Value, ProviderError> {
        tokio::time::sleep(self.delay).await;
        match &self.fail_with {
            Some(message) => Err(ProviderError::JobFailed(message.clone())),
            None => Ok(self.output.clone()),
        }
    }
}

fn test_app(provider: ScriptedProvider, tmp_dir: &Path) -> Router {
    let mut config = Config::default();
    config.tmp_dir = tmp_dir.to_path_buf();
    build_router(AppState::new(config, Arc::new(provider)))
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn get_status(app: &Router, task_id: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/music/task/status?task_id={task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

fn status_rank(status: &str) -> u8 {
    match status {
        "queued" => 0,
        "running" => 1,
        "succeeded" | "failed" => 2,
        other => panic!("unexpected status {other}"),
    }
}

/// Poll until terminal, asserting the observed sequence never regresses
async fn wait_for_terminal(app: &Router, task_id: &str) -> Value {
    let mut last_rank = 0u8;
    for _ in 0..400 {
        let (code, body) = get_status(app, task_id).await;
        assert_eq!(code, StatusCode::OK);
        let status = body["status"].as_str().unwrap().to_string();
        let rank = status_rank(&status);
        assert!(
            rank >= last_rank,
            "status regressed to {status} after rank {last_rank}"
        );
        last_rank = rank;
        if rank == 2 {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

fn multipart_request(
    uri: &str,
    text_fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let boundary = "tunegen-test-boundary";
    let mut body = Vec::new();
    for (name, value) in text_fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Retry loop for the post-terminal cleanup of temp uploads
async fn wait_for_empty_dir(dir: &Path) {
    for _ in 0..200 {
        let count = std::fs::read_dir(dir).unwrap().count();
        if count == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("temp dir {} was not emptied", dir.display());
}

#[tokio::test]
async fn generate_with_no_body_returns_task_id_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/music/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let task_id = body["taskId"].as_str().expect("taskId present").to_string();

    // The id resolves right away, before the job finishes
    let (code, status_body) = get_status(&app, &task_id).await;
    assert_eq!(code, StatusCode::OK);
    let status = status_body["status"].as_str().unwrap();
    assert!(
        ["queued", "running", "succeeded"].contains(&status),
        "unexpected early status {status}"
    );

    let terminal = wait_for_terminal(&app, &task_id).await;
    assert_eq!(terminal["status"], "succeeded");
    assert_eq!(terminal["audioUrl"], TRACK_URL);
    assert_eq!(terminal["result"]["type"], "generated");
    // Defaulted intake fields flow into the result
    assert_eq!(terminal["result"]["duration"], 10);
}

#[tokio::test]
async fn generate_coerces_loose_field_types() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let payload = json!({
        "description": "dark synthwave",
        "genres": "[\"synthwave\", \"electro\"]",
        "moods": ["brooding"],
        "duration": "abc",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/music/generate")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    let terminal = wait_for_terminal(&app, &task_id).await;
    assert_eq!(terminal["status"], "succeeded");
    assert_eq!(
        terminal["result"]["genres"],
        json!(["synthwave", "electro"])
    );
    assert_eq!(terminal["result"]["moods"], json!(["brooding"]));
    // Non-numeric duration coerces to the default instead of erroring
    assert_eq!(terminal["result"]["duration"], 10);
}

#[tokio::test]
async fn generate_multipart_with_guide_audio_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let request = multipart_request(
        "/api/music/generate",
        &[("description", "lofi beat"), ("duration", "20")],
        Some(("guide.mp3", b"fake-mp3-bytes")),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    let terminal = wait_for_terminal(&app, &task_id).await;
    assert_eq!(terminal["status"], "succeeded");
    assert_eq!(terminal["result"]["duration"], 20);

    wait_for_empty_dir(dir.path()).await;
}

#[tokio::test]
async fn convert_without_file_fails_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let request = multipart_request("/api/music/convert", &[("prompt", "make it jazz")], None);
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    // Observable as failed on the very first poll, no waiting
    let (code, body) = get_status(&app, &task_id).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn convert_with_file_resolves_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let request = multipart_request(
        "/api/music/convert",
        &[
            ("prompt", "heavier drums"),
            ("targetGenre", "drum and bass"),
            ("intensity", "4"),
            ("duration", "15"),
        ],
        Some(("source.wav", b"fake-wav-bytes")),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    let terminal = wait_for_terminal(&app, &task_id).await;
    assert_eq!(terminal["status"], "succeeded");
    assert_eq!(terminal["audioUrl"], TRACK_URL);
    assert_eq!(terminal["result"]["type"], "converted");
    assert_eq!(terminal["result"]["genres"], json!(["drum and bass"]));

    wait_for_empty_dir(dir.path()).await;
}

#[tokio::test]
async fn provider_failure_surfaces_through_polling_only() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider {
        output: Value::Null,
        fail_with: Some("model exploded".to_string()),
        delay: Duration::from_millis(10),
    };
    let app = test_app(provider, dir.path());

    // Submission still succeeds with a task id
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/music/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    let terminal = wait_for_terminal(&app, &task_id).await;
    assert_eq!(terminal["status"], "failed");
    let error = terminal["error"].as_str().unwrap();
    assert!(error.contains("model exploded"), "got error {error}");
    assert_eq!(terminal["audioUrl"], Value::Null);
}

#[tokio::test]
async fn unknown_task_returns_404_with_original_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let (code, body) = get_status(&app, "deadbeefdeadbeefdeadbeefdeadbeef").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "Unknown task");
}

#[tokio::test]
async fn status_accepts_task_id_alias() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/music/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let task_id = read_json(response).await["taskId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/music/task/status?taskId={task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["taskId"], task_id.as_str());
}

#[tokio::test]
async fn health_reports_provider_and_model() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(ScriptedProvider::success(), dir.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["provider"], "mock");
    assert_eq!(body["model"], "mock/musicgen");
    assert!(body.get("version").is_some());
}
