//! Wire-level types shared between the gateway and its clients
//!
//! Field names follow the frontend contract (camelCase, `audioUrl`,
//! `createdAt`, `type`), so these serialize byte-for-byte the way the
//! polling UI expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one asynchronous generation/conversion task
///
/// `Succeeded` and `Failed` are terminal: a task never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker slot
    Queued,
    /// Worker is talking to the remote provider
    Running,
    /// Finished with a resolved audio URL
    Succeeded,
    /// Finished with an error message
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// How the artifact was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Text-to-music generation
    Generated,
    /// Audio-guided style conversion
    Converted,
}

/// Normalized description of a completed job's output artifact.
/// Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub id: Uuid,
    pub title: String,
    /// Ordered genre tags, echoed from the request
    pub genres: Vec<String>,
    /// Ordered mood tags, echoed from the request
    pub moods: Vec<String>,
    /// Requested duration in seconds. Passed to the model for generation
    /// but not guaranteed to be honored; treat as metadata.
    pub duration: u32,
    pub audio_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TrackKind,
}

/// Response to a job submission: the task id to poll with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub task_id: String,
}

/// Response from the task status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub audio_url: Option<String>,
    pub result: Option<TrackResult>,
    pub error: Option<String>,
}

/// Response from the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// True when a provider API token is configured
    pub ok: bool,
    pub provider: String,
    pub model: String,
    pub version: String,
    pub uptime_seconds: u64,
}
