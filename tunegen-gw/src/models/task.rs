//! Task lifecycle state machine
//!
//! A task progresses `Queued → Running → {Succeeded | Failed}`. Terminal
//! states are final: transition methods return `false` instead of mutating
//! a task that has already finished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tunegen_common::types::{TaskStatus, TaskStatusResponse, TrackResult};
use uuid::Uuid;

/// One tracked asynchronous job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Opaque identifier handed to the caller (32-char lowercase hex)
    pub task_id: String,

    /// Current lifecycle state
    pub status: TaskStatus,

    /// Artifact metadata, present once succeeded
    pub result: Option<TrackResult>,

    /// Resolved audio URL, present once succeeded
    pub audio_url: Option<String>,

    /// Human-readable failure reason, present once failed
    pub error: Option<String>,

    /// Submission time
    pub created_at: DateTime<Utc>,

    /// Set when the task reaches a terminal state
    pub ended_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a new task in the queued state with a fresh identifier
    pub fn new() -> Self {
        Self {
            task_id: Uuid::new_v4().simple().to_string(),
            status: TaskStatus::Queued,
            result: None,
            audio_url: None,
            error: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to running. Returns false if the task already finished.
    pub fn mark_running(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Running;
        true
    }

    /// Transition to succeeded with the artifact and its resolved URL.
    /// Returns false if the task already finished.
    pub fn mark_succeeded(&mut self, result: TrackResult, audio_url: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Succeeded;
        self.audio_url = Some(audio_url);
        self.result = Some(result);
        self.ended_at = Some(Utc::now());
        true
    }

    /// Transition to failed with a human-readable reason.
    /// Returns false if the task already finished.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.ended_at = Some(Utc::now());
        true
    }

    /// Project the record into the status-endpoint wire shape
    pub fn to_status_response(&self) -> TaskStatusResponse {
        TaskStatusResponse {
            task_id: self.task_id.clone(),
            status: self.status,
            audio_url: self.audio_url.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunegen_common::types::TrackKind;

    fn sample_result() -> TrackResult {
        TrackResult {
            id: Uuid::new_v4(),
            title: "AI_Generated_Track".to_string(),
            genres: vec![],
            moods: vec![],
            duration: 10,
            audio_url: "https://cdn.example.com/a.mp3".to_string(),
            created_at: Utc::now(),
            kind: TrackKind::Generated,
        }
    }

    #[test]
    fn new_task_is_queued_with_hex_id() {
        let task = TaskRecord::new();
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.task_id.len(), 32);
        assert!(task.task_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(task.ended_at.is_none());
    }

    #[test]
    fn happy_path_transitions() {
        let mut task = TaskRecord::new();
        assert!(task.mark_running());
        assert_eq!(task.status, TaskStatus::Running);

        assert!(task.mark_succeeded(sample_result(), "https://cdn.example.com/a.mp3".into()));
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(
            task.audio_url.as_deref(),
            Some("https://cdn.example.com/a.mp3")
        );
        assert!(task.ended_at.is_some());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut task = TaskRecord::new();
        task.mark_running();
        task.mark_failed("provider unreachable");

        assert!(!task.mark_running());
        assert!(!task.mark_succeeded(sample_result(), "https://x".into()));
        assert!(!task.mark_failed("second failure"));

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("provider unreachable"));
    }

    #[test]
    fn queued_can_fail_directly() {
        // Convert with no uploaded file fails before ever running
        let mut task = TaskRecord::new();
        assert!(task.mark_failed("No file uploaded"));
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn status_response_projection() {
        let mut task = TaskRecord::new();
        task.mark_running();
        task.mark_succeeded(sample_result(), "https://cdn.example.com/a.mp3".into());

        let response = task.to_status_response();
        assert_eq!(response.task_id, task.task_id);
        assert_eq!(response.status, TaskStatus::Succeeded);
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }
}
