//! Shared in-memory task registry
//!
//! One registry instance is constructed at process start and injected into
//! every handler and job through `AppState`. Workers write disjoint keys
//! (their own task id); the status endpoint reads concurrently. Records are
//! replaced whole under the write lock, so a reader always observes a
//! complete pre- or post-transition record.
//!
//! Entries live for the lifetime of the process; there is no eviction.

use crate::models::TaskRecord;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use tunegen_common::types::TrackResult;

/// Cheaply clonable handle to the shared task map
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created task
    pub async fn insert(&self, record: TaskRecord) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(record.task_id.clone(), record);
    }

    /// Snapshot of a task's current state
    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).cloned()
    }

    /// Remove a task. No HTTP caller today; jobs are process-lifetime.
    pub async fn delete(&self, task_id: &str) -> Option<TaskRecord> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(task_id)
    }

    pub async fn mark_running(&self, task_id: &str) {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(record) => {
                if !record.mark_running() {
                    warn!(task_id = %task_id, "refusing to re-run a finished task");
                }
            }
            None => warn!(task_id = %task_id, "mark_running on unknown task"),
        }
    }

    pub async fn mark_succeeded(&self, task_id: &str, result: TrackResult, audio_url: String) {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(record) => {
                if !record.mark_succeeded(result, audio_url) {
                    warn!(task_id = %task_id, "refusing to overwrite a finished task");
                }
            }
            None => warn!(task_id = %task_id, "mark_succeeded on unknown task"),
        }
    }

    pub async fn mark_failed(&self, task_id: &str, error: impl Into<String>) {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(record) => {
                if !record.mark_failed(error) {
                    warn!(task_id = %task_id, "refusing to overwrite a finished task");
                }
            }
            None => warn!(task_id = %task_id, "mark_failed on unknown task"),
        }
    }
}
