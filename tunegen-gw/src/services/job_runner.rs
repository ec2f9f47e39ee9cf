//! Background job execution
//!
//! One detached tokio task per submitted job, gated by a semaphore so at
//! most `max_concurrent_jobs` talk to the provider at once; a job past the
//! limit stays `queued` until a permit frees up, so callers still observe
//! the plain `queued → running → terminal` sequence. Per-job errors land in
//! that job's terminal state and never cross jobs.
//!
//! The runner is the only component that invokes the provider and the only
//! one that touches transient upload storage: whatever temp file a job owns
//! is deleted on every exit path, success or failure.

use crate::registry::TaskRegistry;
use crate::services::normalizer::extract_audio_url;
use crate::services::provider::{AudioAttachment, MusicModelProvider, ProviderError, ProviderInput};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tunegen_common::types::{TrackKind, TrackResult};
use uuid::Uuid;

/// A text-to-music job, optionally guided by an uploaded clip
#[derive(Debug, Clone)]
pub struct GenerateJob {
    pub prompt: String,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub duration: u32,
    pub guide_audio: Option<PathBuf>,
}

/// An audio-guided style conversion job
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub prompt: String,
    pub target_genre: String,
    pub intensity: u32,
    pub duration: u32,
    pub audio_path: PathBuf,
}

#[derive(Debug, Error)]
enum JobError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to read uploaded audio: {0}")]
    ReadInput(#[from] std::io::Error),

    #[error("no audio URL found in provider response")]
    NoAudioUrl,
}

/// Bounded pool of provider-facing workers
#[derive(Clone)]
pub struct JobRunner {
    registry: TaskRegistry,
    provider: Arc<dyn MusicModelProvider>,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(
        registry: TaskRegistry,
        provider: Arc<dyn MusicModelProvider>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry,
            provider,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Dispatch a generation job. Returns immediately; the task transitions
    /// happen in the background.
    pub fn submit_generate(&self, task_id: String, job: GenerateJob) {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run_generate(&task_id, job).await;
        });
    }

    /// Dispatch a conversion job. Returns immediately.
    pub fn submit_convert(&self, task_id: String, job: ConvertJob) {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run_convert(&task_id, job).await;
        });
    }

    async fn run_generate(&self, task_id: &str, job: GenerateJob) {
        let Some(_permit) = self.acquire_permit(task_id).await else {
            cleanup_temp_file(job.guide_audio.as_deref()).await;
            return;
        };
        self.registry.mark_running(task_id).await;

        let outcome = self.execute_generate(&job).await;
        self.finish(task_id, outcome).await;

        cleanup_temp_file(job.guide_audio.as_deref()).await;
    }

    async fn run_convert(&self, task_id: &str, job: ConvertJob) {
        let Some(_permit) = self.acquire_permit(task_id).await else {
            cleanup_temp_file(Some(&job.audio_path)).await;
            return;
        };
        self.registry.mark_running(task_id).await;

        let outcome = self.execute_convert(&job).await;
        self.finish(task_id, outcome).await;

        cleanup_temp_file(Some(&job.audio_path)).await;
    }

    async fn execute_generate(
        &self,
        job: &GenerateJob,
    ) -> Result<(TrackResult, String), JobError> {
        let audio = match &job.guide_audio {
            Some(path) => Some(read_attachment(path).await?),
            None => None,
        };

        let raw = self
            .provider
            .run(ProviderInput {
                prompt: job.prompt.clone(),
                duration: Some(job.duration),
                audio,
            })
            .await?;

        let audio_url = extract_audio_url(&raw).ok_or(JobError::NoAudioUrl)?;
        let result = TrackResult {
            id: Uuid::new_v4(),
            title: "AI_Generated_Track".to_string(),
            genres: job.genres.clone(),
            moods: job.moods.clone(),
            duration: job.duration,
            audio_url: audio_url.clone(),
            created_at: Utc::now(),
            kind: TrackKind::Generated,
        };
        Ok((result, audio_url))
    }

    async fn execute_convert(
        &self,
        job: &ConvertJob,
    ) -> Result<(TrackResult, String), JobError> {
        let audio = read_attachment(&job.audio_path).await?;
        let full_prompt = format!(
            "{}. target genre: {}, intensity {}",
            job.prompt, job.target_genre, job.intensity
        );

        let raw = self
            .provider
            .run(ProviderInput {
                prompt: full_prompt,
                duration: None,
                audio: Some(audio),
            })
            .await?;

        let audio_url = extract_audio_url(&raw).ok_or(JobError::NoAudioUrl)?;
        let genres = if job.target_genre.is_empty() {
            Vec::new()
        } else {
            vec![job.target_genre.clone()]
        };
        let result = TrackResult {
            id: Uuid::new_v4(),
            title: "Converted_Track".to_string(),
            genres,
            moods: Vec::new(),
            duration: job.duration,
            audio_url: audio_url.clone(),
            created_at: Utc::now(),
            kind: TrackKind::Converted,
        };
        Ok((result, audio_url))
    }

    /// Wait for a worker slot; the task stays queued while waiting
    async fn acquire_permit(&self, task_id: &str) -> Option<tokio::sync::OwnedSemaphorePermit> {
        match self.permits.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                self.registry
                    .mark_failed(task_id, "worker pool shut down")
                    .await;
                None
            }
        }
    }

    async fn finish(&self, task_id: &str, outcome: Result<(TrackResult, String), JobError>) {
        match outcome {
            Ok((result, audio_url)) => {
                info!(task_id = %task_id, audio_url = %audio_url, "job succeeded");
                self.registry
                    .mark_succeeded(task_id, result, audio_url)
                    .await;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "job failed");
                self.registry.mark_failed(task_id, e.to_string()).await;
            }
        }
    }
}

async fn read_attachment(path: &Path) -> std::io::Result<AudioAttachment> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(AudioAttachment { bytes, filename })
}

/// Best-effort removal of a job's transient upload
async fn cleanup_temp_file(path: Option<&Path>) {
    let Some(path) = path else { return };
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove temporary upload");
    }
}
