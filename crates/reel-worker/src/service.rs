//! Job entry points for the transport layer.
//!
//! Requests are validated before admission; valid ones wait in the shared
//! [`AdmissionQueue`] and run through the [`CompositionPipeline`]. Every outcome
//! is converted into the serializable result enums.

use std::sync::Arc;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::warn;

use reel_media::{FfmpegTranscoder, Transcoder};
use reel_models::{
    AudioCombinationRequest, AudioCombinationResult, CompositionRequest, CompositionResult,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::pipeline::{AudioArtifact, CompositionPipeline, VideoArtifact};
use crate::queue::{AdmissionQueue, QueueStats};

const KIND_COMPOSITION: &str = "composition";
const KIND_AUDIO: &str = "audio_combination";

/// Metric label for a finished job.
fn job_outcome<T>(result: &WorkerResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_timeout() => "timeout",
        Err(_) => "failure",
    }
}

/// Admission-controlled composition service.
#[derive(Clone)]
pub struct CompositionService {
    queue: AdmissionQueue,
    pipeline: CompositionPipeline,
}

impl CompositionService {
    /// Service backed by `ffmpeg`/`ffprobe` on `PATH`.
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_transcoder(config, Arc::new(FfmpegTranscoder))
    }

    pub fn with_transcoder(config: WorkerConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self::from_pipeline(CompositionPipeline::new(config, transcoder))
    }

    pub fn from_pipeline(pipeline: CompositionPipeline) -> Self {
        Self {
            queue: AdmissionQueue::new(pipeline.config().max_concurrent_jobs),
            pipeline,
        }
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Compose a video, waiting for admission first.
    pub async fn compose(&self, request: CompositionRequest) -> WorkerResult<VideoArtifact> {
        request.validate()?;
        metrics::record_job_submitted(KIND_COMPOSITION);

        let pipeline = self.pipeline.clone();
        let started = Instant::now();
        let result = self
            .queue
            .submit(async move { pipeline.compose(&request).await })
            .await
            .map_err(WorkerError::from)
            .and_then(|result| result);

        metrics::record_job_finished(
            KIND_COMPOSITION,
            job_outcome(&result),
            started.elapsed().as_secs_f64(),
        );
        result
    }

    /// Combine narration segments, waiting for admission first.
    pub async fn combine_audio(
        &self,
        request: AudioCombinationRequest,
    ) -> WorkerResult<AudioArtifact> {
        request.validate()?;
        metrics::record_job_submitted(KIND_AUDIO);

        let pipeline = self.pipeline.clone();
        let started = Instant::now();
        let result = self
            .queue
            .submit(async move { pipeline.combine_audio(&request).await })
            .await
            .map_err(WorkerError::from)
            .and_then(|result| result);

        metrics::record_job_finished(
            KIND_AUDIO,
            job_outcome(&result),
            started.elapsed().as_secs_f64(),
        );
        result
    }

    /// Run a composition job and report its outcome.
    pub async fn submit_composition_job(&self, request: CompositionRequest) -> CompositionResult {
        let job_id = request.job_id.clone();
        match self.compose(request).await {
            Ok(artifact) => CompositionResult::Success {
                job_id,
                video_base64: STANDARD.encode(&artifact.data),
                mime_type: artifact.mime_type.to_string(),
                scene_count: artifact.scene_count,
                fallback_scenes: artifact.fallback_scenes,
            },
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Composition job failed");
                CompositionResult::failure(job_id, e.to_string())
            }
        }
    }

    /// Run an audio combination job and report its outcome.
    pub async fn submit_audio_combination_job(
        &self,
        request: AudioCombinationRequest,
    ) -> AudioCombinationResult {
        let job_id = request.job_id.clone();
        match self.combine_audio(request).await {
            Ok(artifact) => AudioCombinationResult::Success {
                job_id,
                audio_base64: STANDARD.encode(&artifact.data),
                mime_type: artifact.mime_type.to_string(),
                segment_count: artifact.segment_count,
            },
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Audio combination job failed");
                AudioCombinationResult::failure(job_id, e.to_string())
            }
        }
    }
}
