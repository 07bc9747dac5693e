//! Structured job logging.
//!
//! Every event carries the job id and operation so a single run can be
//! followed through the admission queue, scene rendering and concatenation.

use tracing::{error, info, warn, Span};

use reel_models::JobId;

/// Operation name of composition jobs.
pub const OP_COMPOSE: &str = "compose_video";
/// Operation name of audio combination jobs.
pub const OP_COMBINE_AUDIO: &str = "combine_audio";

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job progress: {}", message
        );
    }

    /// Log a recoverable problem with one scene.
    pub fn log_scene_warning(&self, scene_index: usize, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            scene_index,
            "Scene warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span covering the whole job, entered by the pipeline.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = self.operation
        )
    }
}
