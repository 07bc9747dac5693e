//! Prometheus metrics for the composition worker.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    // Queue metrics
    pub const QUEUE_ACTIVE: &str = "reel_queue_active_jobs";
    pub const QUEUE_WAITING: &str = "reel_queue_waiting_jobs";

    // Job metrics
    pub const JOBS_SUBMITTED_TOTAL: &str = "reel_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "reel_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reel_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "reel_job_duration_seconds";

    // Scene metrics
    pub const SCENES_RENDERED_TOTAL: &str = "reel_scenes_rendered_total";
    pub const SCENE_FALLBACKS_TOTAL: &str = "reel_scene_fallbacks_total";

    // Recorded by reel-media for every transcoder invocation
    pub const FFMPEG_DURATION_SECONDS: &str = reel_media::command::FFMPEG_DURATION_METRIC;
}

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("Failed to install metrics exporter: {}", e)))
}

/// Update queue occupancy gauges.
pub fn set_queue_depth(active: usize, waiting: usize) {
    gauge!(names::QUEUE_ACTIVE).set(active as f64);
    gauge!(names::QUEUE_WAITING).set(waiting as f64);
}

/// Record a job entering the admission queue.
pub fn record_job_submitted(kind: &'static str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "kind" => kind).increment(1);
}

/// Record a finished job.
///
/// `outcome` is `success`, `timeout` or `failure`.
pub fn record_job_finished(kind: &'static str, outcome: &'static str, duration_secs: f64) {
    if outcome == "success" {
        counter!(names::JOBS_COMPLETED_TOTAL, "kind" => kind).increment(1);
    } else {
        counter!(names::JOBS_FAILED_TOTAL, "kind" => kind, "reason" => outcome).increment(1);
    }
    histogram!(names::JOB_DURATION_SECONDS, "kind" => kind, "outcome" => outcome)
        .record(duration_secs);
}

/// Record a scene render outcome.
pub fn record_scene(status: &'static str) {
    counter!(names::SCENES_RENDERED_TOTAL, "status" => status).increment(1);
}

/// Record a scene that fell back to its source clip.
pub fn record_scene_fallback() {
    counter!(names::SCENE_FALLBACKS_TOTAL).increment(1);
}
