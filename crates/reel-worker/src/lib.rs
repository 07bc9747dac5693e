//! Composition worker.
//!
//! This crate provides:
//! - A bounded FIFO admission queue shared by all jobs
//! - The scene composition and audio combination pipelines
//! - A service converting pipeline outcomes into transport results
//! - Configuration, structured job logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod service;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::{AudioArtifact, CompositionPipeline, VideoArtifact};
pub use queue::{AdmissionError, AdmissionQueue, QueueStats};
pub use service::CompositionService;
