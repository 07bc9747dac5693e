//! Worker error types.

use thiserror::Error;

use reel_media::MediaError;
use reel_models::RequestError;

use crate::queue::AdmissionError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Failed to materialize scene {scene}: {source}")]
    Materialize {
        scene: usize,
        #[source]
        source: MediaError,
    },

    #[error("Concatenation failed: {0}")]
    Concatenation(#[source] MediaError),

    #[error("Admission failed: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WorkerError {
    pub fn materialize(scene: usize, source: MediaError) -> Self {
        Self::Materialize { scene, source }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the failure came from a killed transcoder process.
    pub fn is_timeout(&self) -> bool {
        match self {
            WorkerError::Materialize { source, .. }
            | WorkerError::Concatenation(source)
            | WorkerError::Media(source) => source.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkerError::materialize(2, MediaError::Decode("bad padding".into()));
        assert_eq!(
            err.to_string(),
            "Failed to materialize scene 2: Failed to decode media payload: bad padding"
        );

        let err = WorkerError::from(RequestError::NoScenes);
        assert!(err.to_string().starts_with("Invalid request"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(WorkerError::Concatenation(MediaError::Timeout(180)).is_timeout());
        assert!(!WorkerError::config_error("bad").is_timeout());
    }
}
