//! Seam between the composition stages and the external transcoder.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};

/// Executes transcoder invocations on behalf of the pipeline stages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run one command, killing it once `timeout` elapses.
    async fn run(&self, cmd: &FfmpegCommand, timeout: Duration) -> MediaResult<()>;

    /// Inspect a media file, giving up once `timeout` elapses.
    async fn probe(&self, path: &Path, timeout: Duration) -> MediaResult<MediaInfo>;
}

/// Production transcoder backed by `ffmpeg`/`ffprobe` on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn run(&self, cmd: &FfmpegCommand, timeout: Duration) -> MediaResult<()> {
        FfmpegRunner::new()
            .with_timeout(timeout.as_secs().max(1))
            .run(cmd)
            .await
    }

    async fn probe(&self, path: &Path, timeout: Duration) -> MediaResult<MediaInfo> {
        probe_media(path, timeout).await
    }
}
