//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tempfile::TempDir;

use reel_media::{FfmpegCommand, MediaError, MediaInfo, MediaResult, Transcoder};
use reel_models::{MediaSource, Scene};
use reel_worker::WorkerConfig;

/// Bytes the fake writes for every final concatenation.
pub const FINAL_VIDEO: &[u8] = b"final video bytes";
pub const FINAL_AUDIO: &[u8] = b"final audio bytes";

/// One recorded transcoder call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub inputs: Vec<PathBuf>,
    pub input_args: Vec<Vec<String>>,
    pub output: PathBuf,
    pub output_args: Vec<String>,
    /// Manifest contents when the first input is a concat list.
    pub manifest: Option<String>,
}

impl Invocation {
    pub fn output_value(&self, flag: &str) -> Option<&str> {
        self.output_args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.output_args.get(i + 1))
            .map(String::as_str)
    }

    pub fn is_concat(&self) -> bool {
        self.manifest.is_some()
    }

    pub fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

type FailRule = Box<dyn Fn(&FfmpegCommand) -> bool + Send + Sync>;

/// Transcoder that writes placeholder outputs instead of running ffmpeg.
#[derive(Default)]
pub struct FakeTranscoder {
    calls: Mutex<Vec<Invocation>>,
    fail_when: Option<FailRule>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation matching `rule` with a non-zero exit.
    pub fn failing_when(
        mut self,
        rule: impl Fn(&FfmpegCommand) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(rule));
        self
    }

    /// Make every invocation take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn record(cmd: &FfmpegCommand) -> Invocation {
    let first = &cmd.inputs()[0];
    let manifest = if first.args.iter().any(|a| a == "concat") {
        std::fs::read_to_string(&first.path).ok()
    } else {
        None
    };
    Invocation {
        inputs: cmd.inputs().iter().map(|i| i.path.clone()).collect(),
        input_args: cmd.inputs().iter().map(|i| i.args.clone()).collect(),
        output: cmd.output().to_path_buf(),
        output_args: cmd.get_output_args().to_vec(),
        manifest,
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn run(&self, cmd: &FfmpegCommand, _timeout: Duration) -> MediaResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let invocation = record(cmd);
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.fail_when.as_ref().is_some_and(|rule| rule(cmd)) {
            // A crashed ffmpeg may leave a partial output behind.
            std::fs::write(cmd.output(), b"partial").unwrap();
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with status 1",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ))
        } else {
            let body: &[u8] = match invocation.output_name().as_str() {
                "final.mp4" => FINAL_VIDEO,
                "combined.mp3" => FINAL_AUDIO,
                _ => b"intermediate",
            };
            std::fs::write(cmd.output(), body).unwrap();
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn probe(&self, _path: &Path, _timeout: Duration) -> MediaResult<MediaInfo> {
        Ok(MediaInfo {
            duration: Some(3.0),
            width: Some(640),
            height: Some(360),
            fps: Some(30.0),
            has_audio: true,
        })
    }
}

/// Config rooted in a fresh temporary work dir.
pub fn test_config(max_concurrent_jobs: usize) -> (TempDir, WorkerConfig) {
    let dir = TempDir::new().unwrap();
    let config = WorkerConfig {
        max_concurrent_jobs,
        work_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    (dir, config)
}

/// Scene with an inline clip payload.
pub fn inline_clip(label: &str) -> Scene {
    Scene::from_clip(MediaSource::Base64 {
        data: STANDARD.encode(format!("clip {}", label)),
        mime_type: Some("video/mp4".to_string()),
    })
}

/// Number of entries left anywhere under `dir`.
pub fn leftover_files(dir: &Path) -> usize {
    let mut count = 0;
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            count += 1 + leftover_files(&path);
        } else {
            count += 1;
        }
    }
    count
}

pub fn shared(fake: FakeTranscoder) -> Arc<FakeTranscoder> {
    Arc::new(fake)
}
