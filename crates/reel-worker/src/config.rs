//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reel_media::materialize::{ShortAudioPolicy, DEFAULT_MIN_AUDIO_BYTES};
use reel_media::render::RenderOptions;
use reel_media::DEFAULT_MAX_LINE_CHARS;
use reel_models::EncodingConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrently running composition and audio jobs
    pub max_concurrent_jobs: usize,
    /// Root for per-run scratch directories
    pub work_dir: PathBuf,
    /// Timeout of one scene render
    pub scene_timeout: Duration,
    /// Timeout of one combination (still image, audio concat, final concat)
    pub combine_timeout: Duration,
    /// Subtitle wrap width in characters
    pub subtitle_max_line_chars: usize,
    /// Replacement for narration audio below `min_audio_bytes`
    pub fallback_audio_path: Option<PathBuf>,
    pub min_audio_bytes: u64,
    /// Prometheus listener; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
    /// Output encoding for rendered scenes and the final video
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            work_dir: default_work_dir(),
            scene_timeout: Duration::from_secs(60),
            combine_timeout: Duration::from_secs(180),
            subtitle_max_line_chars: DEFAULT_MAX_LINE_CHARS,
            fallback_audio_path: None,
            min_audio_bytes: DEFAULT_MIN_AUDIO_BYTES,
            metrics_addr: None,
            encoding: EncodingConfig::default(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("reel")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse::<usize>("REEL_MAX_CONCURRENT_JOBS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("REEL_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            scene_timeout: env_parse("REEL_SCENE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.scene_timeout),
            combine_timeout: env_parse("REEL_COMBINE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.combine_timeout),
            subtitle_max_line_chars: env_parse::<usize>("REEL_SUBTITLE_MAX_LINE_CHARS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.subtitle_max_line_chars),
            fallback_audio_path: std::env::var("REEL_FALLBACK_AUDIO_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            min_audio_bytes: env_parse("REEL_MIN_AUDIO_BYTES").unwrap_or(defaults.min_audio_bytes),
            metrics_addr: env_parse("REEL_METRICS_ADDR"),
            encoding: defaults.encoding,
        }
    }

    /// Scratch root for composition runs.
    pub fn video_dir(&self) -> PathBuf {
        self.work_dir.join("video")
    }

    /// Scratch root for audio combination runs.
    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.join("audio")
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            encoding: self.encoding.clone(),
            timeout: self.scene_timeout,
            max_line_chars: self.subtitle_max_line_chars,
        }
    }

    pub fn short_audio_policy(&self) -> ShortAudioPolicy {
        ShortAudioPolicy {
            min_bytes: self.min_audio_bytes,
            fallback: self.fallback_audio_path.clone(),
        }
    }
}
