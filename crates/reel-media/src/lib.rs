//! FFmpeg-based scene rendering and video composition.
//!
//! This crate provides:
//! - FFmpeg command building, execution and progress parsing
//! - Typed filter plans for scene adjustments, effects and subtitles
//! - Per-scene rendering with fallback to the source clip
//! - Clip and audio concatenation
//! - Media materialization and per-run temporary file tracking

pub mod combine;
pub mod command;
pub mod concat;
pub mod error;
pub mod filters;
pub mod materialize;
pub mod probe;
pub mod progress;
pub mod render;
pub mod subtitle;
pub mod temp;
pub mod transcoder;

#[cfg(test)]
mod testutil;

pub use combine::combine_audio_image;
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use concat::{concatenate_audio, concatenate_scenes, DEFAULT_COMBINE_TIMEOUT};
pub use error::{MediaError, MediaResult};
pub use filters::{build_filter_plan, AudioFilter, FilterPlan, SceneTiming, VideoFilter};
pub use materialize::{materialize, materialize_audio, MediaKind, ShortAudioPolicy};
pub use probe::{probe_media, probe_media_with, MediaInfo};
pub use progress::FfmpegProgress;
pub use render::{RenderOptions, RenderStatus, RenderedScene, SceneRenderer, DEFAULT_SCENE_TIMEOUT};
pub use subtitle::{FontResolver, DEFAULT_MAX_LINE_CHARS};
pub use temp::TempFileSet;
pub use transcoder::{FfmpegTranscoder, Transcoder};
