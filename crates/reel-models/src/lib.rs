//! Shared data models for the Reel composition backend.
//!
//! This crate provides Serde-serializable types for:
//! - Composition and audio combination requests and their results
//! - Scenes, scene media sources and adjustment settings
//! - Subtitle text and styling
//! - Encoding configuration

pub mod encoding;
pub mod job;
pub mod request;
pub mod scene;
pub mod subtitle;

// Re-export common types
pub use encoding::EncodingConfig;
pub use job::JobId;
pub use request::{
    AudioCombinationRequest, AudioCombinationResult, CompositionRequest, CompositionResult,
    RequestError,
};
pub use scene::{
    Effect, EffectSettings, EffectToggle, MediaSource, ResolvedSettings, Scene, SceneSettings,
    SceneSource, ZoomDirection,
};
pub use subtitle::{SubtitleBackground, SubtitlePosition, SubtitleSpec};
