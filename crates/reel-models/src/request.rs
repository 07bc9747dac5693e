//! Composition and audio combination requests and their results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobId;
use crate::scene::{EffectToggle, MediaSource, Scene, SceneSource};
use crate::subtitle::is_valid_color;

/// Smallest accepted subtitle font size in pixels.
pub const MIN_FONT_SIZE: u32 = 8;
/// Largest accepted subtitle font size in pixels.
pub const MAX_FONT_SIZE: u32 = 200;

/// Request validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("At least one scene is required")]
    NoScenes,

    #[error("At least one audio segment is required")]
    NoSegments,

    #[error("Scene {scene}: {field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        scene: usize,
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Scene {scene}: {field} has invalid color '{value}'")]
    InvalidColor {
        scene: usize,
        field: &'static str,
        value: String,
    },

    #[error("{0}: media payload is empty")]
    EmptyMedia(String),
}

/// Request to compose a video out of an ordered list of scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompositionRequest {
    #[serde(default)]
    pub job_id: JobId,
    pub scenes: Vec<Scene>,
}

impl CompositionRequest {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            job_id: JobId::new(),
            scenes,
        }
    }

    /// Validate the request.
    ///
    /// Checks:
    /// - The scene list is non-empty
    /// - Adjustment values and effect intensities are within their scales
    /// - Subtitle sizes and colors are acceptable
    /// - No inline media payload is empty
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.scenes.is_empty() {
            return Err(RequestError::NoScenes);
        }

        for (index, scene) in self.scenes.iter().enumerate() {
            validate_scene(index, scene)?;
        }

        Ok(())
    }
}

fn check_range(
    scene: usize,
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), RequestError> {
    match value {
        Some(v) if !(min..=max).contains(&v) || v.is_nan() => Err(RequestError::OutOfRange {
            scene,
            field,
            min,
            max,
            value: v,
        }),
        _ => Ok(()),
    }
}

fn check_color(scene: usize, field: &'static str, color: &str) -> Result<(), RequestError> {
    if is_valid_color(color) {
        Ok(())
    } else {
        Err(RequestError::InvalidColor {
            scene,
            field,
            value: color.to_string(),
        })
    }
}

fn check_media(label: String, media: &MediaSource) -> Result<(), RequestError> {
    match media {
        MediaSource::Base64 { data, .. } if data.trim().is_empty() => {
            Err(RequestError::EmptyMedia(label))
        }
        MediaSource::Path { path } if path.as_os_str().is_empty() => {
            Err(RequestError::EmptyMedia(label))
        }
        _ => Ok(()),
    }
}

fn validate_scene(index: usize, scene: &Scene) -> Result<(), RequestError> {
    let settings = &scene.settings;
    check_range(index, "brightness", settings.brightness, 0.0, 200.0)?;
    check_range(index, "contrast", settings.contrast, 0.0, 300.0)?;
    check_range(index, "saturation", settings.saturation, 0.0, 300.0)?;
    check_range(index, "volume", settings.volume, 0.0, f64::MAX)?;
    check_range(index, "duration_secs", scene.duration_secs, 0.0, f64::MAX)?;

    let effects = &settings.effects;
    let toggles: [(&'static str, &EffectToggle); 9] = [
        ("fade_in", &effects.fade_in),
        ("fade_out", &effects.fade_out),
        ("zoom_in", &effects.zoom_in),
        ("zoom_out", &effects.zoom_out),
        ("blur", &effects.blur),
        ("sharpen", &effects.sharpen),
        ("vintage", &effects.vintage),
        ("black_and_white", &effects.black_and_white),
        ("sepia", &effects.sepia),
    ];
    for (field, toggle) in toggles {
        check_range(index, field, toggle.intensity, 0.0, 100.0)?;
    }

    if let Some(subtitle) = &scene.subtitle {
        check_range(
            index,
            "subtitle.font_size",
            Some(f64::from(subtitle.font_size)),
            f64::from(MIN_FONT_SIZE),
            f64::from(MAX_FONT_SIZE),
        )?;
        check_color(index, "subtitle.color", &subtitle.color)?;
        if let Some(background) = &subtitle.background {
            check_color(index, "subtitle.background.color", &background.color)?;
            check_range(
                index,
                "subtitle.background.opacity",
                Some(background.opacity),
                0.0,
                100.0,
            )?;
        }
    }

    match &scene.source {
        SceneSource::Clip { video } => check_media(format!("Scene {} video", index), video),
        SceneSource::AudioImage { audio, image } => {
            check_media(format!("Scene {} audio", index), audio)?;
            check_media(format!("Scene {} image", index), image)
        }
    }
}

/// Outcome of a composition job as returned to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompositionResult {
    Success {
        job_id: JobId,
        /// Final video, base64-encoded.
        video_base64: String,
        mime_type: String,
        scene_count: usize,
        /// Indices of scenes that fell back to their unprocessed clip.
        fallback_scenes: Vec<usize>,
    },
    Failure {
        job_id: JobId,
        message: String,
    },
}

impl CompositionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CompositionResult::Success { .. })
    }

    pub fn failure(job_id: JobId, message: impl Into<String>) -> Self {
        Self::Failure {
            job_id,
            message: message.into(),
        }
    }
}

/// Request to join several narration segments into one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioCombinationRequest {
    #[serde(default)]
    pub job_id: JobId,
    pub segments: Vec<MediaSource>,
}

impl AudioCombinationRequest {
    pub fn new(segments: Vec<MediaSource>) -> Self {
        Self {
            job_id: JobId::new(),
            segments,
        }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.segments.is_empty() {
            return Err(RequestError::NoSegments);
        }
        for (index, segment) in self.segments.iter().enumerate() {
            check_media(format!("Segment {}", index), segment)?;
        }
        Ok(())
    }
}

/// Outcome of an audio combination job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AudioCombinationResult {
    Success {
        job_id: JobId,
        audio_base64: String,
        mime_type: String,
        segment_count: usize,
    },
    Failure {
        job_id: JobId,
        message: String,
    },
}

impl AudioCombinationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AudioCombinationResult::Success { .. })
    }

    pub fn failure(job_id: JobId, message: impl Into<String>) -> Self {
        Self::Failure {
            job_id,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{SubtitleBackground, SubtitleSpec};

    fn clip_scene() -> Scene {
        Scene::from_clip(MediaSource::path("/tmp/scene.mp4"))
    }

    #[test]
    fn test_empty_request_rejected() {
        let request = CompositionRequest::new(vec![]);
        assert_eq!(request.validate(), Err(RequestError::NoScenes));
    }

    #[test]
    fn test_valid_request() {
        let mut scene = clip_scene();
        scene.settings.brightness = Some(200.0);
        scene.settings.contrast = Some(0.0);
        scene.settings.volume = Some(450.0);
        scene.subtitle = Some(SubtitleSpec::new("Hello").with_background(SubtitleBackground::default()));

        assert!(CompositionRequest::new(vec![scene]).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut scene = clip_scene();
        scene.settings.brightness = Some(250.0);
        let err = CompositionRequest::new(vec![scene]).validate().unwrap_err();
        assert!(matches!(err, RequestError::OutOfRange { field: "brightness", .. }));

        let mut scene = clip_scene();
        scene.settings.effects.sepia = EffectToggle::on(140.0);
        let err = CompositionRequest::new(vec![clip_scene(), scene])
            .validate()
            .unwrap_err();
        assert!(matches!(err, RequestError::OutOfRange { scene: 1, field: "sepia", .. }));
    }

    #[test]
    fn test_invalid_subtitle_color_rejected() {
        let mut scene = clip_scene();
        let mut subtitle = SubtitleSpec::new("Hi");
        subtitle.color = "white:fontsize=900".to_string();
        scene.subtitle = Some(subtitle);

        let err = CompositionRequest::new(vec![scene]).validate().unwrap_err();
        assert!(matches!(err, RequestError::InvalidColor { .. }));
    }

    #[test]
    fn test_empty_media_rejected() {
        let scene = Scene::from_clip(MediaSource::base64("  "));
        let err = CompositionRequest::new(vec![scene]).validate().unwrap_err();
        assert_eq!(err, RequestError::EmptyMedia("Scene 0 video".to_string()));

        let audio = AudioCombinationRequest::new(vec![]);
        assert_eq!(audio.validate(), Err(RequestError::NoSegments));
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let result = CompositionResult::failure(JobId::from_string("j"), "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["message"], "boom");
        assert!(!result.is_success());
    }
}
