//! Scene definitions and adjustment settings.
//!
//! Settings arrive as loosely populated JSON from the chat front end. Every
//! field is optional on the wire; [`SceneSettings::resolve`] applies the
//! defaults exactly once and produces a fully populated [`ResolvedSettings`]
//! that the render stage consumes without further coalescing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::subtitle::SubtitleSpec;

/// Neutral brightness on the 0-200 percent scale.
pub const DEFAULT_BRIGHTNESS: f64 = 100.0;
/// Neutral contrast on the 0-300 percent scale.
pub const DEFAULT_CONTRAST: f64 = 100.0;
/// Neutral saturation on the 0-300 percent scale.
pub const DEFAULT_SATURATION: f64 = 100.0;
/// Unchanged volume on the percent scale.
pub const DEFAULT_VOLUME: f64 = 100.0;
/// Intensity used when an effect is enabled without an explicit intensity.
pub const DEFAULT_EFFECT_INTENSITY: f64 = 50.0;

/// Where a piece of scene media comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaSource {
    /// Inline payload: raw base64 or a `data:<mime>;base64,` URL.
    Base64 {
        data: String,
        /// Explicit MIME type, overrides the one embedded in a data URL.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// A file already present on local disk. Never deleted by the pipeline.
    Path { path: PathBuf },
}

impl MediaSource {
    /// Inline base64 source.
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64 {
            data: data.into(),
            mime_type: None,
        }
    }

    /// Local file source.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }
}

/// Source media of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneSource {
    /// A pre-rendered clip with its own audio track.
    Clip { video: MediaSource },
    /// Narration audio played over a still image.
    AudioImage { audio: MediaSource, image: MediaSource },
}

/// On/off switch plus strength for one visual effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EffectToggle {
    #[serde(default)]
    pub enabled: bool,
    /// Strength on the 0-100 percent scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

impl EffectToggle {
    /// Enabled effect with the given intensity.
    pub fn on(intensity: f64) -> Self {
        Self {
            enabled: true,
            intensity: Some(intensity),
        }
    }

    fn resolve(&self) -> Effect {
        Effect {
            enabled: self.enabled,
            intensity: self.intensity.unwrap_or(DEFAULT_EFFECT_INTENSITY),
        }
    }
}

/// Raw visual effect settings as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EffectSettings {
    pub fade_in: EffectToggle,
    pub fade_out: EffectToggle,
    pub zoom_in: EffectToggle,
    pub zoom_out: EffectToggle,
    pub blur: EffectToggle,
    pub sharpen: EffectToggle,
    pub vintage: EffectToggle,
    pub black_and_white: EffectToggle,
    pub sepia: EffectToggle,
}

/// Raw per-scene adjustment settings as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SceneSettings {
    /// Brightness, 0-200 percent (100 = unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    /// Contrast, 0-300 percent (100 = unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    /// Saturation, 0-300 percent (100 = unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    /// Volume, percent (100 = unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    pub effects: EffectSettings,
}

/// Resolved state of one effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub enabled: bool,
    /// Strength on the 0-100 percent scale.
    pub intensity: f64,
}

impl Effect {
    /// Disabled effect carrying the default intensity.
    pub const OFF: Effect = Effect {
        enabled: false,
        intensity: DEFAULT_EFFECT_INTENSITY,
    };
}

/// Direction of the zoom effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Fully populated scene settings. Produced once per scene at pipeline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub volume: f64,
    pub fade_in: Effect,
    pub fade_out: Effect,
    /// Zoom in and zoom out are mutually exclusive; zoom in wins when both are set.
    pub zoom: Option<(ZoomDirection, f64)>,
    pub blur: Effect,
    pub sharpen: Effect,
    pub vintage: Effect,
    pub black_and_white: Effect,
    pub sepia: Effect,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        SceneSettings::default().resolve()
    }
}

impl SceneSettings {
    /// Apply defaults and produce the settings the render stage works with.
    pub fn resolve(&self) -> ResolvedSettings {
        let effects = &self.effects;
        let zoom = if effects.zoom_in.enabled {
            Some((ZoomDirection::In, effects.zoom_in.resolve().intensity))
        } else if effects.zoom_out.enabled {
            Some((ZoomDirection::Out, effects.zoom_out.resolve().intensity))
        } else {
            None
        };

        ResolvedSettings {
            brightness: self.brightness.unwrap_or(DEFAULT_BRIGHTNESS),
            contrast: self.contrast.unwrap_or(DEFAULT_CONTRAST),
            saturation: self.saturation.unwrap_or(DEFAULT_SATURATION),
            volume: self.volume.unwrap_or(DEFAULT_VOLUME),
            fade_in: effects.fade_in.resolve(),
            fade_out: effects.fade_out.resolve(),
            zoom,
            blur: effects.blur.resolve(),
            sharpen: effects.sharpen.resolve(),
            vintage: effects.vintage.resolve(),
            black_and_white: effects.black_and_white.resolve(),
            sepia: effects.sepia.resolve(),
        }
    }
}

/// One segment of the final video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub source: SceneSource,
    #[serde(default)]
    pub settings: SceneSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<SubtitleSpec>,
    /// Known duration of the scene media in seconds, preferred over probing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl Scene {
    /// Scene built from a pre-rendered clip with default settings.
    pub fn from_clip(video: MediaSource) -> Self {
        Self {
            source: SceneSource::Clip { video },
            settings: SceneSettings::default(),
            subtitle: None,
            duration_secs: None,
        }
    }

    /// Subtitle to burn in, if any text remains after trimming.
    pub fn active_subtitle(&self) -> Option<&SubtitleSpec> {
        self.subtitle
            .as_ref()
            .filter(|subtitle| !subtitle.text.trim().is_empty())
    }
}
