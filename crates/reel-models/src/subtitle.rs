//! Subtitle text and styling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Font family used when none is requested or none of the requested files exist.
pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans";
/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 48;
/// Default text color.
pub const DEFAULT_FONT_COLOR: &str = "white";
/// Default background box color.
pub const DEFAULT_BACKGROUND_COLOR: &str = "black";
/// Default background box opacity, percent.
pub const DEFAULT_BACKGROUND_OPACITY: f64 = 50.0;

/// Vertical anchor of the subtitle block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl SubtitlePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitlePosition::Top => "top",
            SubtitlePosition::Center => "center",
            SubtitlePosition::Bottom => "bottom",
        }
    }
}

impl fmt::Display for SubtitlePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boxed background drawn behind the subtitle text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleBackground {
    #[serde(default = "default_background_color")]
    pub color: String,
    /// Opacity, 0-100 percent.
    #[serde(default = "default_background_opacity")]
    pub opacity: f64,
}

impl Default for SubtitleBackground {
    fn default() -> Self {
        Self {
            color: default_background_color(),
            opacity: default_background_opacity(),
        }
    }
}

/// Subtitle burned into one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleSpec {
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_font_color")]
    pub color: String,
    #[serde(default)]
    pub position: SubtitlePosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<SubtitleBackground>,
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}
fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}
fn default_font_color() -> String {
    DEFAULT_FONT_COLOR.to_string()
}
fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}
fn default_background_opacity() -> f64 {
    DEFAULT_BACKGROUND_OPACITY
}

impl SubtitleSpec {
    /// Subtitle with default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size: DEFAULT_FONT_SIZE,
            color: default_font_color(),
            position: SubtitlePosition::default(),
            background: None,
        }
    }

    pub fn with_position(mut self, position: SubtitlePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_background(mut self, background: SubtitleBackground) -> Self {
        self.background = Some(background);
        self
    }
}

/// Whether a color string is safe to place in a filter graph.
///
/// Accepts color names (`white`, `navy`), `#RRGGBB[AA]` and `0xRRGGBB[AA]`.
pub fn is_valid_color(color: &str) -> bool {
    let hex = color
        .strip_prefix('#')
        .or_else(|| color.strip_prefix("0x"))
        .or_else(|| color.strip_prefix("0X"));

    match hex {
        Some(digits) => {
            (digits.len() == 6 || digits.len() == 8)
                && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => !color.is_empty() && color.chars().all(|c| c.is_ascii_alphabetic()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_defaults_from_json() {
        let spec: SubtitleSpec = serde_json::from_str(r#"{"text":"Hello"}"#).unwrap();
        assert_eq!(spec.font_family, DEFAULT_FONT_FAMILY);
        assert_eq!(spec.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(spec.position, SubtitlePosition::Bottom);
        assert!(spec.background.is_none());
    }

    #[test]
    fn test_position_parsing() {
        let spec: SubtitleSpec =
            serde_json::from_str(r#"{"text":"x","position":"top","background":{}}"#).unwrap();
        assert_eq!(spec.position, SubtitlePosition::Top);
        assert_eq!(spec.background, Some(SubtitleBackground::default()));
    }

    #[test]
    fn test_color_validation() {
        assert!(is_valid_color("white"));
        assert!(is_valid_color("#FF00aa"));
        assert!(is_valid_color("0xFFFFFF80"));
        assert!(!is_valid_color("#FFF"));
        assert!(!is_valid_color("red:box=1"));
        assert!(!is_valid_color(""));
    }
}
