//! Typed FFmpeg filter directives for scene rendering.
//!
//! Scene settings are translated into an ordered [`FilterPlan`] of
//! [`VideoFilter`] and [`AudioFilter`] variants carrying normalized numeric
//! parameters. Serialization into filter-graph syntax happens separately in
//! the `Display` impls, so numeric policy and textual escaping can be tested
//! on their own.
//!
//! Video order is fixed: color adjustment, fade-in, fade-out, zoom, blur,
//! sharpen, vintage, black-and-white, sepia, subtitle. The subtitle is always
//! last.

use std::fmt;
use std::path::PathBuf;

use reel_models::{ResolvedSettings, SubtitlePosition, ZoomDirection};

use crate::subtitle::escape_filter_value;

/// Frame rate assumed when the source does not report one.
pub const DEFAULT_FPS: f64 = 30.0;
/// Duration assumed for zoom when the scene length is unknown.
pub const DEFAULT_ZOOM_DURATION_SECS: f64 = 5.0;

/// Shortest fade, at 0 percent intensity.
const FADE_MIN_SECS: f64 = 0.2;
/// Additional fade length at 100 percent intensity.
const FADE_RANGE_SECS: f64 = 1.8;
/// Additional zoom factor at 100 percent intensity.
const ZOOM_RANGE: f64 = 0.5;
/// `gblur` sigma at 100 percent intensity.
const BLUR_MAX_SIGMA: f64 = 10.0;
/// `unsharp` luma amount at 100 percent intensity.
const SHARPEN_MAX_AMOUNT: f64 = 1.5;
/// Temporal noise strength at 100 percent intensity.
const VINTAGE_MAX_NOISE: f64 = 20.0;

/// Classic sepia color matrix (rows r, g, b).
const SEPIA_MATRIX: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Conversions from client percent scales to filter-native ranges.
pub mod normalize {
    /// Brightness 0-200 percent to `eq` brightness -1.0..=1.0.
    pub fn brightness(percent: f64) -> f64 {
        (percent / 100.0 - 1.0).clamp(-1.0, 1.0)
    }

    /// Contrast 0-300 percent to `eq` contrast 0.0..=3.0.
    pub fn contrast(percent: f64) -> f64 {
        (percent / 100.0).clamp(0.0, 3.0)
    }

    /// Saturation 0-300 percent to `eq` saturation 0.0..=3.0.
    pub fn saturation(percent: f64) -> f64 {
        (percent / 100.0).clamp(0.0, 3.0)
    }

    /// Volume percent to a linear multiplier.
    pub fn volume(percent: f64) -> f64 {
        (percent / 100.0).max(0.0)
    }

    /// Effect intensity 0-100 percent to 0.0..=1.0.
    pub fn intensity(percent: f64) -> f64 {
        (percent / 100.0).clamp(0.0, 1.0)
    }
}

/// Format a number for filter syntax: at most 3 decimals, no trailing zeros.
pub fn fmt_num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Source of the subtitle text.
#[derive(Debug, Clone, PartialEq)]
pub enum SubtitleText {
    /// Short ASCII text embedded in the filter argument.
    Inline(String),
    /// Text written to a side-channel file.
    File(PathBuf),
}

/// Fully prepared `drawtext` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleDirective {
    pub text: SubtitleText,
    pub font_file: Option<PathBuf>,
    pub font_size: u32,
    pub color: String,
    pub position: SubtitlePosition,
    /// Box color and opacity (0.0..=1.0).
    pub background: Option<(String, f64)>,
}

impl SubtitleDirective {
    /// `y` expression anchoring the text block.
    pub fn y_expression(&self) -> &'static str {
        match self.position {
            SubtitlePosition::Top => "h*0.08",
            SubtitlePosition::Center => "(h-text_h)/2",
            SubtitlePosition::Bottom => "h-text_h-h*0.08",
        }
    }
}

/// One video filter directive with normalized parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoFilter {
    /// `eq` color adjustment; identity components are left out.
    ColorAdjust {
        brightness: f64,
        contrast: f64,
        saturation: f64,
    },
    FadeIn {
        duration: f64,
    },
    FadeOut {
        start: f64,
        duration: f64,
    },
    Zoom {
        direction: ZoomDirection,
        factor: f64,
        frames: u64,
        width: u32,
        height: u32,
        fps: f64,
    },
    Blur {
        sigma: f64,
    },
    Sharpen {
        amount: f64,
    },
    Vintage {
        noise: f64,
    },
    BlackAndWhite {
        saturation: f64,
    },
    Sepia {
        strength: f64,
    },
    Subtitle(SubtitleDirective),
}

impl VideoFilter {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            VideoFilter::ColorAdjust { .. } => "color",
            VideoFilter::FadeIn { .. } => "fade_in",
            VideoFilter::FadeOut { .. } => "fade_out",
            VideoFilter::Zoom { .. } => "zoom",
            VideoFilter::Blur { .. } => "blur",
            VideoFilter::Sharpen { .. } => "sharpen",
            VideoFilter::Vintage { .. } => "vintage",
            VideoFilter::BlackAndWhite { .. } => "black_and_white",
            VideoFilter::Sepia { .. } => "sepia",
            VideoFilter::Subtitle(_) => "subtitle",
        }
    }
}

impl fmt::Display for VideoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoFilter::ColorAdjust {
                brightness,
                contrast,
                saturation,
            } => {
                let mut parts = Vec::new();
                if *brightness != 0.0 {
                    parts.push(format!("brightness={}", fmt_num(*brightness)));
                }
                if *contrast != 1.0 {
                    parts.push(format!("contrast={}", fmt_num(*contrast)));
                }
                if *saturation != 1.0 {
                    parts.push(format!("saturation={}", fmt_num(*saturation)));
                }
                write!(f, "eq={}", parts.join(":"))
            }
            VideoFilter::FadeIn { duration } => {
                write!(f, "fade=t=in:st=0:d={}", fmt_num(*duration))
            }
            VideoFilter::FadeOut { start, duration } => write!(
                f,
                "fade=t=out:st={}:d={}",
                fmt_num(*start),
                fmt_num(*duration)
            ),
            VideoFilter::Zoom {
                direction,
                factor,
                frames,
                width,
                height,
                fps,
            } => {
                let delta = fmt_num(factor - 1.0);
                let z = match direction {
                    ZoomDirection::In => format!("1+{}*on/{}", delta, frames),
                    ZoomDirection::Out => format!("{}-{}*on/{}", fmt_num(*factor), delta, frames),
                };
                write!(
                    f,
                    "zoompan=z='{}':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={}x{}:fps={}",
                    z,
                    width,
                    height,
                    fmt_num(*fps)
                )
            }
            VideoFilter::Blur { sigma } => write!(f, "gblur=sigma={}", fmt_num(*sigma)),
            VideoFilter::Sharpen { amount } => {
                write!(f, "unsharp=5:5:{}:5:5:0", fmt_num(*amount))
            }
            VideoFilter::Vintage { noise } => {
                write!(f, "curves=preset=vintage,noise=alls={}:allf=t+u", fmt_num(*noise))
            }
            VideoFilter::BlackAndWhite { saturation } => {
                write!(f, "hue=s={}", fmt_num(*saturation))
            }
            VideoFilter::Sepia { strength } => {
                let k = *strength;
                let mut params = Vec::with_capacity(9);
                for (row, channel) in ["r", "g", "b"].iter().enumerate() {
                    for (col, source) in ["r", "g", "b"].iter().enumerate() {
                        let identity = if row == col { 1.0 } else { 0.0 };
                        let value = identity * (1.0 - k) + SEPIA_MATRIX[row][col] * k;
                        params.push(format!("{}{}={}", channel, source, fmt_num(value)));
                    }
                }
                write!(f, "colorchannelmixer={}", params.join(":"))
            }
            VideoFilter::Subtitle(subtitle) => {
                let mut params = Vec::new();
                if let Some(font) = &subtitle.font_file {
                    params.push(format!(
                        "fontfile={}",
                        escape_filter_value(&font.to_string_lossy())
                    ));
                }
                match &subtitle.text {
                    SubtitleText::Inline(text) => {
                        params.push(format!("text={}", escape_filter_value(text)))
                    }
                    SubtitleText::File(path) => params.push(format!(
                        "textfile={}",
                        escape_filter_value(&path.to_string_lossy())
                    )),
                }
                params.push("expansion=none".to_string());
                params.push(format!("fontsize={}", subtitle.font_size));
                params.push(format!("fontcolor={}", subtitle.color));
                params.push("line_spacing=8".to_string());
                params.push("x=(w-text_w)/2".to_string());
                params.push(format!("y={}", subtitle.y_expression()));
                if let Some((color, opacity)) = &subtitle.background {
                    params.push("box=1".to_string());
                    params.push(format!("boxcolor={}@{:.2}", color, opacity));
                    params.push("boxborderw=12".to_string());
                }
                write!(f, "drawtext={}", params.join(":"))
            }
        }
    }
}

/// One audio filter directive.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioFilter {
    Volume { multiplier: f64 },
}

impl fmt::Display for AudioFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFilter::Volume { multiplier } => write!(f, "volume={}", fmt_num(*multiplier)),
        }
    }
}

/// Timing and geometry of the scene source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneTiming {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

/// Ordered video and audio directives for one scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPlan {
    pub video: Vec<VideoFilter>,
    pub audio: Vec<AudioFilter>,
}

impl FilterPlan {
    /// Nothing to apply: the scene can be used as is.
    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    /// Serialized `-vf` graph.
    pub fn video_graph(&self) -> Option<String> {
        join_filters(&self.video)
    }

    /// Serialized `-af` graph.
    pub fn audio_graph(&self) -> Option<String> {
        join_filters(&self.audio)
    }

    /// Directive names in order, for logging.
    pub fn video_names(&self) -> Vec<&'static str> {
        self.video.iter().map(VideoFilter::name).collect()
    }
}

fn join_filters<T: fmt::Display>(filters: &[T]) -> Option<String> {
    if filters.is_empty() {
        None
    } else {
        Some(
            filters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

fn fade_duration(intensity: f64) -> f64 {
    FADE_MIN_SECS + FADE_RANGE_SECS * normalize::intensity(intensity)
}

/// Translate resolved settings into an ordered filter plan.
///
/// Directives whose net effect is the identity are omitted. Fade-out needs
/// the scene duration and zoom needs the frame size; each is left out when
/// that information is missing.
pub fn build_filter_plan(
    settings: &ResolvedSettings,
    timing: &SceneTiming,
    subtitle: Option<SubtitleDirective>,
) -> FilterPlan {
    let mut video = Vec::new();

    let brightness = normalize::brightness(settings.brightness);
    let contrast = normalize::contrast(settings.contrast);
    let saturation = normalize::saturation(settings.saturation);
    if brightness != 0.0 || contrast != 1.0 || saturation != 1.0 {
        video.push(VideoFilter::ColorAdjust {
            brightness,
            contrast,
            saturation,
        });
    }

    if settings.fade_in.enabled {
        video.push(VideoFilter::FadeIn {
            duration: fade_duration(settings.fade_in.intensity),
        });
    }

    if settings.fade_out.enabled {
        if let Some(total) = timing.duration {
            let duration = fade_duration(settings.fade_out.intensity).min(total);
            video.push(VideoFilter::FadeOut {
                start: (total - duration).max(0.0),
                duration,
            });
        }
    }

    if let Some((direction, intensity)) = settings.zoom {
        let k = normalize::intensity(intensity);
        if let (true, Some(width), Some(height)) = (k > 0.0, timing.width, timing.height) {
            let fps = timing.fps.unwrap_or(DEFAULT_FPS);
            let duration = timing.duration.unwrap_or(DEFAULT_ZOOM_DURATION_SECS);
            video.push(VideoFilter::Zoom {
                direction,
                factor: 1.0 + ZOOM_RANGE * k,
                frames: ((duration * fps).round() as u64).max(1),
                width,
                height,
                fps,
            });
        }
    }

    let strength = |enabled: bool, intensity: f64| {
        if enabled {
            Some(normalize::intensity(intensity)).filter(|k| *k > 0.0)
        } else {
            None
        }
    };

    if let Some(k) = strength(settings.blur.enabled, settings.blur.intensity) {
        video.push(VideoFilter::Blur {
            sigma: BLUR_MAX_SIGMA * k,
        });
    }
    if let Some(k) = strength(settings.sharpen.enabled, settings.sharpen.intensity) {
        video.push(VideoFilter::Sharpen {
            amount: SHARPEN_MAX_AMOUNT * k,
        });
    }
    if let Some(k) = strength(settings.vintage.enabled, settings.vintage.intensity) {
        video.push(VideoFilter::Vintage {
            noise: VINTAGE_MAX_NOISE * k,
        });
    }
    if let Some(k) = strength(
        settings.black_and_white.enabled,
        settings.black_and_white.intensity,
    ) {
        video.push(VideoFilter::BlackAndWhite {
            saturation: 1.0 - k,
        });
    }
    if let Some(k) = strength(settings.sepia.enabled, settings.sepia.intensity) {
        video.push(VideoFilter::Sepia { strength: k });
    }

    if let Some(subtitle) = subtitle {
        video.push(VideoFilter::Subtitle(subtitle));
    }

    let mut audio = Vec::new();
    let multiplier = normalize::volume(settings.volume);
    if multiplier != 1.0 {
        audio.push(AudioFilter::Volume { multiplier });
    }

    FilterPlan { video, audio }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{Effect, SceneSettings};

    fn timing() -> SceneTiming {
        SceneTiming {
            duration: Some(4.0),
            width: Some(1280),
            height: Some(720),
            fps: Some(30.0),
        }
    }

    fn subtitle() -> SubtitleDirective {
        SubtitleDirective {
            text: SubtitleText::Inline("Hello".to_string()),
            font_file: None,
            font_size: 48,
            color: "white".to_string(),
            position: SubtitlePosition::Bottom,
            background: None,
        }
    }

    fn on(intensity: f64) -> Effect {
        Effect {
            enabled: true,
            intensity,
        }
    }

    #[test]
    fn test_normalization() {
        assert!((normalize::brightness(150.0) - 0.5).abs() < 1e-9);
        assert!((normalize::brightness(0.0) + 1.0).abs() < 1e-9);
        assert!((normalize::contrast(50.0) - 0.5).abs() < 1e-9);
        assert!((normalize::saturation(300.0) - 3.0).abs() < 1e-9);
        assert!((normalize::volume(200.0) - 2.0).abs() < 1e-9);
        assert!((normalize::intensity(250.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(0.2), "0.2");
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(0.3933), "0.393");
    }

    #[test]
    fn test_default_settings_produce_empty_plan() {
        let plan = build_filter_plan(&ResolvedSettings::default(), &timing(), None);
        assert!(plan.is_empty());
        assert!(plan.video_graph().is_none());
        assert!(plan.audio_graph().is_none());
    }

    #[test]
    fn test_color_adjust_omits_identity_components() {
        let settings = SceneSettings {
            brightness: Some(120.0),
            ..Default::default()
        }
        .resolve();

        let plan = build_filter_plan(&settings, &timing(), None);
        assert_eq!(plan.video_graph().as_deref(), Some("eq=brightness=0.2"));
    }

    #[test]
    fn test_subtitle_is_placed_after_zoom() {
        let mut settings = ResolvedSettings::default();
        settings.zoom = Some((ZoomDirection::In, 50.0));
        settings.sepia = on(100.0);

        let plan = build_filter_plan(&settings, &timing(), Some(subtitle()));
        let names = plan.video_names();
        let zoom = names.iter().position(|n| *n == "zoom").unwrap();
        let sub = names.iter().position(|n| *n == "subtitle").unwrap();
        assert!(zoom < sub);
        assert_eq!(sub, names.len() - 1);
    }

    #[test]
    fn test_fixed_ordering_with_all_effects() {
        let settings = ResolvedSettings {
            brightness: 110.0,
            fade_in: on(50.0),
            fade_out: on(50.0),
            zoom: Some((ZoomDirection::Out, 50.0)),
            blur: on(50.0),
            sharpen: on(50.0),
            vintage: on(50.0),
            black_and_white: on(50.0),
            sepia: on(50.0),
            ..Default::default()
        };

        let plan = build_filter_plan(&settings, &timing(), Some(subtitle()));
        assert_eq!(
            plan.video_names(),
            vec![
                "color",
                "fade_in",
                "fade_out",
                "zoom",
                "blur",
                "sharpen",
                "vintage",
                "black_and_white",
                "sepia",
                "subtitle"
            ]
        );
    }

    #[test]
    fn test_fade_out_uses_scene_duration() {
        let mut settings = ResolvedSettings::default();
        settings.fade_out = on(100.0);

        let plan = build_filter_plan(&settings, &timing(), None);
        match plan.video.as_slice() {
            [VideoFilter::FadeOut { start, duration }] => {
                assert!((start - 2.0).abs() < 1e-9);
                assert!((duration - 2.0).abs() < 1e-9);
            }
            other => panic!("unexpected plan: {:?}", other),
        }
        assert_eq!(plan.video_graph().as_deref(), Some("fade=t=out:st=2:d=2"));

        let unknown = SceneTiming::default();
        assert!(build_filter_plan(&settings, &unknown, None).is_empty());
    }

    #[test]
    fn test_zoom_serialization() {
        let mut settings = ResolvedSettings::default();
        settings.zoom = Some((ZoomDirection::In, 100.0));

        let plan = build_filter_plan(&settings, &timing(), None);
        assert_eq!(
            plan.video_graph().as_deref(),
            Some("zoompan=z='1+0.5*on/120':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s=1280x720:fps=30")
        );
    }

    #[test]
    fn test_zero_intensity_effects_are_omitted() {
        let mut settings = ResolvedSettings::default();
        settings.blur = on(0.0);
        settings.zoom = Some((ZoomDirection::In, 0.0));

        assert!(build_filter_plan(&settings, &timing(), None).is_empty());
    }

    #[test]
    fn test_sepia_full_strength_uses_sepia_matrix() {
        let filter = VideoFilter::Sepia { strength: 1.0 }.to_string();
        assert!(filter.starts_with("colorchannelmixer=rr=0.393:rg=0.769:rb=0.189"));
        assert!(filter.ends_with("br=0.272:bg=0.534:bb=0.131"));
    }

    #[test]
    fn test_volume_is_the_only_audio_filter() {
        let mut settings = ResolvedSettings::default();
        settings.volume = 200.0;

        let plan = build_filter_plan(&settings, &timing(), None);
        assert!(plan.video.is_empty());
        assert_eq!(plan.audio, vec![AudioFilter::Volume { multiplier: 2.0 }]);
        assert_eq!(plan.audio_graph().as_deref(), Some("volume=2"));
    }

    #[test]
    fn test_subtitle_serialization() {
        let directive = SubtitleDirective {
            text: SubtitleText::Inline("Hi: there".to_string()),
            position: SubtitlePosition::Top,
            background: Some(("black".to_string(), 0.5)),
            ..subtitle()
        };

        let serialized = VideoFilter::Subtitle(directive).to_string();
        assert!(serialized.starts_with("drawtext=text=Hi\\\\: there:"));
        assert!(serialized.contains(":y=h*0.08"));
        assert!(serialized.contains(":box=1:boxcolor=black@0.50"));
    }
}
