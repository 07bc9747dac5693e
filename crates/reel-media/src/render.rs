//! Per-scene rendering.
//!
//! Each scene gets at most one transcoder invocation that applies its filter
//! plan. A scene whose plan is empty is passed through untouched. A failed
//! render never fails the run: the scene falls back to its source clip.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use reel_models::{EncodingConfig, Scene};

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::filters::{build_filter_plan, SceneTiming};
use crate::subtitle::{prepare_subtitle, FontResolver, DEFAULT_MAX_LINE_CHARS};
use crate::temp::TempFileSet;
use crate::transcoder::Transcoder;

/// Per-scene render timeout.
pub const DEFAULT_SCENE_TIMEOUT: Duration = Duration::from_secs(60);

/// How a scene ended up in the final video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Filters were applied.
    Processed,
    /// Nothing to apply; the source is used as is.
    Unchanged,
    /// Rendering failed; the source is used instead.
    Fallback,
}

/// Clip to concatenate for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedScene {
    pub index: usize,
    pub path: PathBuf,
    pub status: RenderStatus,
}

impl RenderedScene {
    pub fn processed(&self) -> bool {
        self.status == RenderStatus::Processed
    }

    pub fn is_fallback(&self) -> bool {
        self.status == RenderStatus::Fallback
    }
}

/// Knobs for scene rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub encoding: EncodingConfig,
    pub timeout: Duration,
    pub max_line_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            timeout: DEFAULT_SCENE_TIMEOUT,
            max_line_chars: DEFAULT_MAX_LINE_CHARS,
        }
    }
}

/// Applies scene settings and subtitles to scene clips.
pub struct SceneRenderer<'a> {
    transcoder: &'a dyn Transcoder,
    fonts: &'a FontResolver,
    options: &'a RenderOptions,
}

impl<'a> SceneRenderer<'a> {
    pub fn new(
        transcoder: &'a dyn Transcoder,
        fonts: &'a FontResolver,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            transcoder,
            fonts,
            options,
        }
    }

    /// Render scene `index` from `source`.
    ///
    /// Outputs and subtitle text files are registered in `temp`. The subtitle
    /// file is deleted as soon as the invocation finishes.
    pub async fn render(
        &self,
        index: usize,
        scene: &Scene,
        source: &Path,
        temp: &mut TempFileSet,
    ) -> RenderedScene {
        let mut text_file = None;
        let result = self
            .try_render(index, scene, source, temp, &mut text_file)
            .await;

        if let Some(path) = text_file {
            temp.remove(&path).await;
        }

        match result {
            Ok(Some(path)) => {
                info!(scene_index = index, path = %path.display(), "Scene rendered");
                RenderedScene {
                    index,
                    path,
                    status: RenderStatus::Processed,
                }
            }
            Ok(None) => {
                debug!(scene_index = index, "No filters to apply, using source clip");
                RenderedScene {
                    index,
                    path: source.to_path_buf(),
                    status: RenderStatus::Unchanged,
                }
            }
            Err(e) => {
                warn!(
                    scene_index = index,
                    error = %e,
                    stderr = e.stderr().unwrap_or_default(),
                    "Scene render failed, falling back to source clip"
                );
                RenderedScene {
                    index,
                    path: source.to_path_buf(),
                    status: RenderStatus::Fallback,
                }
            }
        }
    }

    async fn try_render(
        &self,
        index: usize,
        scene: &Scene,
        source: &Path,
        temp: &mut TempFileSet,
        text_file: &mut Option<PathBuf>,
    ) -> MediaResult<Option<PathBuf>> {
        let settings = scene.settings.resolve();

        let probed = if scene.duration_secs.is_none() || settings.zoom.is_some() {
            match self.transcoder.probe(source, self.options.timeout).await {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(scene_index = index, error = %e, "Probe failed, rendering without media info");
                    None
                }
            }
        } else {
            None
        };

        let timing = SceneTiming {
            duration: scene
                .duration_secs
                .filter(|d| d.is_finite() && *d > 0.0)
                .or_else(|| probed.as_ref().and_then(|info| info.duration)),
            width: probed.as_ref().and_then(|info| info.width),
            height: probed.as_ref().and_then(|info| info.height),
            fps: probed.as_ref().and_then(|info| info.fps),
        };

        let subtitle = match scene.active_subtitle() {
            Some(spec) => {
                let prepared = prepare_subtitle(
                    spec,
                    self.options.max_line_chars,
                    self.fonts,
                    temp,
                    &format!("scene_{}_subtitle", index),
                )
                .await?;
                *text_file = prepared.text_file;
                Some(prepared.directive)
            }
            None => None,
        };

        let mut plan = build_filter_plan(&settings, &timing, subtitle);
        if probed.as_ref().is_some_and(|info| !info.has_audio) {
            plan.audio.clear();
        }
        if plan.is_empty() {
            return Ok(None);
        }

        debug!(
            scene_index = index,
            filters = ?plan.video_names(),
            audio_filters = plan.audio.len(),
            "Rendering scene"
        );

        let output = temp.path(&format!("scene_{}_rendered.mp4", index));
        let mut cmd = FfmpegCommand::new(source, &output);
        if let Some(graph) = plan.video_graph() {
            cmd = cmd.video_filter(graph);
        }
        if let Some(graph) = plan.audio_graph() {
            cmd = cmd.audio_filter(graph);
        }
        let cmd = cmd.encoding(&self.options.encoding);

        if let Err(e) = self.transcoder.run(&cmd, self.options.timeout).await {
            temp.remove(&output).await;
            return Err(e);
        }

        Ok(Some(output))
    }
}
