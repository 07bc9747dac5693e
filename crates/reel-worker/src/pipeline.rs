//! Composition and audio combination pipelines.
//!
//! A composition run materializes each scene, renders it (falling back to the
//! source clip on failure), concatenates the clips and reads the final video
//! into memory. Scenes are processed sequentially in request order. Every
//! intermediate file lives in the run's [`TempFileSet`], which is released
//! before the run returns whatever the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use reel_media::materialize::{materialize, materialize_audio, MediaKind};
use reel_media::render::{RenderStatus, SceneRenderer};
use reel_media::{
    combine_audio_image, concatenate_audio, concatenate_scenes, FontResolver, MediaResult,
    TempFileSet, Transcoder,
};
use reel_models::encoding::{AUDIO_MIME_TYPE, VIDEO_MIME_TYPE};
use reel_models::{AudioCombinationRequest, CompositionRequest, Scene, SceneSource};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, OP_COMBINE_AUDIO, OP_COMPOSE};
use crate::metrics;

/// Final video of a composition run.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoArtifact {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub scene_count: usize,
    /// Scenes whose render failed and that use their source clip.
    pub fallback_scenes: Vec<usize>,
}

/// Combined narration of an audio combination run.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub segment_count: usize,
}

/// Stateless pipeline runner shared by all jobs.
#[derive(Clone)]
pub struct CompositionPipeline {
    transcoder: Arc<dyn Transcoder>,
    fonts: Arc<FontResolver>,
    config: Arc<WorkerConfig>,
}

impl CompositionPipeline {
    pub fn new(config: WorkerConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            transcoder,
            fonts: Arc::new(FontResolver::default()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Compose the requested scenes into one MP4.
    pub async fn compose(&self, request: &CompositionRequest) -> WorkerResult<VideoArtifact> {
        let logger = JobLogger::new(&request.job_id, OP_COMPOSE);
        let span = logger.create_span();
        self.compose_logged(request, &logger).instrument(span).await
    }

    async fn compose_logged(
        &self,
        request: &CompositionRequest,
        logger: &JobLogger,
    ) -> WorkerResult<VideoArtifact> {
        logger.log_start(&format!("{} scenes", request.scenes.len()));
        let started = Instant::now();

        let mut temp = TempFileSet::create_in(self.config.video_dir()).await?;
        let result = self.run_composition(request, &mut temp, logger).await;
        temp.release().await;

        match &result {
            Ok(artifact) => logger.log_completion(&format!(
                "{} bytes, {} fallback scenes in {:.2}s",
                artifact.data.len(),
                artifact.fallback_scenes.len(),
                started.elapsed().as_secs_f64()
            )),
            Err(e) => logger.log_error(&e.to_string()),
        }
        result
    }

    async fn run_composition(
        &self,
        request: &CompositionRequest,
        temp: &mut TempFileSet,
        logger: &JobLogger,
    ) -> WorkerResult<VideoArtifact> {
        let options = self.config.render_options();
        let renderer = SceneRenderer::new(self.transcoder.as_ref(), &self.fonts, &options);

        let mut clips = Vec::with_capacity(request.scenes.len());
        let mut fallback_scenes = Vec::new();

        for (index, scene) in request.scenes.iter().enumerate() {
            let source = self
                .scene_source(index, scene, temp)
                .await
                .map_err(|e| WorkerError::materialize(index, e))?;

            let rendered = renderer.render(index, scene, &source, temp).await;
            match rendered.status {
                RenderStatus::Processed => metrics::record_scene("processed"),
                RenderStatus::Unchanged => metrics::record_scene("unchanged"),
                RenderStatus::Fallback => {
                    metrics::record_scene("fallback");
                    metrics::record_scene_fallback();
                    logger.log_scene_warning(index, "render failed, using source clip");
                    fallback_scenes.push(index);
                }
            }
            clips.push(rendered.path);
        }

        logger.log_progress(&format!("concatenating {} clips", clips.len()));
        let output = concatenate_scenes(
            self.transcoder.as_ref(),
            &clips,
            temp,
            &self.config.encoding,
            self.config.combine_timeout,
        )
        .await
        .map_err(WorkerError::Concatenation)?;

        let data = tokio::fs::read(&output).await?;

        Ok(VideoArtifact {
            data,
            mime_type: VIDEO_MIME_TYPE,
            scene_count: request.scenes.len(),
            fallback_scenes,
        })
    }

    /// Local clip for a scene: the decoded video, or audio over a still image.
    async fn scene_source(
        &self,
        index: usize,
        scene: &Scene,
        temp: &mut TempFileSet,
    ) -> MediaResult<PathBuf> {
        match &scene.source {
            SceneSource::Clip { video } => {
                materialize(video, MediaKind::Video, temp, &format!("scene_{}_source", index)).await
            }
            SceneSource::AudioImage { audio, image } => {
                let audio = materialize_audio(
                    audio,
                    &self.config.short_audio_policy(),
                    temp,
                    &format!("scene_{}_audio", index),
                )
                .await?;
                let image =
                    materialize(image, MediaKind::Image, temp, &format!("scene_{}_image", index))
                        .await?;
                combine_audio_image(
                    self.transcoder.as_ref(),
                    index,
                    &audio,
                    &image,
                    temp,
                    &self.config.encoding,
                    self.config.combine_timeout,
                )
                .await
            }
        }
    }

    /// Join narration segments into one MP3.
    pub async fn combine_audio(
        &self,
        request: &AudioCombinationRequest,
    ) -> WorkerResult<AudioArtifact> {
        let logger = JobLogger::new(&request.job_id, OP_COMBINE_AUDIO);
        let span = logger.create_span();
        self.combine_audio_logged(request, &logger)
            .instrument(span)
            .await
    }

    async fn combine_audio_logged(
        &self,
        request: &AudioCombinationRequest,
        logger: &JobLogger,
    ) -> WorkerResult<AudioArtifact> {
        logger.log_start(&format!("{} segments", request.segments.len()));

        let mut temp = TempFileSet::create_in(self.config.audio_dir()).await?;
        let result = self.run_audio_combination(request, &mut temp).await;
        temp.release().await;

        match &result {
            Ok(artifact) => logger.log_completion(&format!("{} bytes", artifact.data.len())),
            Err(e) => logger.log_error(&e.to_string()),
        }
        result
    }

    async fn run_audio_combination(
        &self,
        request: &AudioCombinationRequest,
        temp: &mut TempFileSet,
    ) -> WorkerResult<AudioArtifact> {
        let mut segments = Vec::with_capacity(request.segments.len());
        for (index, segment) in request.segments.iter().enumerate() {
            let path = materialize(segment, MediaKind::Audio, temp, &format!("segment_{}", index))
                .await
                .map_err(|e| WorkerError::materialize(index, e))?;
            segments.push(path);
        }

        let output = concatenate_audio(
            self.transcoder.as_ref(),
            &segments,
            temp,
            self.config.combine_timeout,
        )
        .await
        .map_err(WorkerError::Concatenation)?;

        let data = tokio::fs::read(&output).await?;

        Ok(AudioArtifact {
            data,
            mime_type: AUDIO_MIME_TYPE,
            segment_count: segments.len(),
        })
    }
}
