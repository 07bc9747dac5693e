//! End-to-end composition runs against a recording transcoder.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine};

use common::{inline_clip, leftover_files, shared, test_config, FakeTranscoder, FINAL_VIDEO};
use reel_models::{
    AudioCombinationRequest, AudioCombinationResult, CompositionRequest, CompositionResult,
    EffectToggle, MediaSource, Scene, SceneSource, SubtitleSpec,
};
use reel_worker::CompositionService;

#[tokio::test]
async fn test_two_scene_composition() {
    let (dir, config) = test_config(3);
    let video_dir = config.video_dir();
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let mut first = inline_clip("one");
    first.settings.brightness = Some(150.0);
    let mut second = inline_clip("two");
    second.settings.effects.zoom_in = EffectToggle::on(60.0);
    second.subtitle = Some(SubtitleSpec::new("Hello world"));

    let request = CompositionRequest::new(vec![first, second]);
    let job_id = request.job_id.clone();
    let result = service.submit_composition_job(request).await;

    match result {
        CompositionResult::Success {
            job_id: returned_id,
            video_base64,
            mime_type,
            scene_count,
            fallback_scenes,
        } => {
            assert_eq!(returned_id, job_id);
            assert_eq!(STANDARD.decode(video_base64).unwrap(), FINAL_VIDEO);
            assert_eq!(mime_type, "video/mp4");
            assert_eq!(scene_count, 2);
            assert!(fallback_scenes.is_empty());
        }
        other => panic!("expected success, got {:?}", other),
    }

    let calls = fake.calls();
    assert_eq!(calls.len(), 3);

    assert_eq!(calls[0].output_name(), "scene_0_rendered.mp4");
    assert_eq!(calls[0].output_value("-vf"), Some("eq=brightness=0.5"));

    assert_eq!(calls[1].output_name(), "scene_1_rendered.mp4");
    let graph = calls[1].output_value("-vf").unwrap();
    let zoom = graph.find("zoompan=").unwrap();
    let subtitle = graph.find("drawtext=").unwrap();
    assert!(zoom < subtitle);
    assert!(graph.contains("text=Hello world"));

    let concat = &calls[2];
    assert!(concat.is_concat());
    let manifest = concat.manifest.as_deref().unwrap();
    let entries: Vec<&str> = manifest.lines().filter(|l| l.starts_with("file ")).collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].contains("scene_0_rendered.mp4"));
    assert!(entries[1].contains("scene_1_rendered.mp4"));
    assert_eq!(concat.output_value("-c:v"), Some("libx264"));

    assert_eq!(leftover_files(&video_dir), 0);
    assert_eq!(service.queue().active(), 0);
    drop(dir);
}

#[tokio::test]
async fn test_color_fade_and_subtitle_scene_with_default_scene() {
    let (_dir, config) = test_config(3);
    let video_dir = config.video_dir();
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let mut styled = inline_clip("styled");
    styled.settings.brightness = Some(120.0);
    styled.settings.contrast = Some(100.0);
    styled.settings.saturation = Some(100.0);
    styled.settings.effects.fade_in = EffectToggle::on(50.0);
    styled.subtitle = Some(SubtitleSpec::new("Hello"));

    let request = CompositionRequest::new(vec![styled, inline_clip("plain")]);
    match service.submit_composition_job(request).await {
        CompositionResult::Success {
            scene_count,
            fallback_scenes,
            ..
        } => {
            assert_eq!(scene_count, 2);
            assert!(fallback_scenes.is_empty());
        }
        other => panic!("expected success, got {:?}", other),
    }

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].output_name(), "scene_0_rendered.mp4");
    let graph = calls[0].output_value("-vf").unwrap();
    assert!(
        graph.starts_with("eq=brightness=0.2,fade=t=in:st=0:d=1.1,drawtext="),
        "{}",
        graph
    );
    assert!(graph.contains("text=Hello"));
    assert!(!graph.contains("fade=t=out"));

    let manifest = calls[1].manifest.as_deref().unwrap();
    let entries: Vec<&str> = manifest.lines().filter(|l| l.starts_with("file ")).collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].contains("scene_0_rendered.mp4"));
    assert!(entries[1].contains("scene_1_source.mp4"));

    assert_eq!(leftover_files(&video_dir), 0);
}

#[tokio::test]
async fn test_single_unchanged_scene_is_stream_copied() {
    let (_dir, config) = test_config(1);
    let video_dir = config.video_dir();
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let result = service
        .submit_composition_job(CompositionRequest::new(vec![inline_clip("only")]))
        .await;
    assert!(result.is_success());

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].output_value("-c"), Some("copy"));
    assert!(calls[0].inputs[0].ends_with("scene_0_source.mp4"));
    assert!(!calls[0].is_concat());

    assert_eq!(leftover_files(&video_dir), 0);
}

#[tokio::test]
async fn test_failed_render_falls_back_to_source_clip() {
    let (_dir, config) = test_config(1);
    let video_dir = config.video_dir();
    let fake = shared(FakeTranscoder::new().failing_when(|cmd| {
        cmd.output().ends_with("scene_1_rendered.mp4")
    }));
    let service = CompositionService::with_transcoder(config, fake.clone());

    let scenes = (0..3)
        .map(|i| {
            let mut scene = inline_clip(&i.to_string());
            scene.settings.effects.black_and_white = EffectToggle::on(100.0);
            scene
        })
        .collect();
    let result = service
        .submit_composition_job(CompositionRequest::new(scenes))
        .await;

    match result {
        CompositionResult::Success {
            fallback_scenes,
            scene_count,
            ..
        } => {
            assert_eq!(scene_count, 3);
            assert_eq!(fallback_scenes, vec![1]);
        }
        other => panic!("expected success, got {:?}", other),
    }

    let calls = fake.calls();
    let manifest = calls.last().unwrap().manifest.clone().unwrap();
    let entries: Vec<&str> = manifest.lines().filter(|l| l.starts_with("file ")).collect();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].contains("scene_0_rendered.mp4"));
    assert!(entries[1].contains("scene_1_source.mp4"));
    assert!(entries[2].contains("scene_2_rendered.mp4"));

    assert_eq!(leftover_files(&video_dir), 0);
}

#[tokio::test]
async fn test_concat_failure_reports_failure_and_cleans_up() {
    let (_dir, config) = test_config(1);
    let video_dir = config.video_dir();
    let fake = shared(
        FakeTranscoder::new().failing_when(|cmd| cmd.output().ends_with("final.mp4")),
    );
    let service = CompositionService::with_transcoder(config, fake.clone());

    let mut first = inline_clip("a");
    first.subtitle = Some(SubtitleSpec::new("línea con acentos"));
    let request = CompositionRequest::new(vec![first, inline_clip("b")]);
    let result = service.submit_composition_job(request).await;

    match result {
        CompositionResult::Failure { message, .. } => {
            assert!(message.contains("Concatenation failed"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    assert_eq!(leftover_files(&video_dir), 0);
    assert_eq!(service.queue().active(), 0);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_admission() {
    let (_dir, config) = test_config(1);
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let result = service
        .submit_composition_job(CompositionRequest::new(Vec::new()))
        .await;
    assert!(matches!(result, CompositionResult::Failure { .. }));

    let mut scene = inline_clip("x");
    scene.settings.brightness = Some(250.0);
    let result = service
        .submit_composition_job(CompositionRequest::new(vec![scene]))
        .await;
    match result {
        CompositionResult::Failure { message, .. } => assert!(message.contains("brightness")),
        other => panic!("expected failure, got {:?}", other),
    }

    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_local_clip_fails_the_job() {
    let (_dir, config) = test_config(1);
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let scene = Scene::from_clip(MediaSource::path("/no/such/clip.mp4"));
    let result = service
        .submit_composition_job(CompositionRequest::new(vec![scene]))
        .await;

    match result {
        CompositionResult::Failure { message, .. } => {
            assert!(message.contains("scene 0"), "{}", message)
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_audio_image_scene_is_combined_first() {
    let (_dir, config) = test_config(1);
    let video_dir = config.video_dir();
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let scene = Scene {
        source: SceneSource::AudioImage {
            audio: MediaSource::Base64 {
                data: STANDARD.encode(vec![7u8; 4096]),
                mime_type: Some("audio/mpeg".to_string()),
            },
            image: MediaSource::Base64 {
                data: STANDARD.encode(b"png bytes"),
                mime_type: Some("image/png".to_string()),
            },
        },
        ..inline_clip("unused")
    };
    let result = service
        .submit_composition_job(CompositionRequest::new(vec![scene]))
        .await;
    assert!(result.is_success());

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].output_name(), "scene_0_combined.mp4");
    assert_eq!(calls[0].input_args[0], vec!["-loop", "1"]);
    assert!(calls[0].inputs[0].ends_with("scene_0_image.png"));
    assert!(calls[0].inputs[1].ends_with("scene_0_audio.mp3"));
    assert_eq!(calls[1].output_value("-c"), Some("copy"));

    assert_eq!(leftover_files(&video_dir), 0);
}

#[tokio::test]
async fn test_audio_combination_job() {
    let (_dir, config) = test_config(1);
    let audio_dir = config.audio_dir();
    let fake = shared(FakeTranscoder::new());
    let service = CompositionService::with_transcoder(config, fake.clone());

    let request = AudioCombinationRequest::new(vec![
        MediaSource::base64(STANDARD.encode(b"segment one")),
        MediaSource::base64(STANDARD.encode(b"segment two")),
    ]);
    let result = service.submit_audio_combination_job(request).await;

    match result {
        AudioCombinationResult::Success {
            audio_base64,
            mime_type,
            segment_count,
            ..
        } => {
            assert_eq!(STANDARD.decode(audio_base64).unwrap(), common::FINAL_AUDIO);
            assert_eq!(mime_type, "audio/mpeg");
            assert_eq!(segment_count, 2);
        }
        other => panic!("expected success, got {:?}", other),
    }

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].output_value("-c:a"), Some("libmp3lame"));
    assert_eq!(
        calls[0]
            .manifest
            .as_deref()
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("file "))
            .count(),
        2
    );
    assert_eq!(leftover_files(&audio_dir), 0);
}
