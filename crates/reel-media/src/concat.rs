//! Joining clips and audio segments with the concat demuxer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use reel_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::temp::TempFileSet;
use crate::transcoder::Transcoder;

/// Timeout for a single combination operation.
pub const DEFAULT_COMBINE_TIMEOUT: Duration = Duration::from_secs(180);

/// Audio codec of combined narration.
pub const COMBINED_AUDIO_CODEC: &str = "libmp3lame";
/// Audio bitrate of combined narration.
pub const COMBINED_AUDIO_BITRATE: &str = "192k";

/// Render an `ffconcat` manifest listing `paths` in order.
pub fn concat_manifest(paths: &[PathBuf]) -> String {
    let mut manifest = String::from("ffconcat version 1.0\n");
    for path in paths {
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{}'\n", escaped));
    }
    manifest
}

async fn write_manifest(
    paths: &[PathBuf],
    temp: &mut TempFileSet,
    name: &str,
) -> MediaResult<PathBuf> {
    let manifest_path = temp.path(name);
    tokio::fs::write(&manifest_path, concat_manifest(paths)).await?;
    Ok(manifest_path)
}

fn concat_input(manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(manifest, output).input_args(["-f", "concat", "-safe", "0"])
}

/// Join scene clips into the final video.
///
/// A single clip is stream-copied; several clips are re-encoded through a
/// manifest. The output lives in `temp`.
pub async fn concatenate_scenes(
    transcoder: &dyn Transcoder,
    clips: &[PathBuf],
    temp: &mut TempFileSet,
    encoding: &EncodingConfig,
    timeout: Duration,
) -> MediaResult<PathBuf> {
    let output = match clips {
        [] => return Err(MediaError::invalid_media("No clips to concatenate")),
        [single] => {
            let output = temp.path("final.mp4");
            debug!(clip = %single.display(), "Single clip, copying streams");
            let cmd = FfmpegCommand::new(single, &output).codec_copy();
            transcoder.run(&cmd, timeout).await?;
            output
        }
        _ => {
            let manifest = write_manifest(clips, temp, "concat.txt").await?;
            let output = temp.path("final.mp4");
            let cmd = concat_input(&manifest, &output).encoding(encoding);
            transcoder.run(&cmd, timeout).await?;
            output
        }
    };

    info!(clips = clips.len(), output = %output.display(), "Concatenated scenes");
    Ok(output)
}

/// Join audio segments into one MP3.
pub async fn concatenate_audio(
    transcoder: &dyn Transcoder,
    segments: &[PathBuf],
    temp: &mut TempFileSet,
    timeout: Duration,
) -> MediaResult<PathBuf> {
    if segments.is_empty() {
        return Err(MediaError::invalid_media("No audio segments to combine"));
    }

    let manifest = write_manifest(segments, temp, "segments.txt").await?;
    let output = temp.path("combined.mp3");
    let cmd = concat_input(&manifest, &output)
        .output_arg("-vn")
        .audio_codec(COMBINED_AUDIO_CODEC)
        .audio_bitrate(COMBINED_AUDIO_BITRATE);
    transcoder.run(&cmd, timeout).await?;

    info!(segments = segments.len(), output = %output.display(), "Combined audio segments");
    Ok(output)
}
