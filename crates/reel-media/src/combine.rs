//! Turning narration audio plus a still image into a scene clip.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use reel_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::temp::TempFileSet;
use crate::transcoder::Transcoder;

/// Forces even frame dimensions, required by yuv420p.
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Build the still-image command: the image loops for as long as the audio plays.
pub fn still_image_command(
    image: &Path,
    audio: &Path,
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(image, output)
        .input_args(["-loop", "1"])
        .add_input(audio)
        .video_filter(EVEN_DIMENSIONS_FILTER)
        .encoding(encoding)
        .output_args(["-tune", "stillimage", "-shortest"])
}

/// Combine `audio` and `image` into `scene_{index}_combined.mp4`.
pub async fn combine_audio_image(
    transcoder: &dyn Transcoder,
    index: usize,
    audio: &Path,
    image: &Path,
    temp: &mut TempFileSet,
    encoding: &EncodingConfig,
    timeout: Duration,
) -> MediaResult<PathBuf> {
    let output = temp.path(&format!("scene_{}_combined.mp4", index));
    let cmd = still_image_command(image, audio, &output, encoding);

    debug!(scene_index = index, output = %output.display(), "Combining audio with still image");
    transcoder.run(&cmd, timeout).await?;

    Ok(output)
}
