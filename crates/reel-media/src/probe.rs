//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

use crate::command::{StderrTail, MAX_STDERR_BYTES};
use crate::error::{MediaError, MediaResult};

/// Media file information relevant to filter assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Width in pixels of the first video stream
    pub width: Option<u32>,
    /// Height in pixels of the first video stream
    pub height: Option<u32>,
    /// Frame rate (fps) of the first video stream
    pub fps: Option<f64>,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a media file, killing `ffprobe` once `timeout` elapses.
pub async fn probe_media(path: impl AsRef<Path>, timeout: Duration) -> MediaResult<MediaInfo> {
    probe_media_with("ffprobe", path, timeout).await
}

/// Probe with a different binary honoring the `ffprobe` argument contract.
pub async fn probe_media_with(
    program: &str,
    path: impl AsRef<Path>,
    timeout: Duration,
) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which(program).map_err(|_| MediaError::FfprobeNotFound)?;

    let child = Command::new(program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Dropping the pending future drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            let secs = timeout.as_secs().max(1);
            warn!(path = %path.display(), "FFprobe timed out after {} seconds, killing process", secs);
            return Err(MediaError::Timeout(secs));
        }
    };

    if !output.status.success() {
        let mut tail = StderrTail::new(MAX_STDERR_BYTES);
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tail.push(line);
        }
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: tail.into_string(),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse `ffprobe -print_format json` output.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let fps = video.and_then(|s| {
        s.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    Ok(MediaInfo {
        duration,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        fps,
        has_audio,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}
