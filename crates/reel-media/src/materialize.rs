//! Writing request media to disk.
//!
//! Scene media arrives either inline as base64 (optionally wrapped in a
//! `data:` URL) or as a path to a local file. Inline payloads are decoded into
//! the run directory; local files are used in place and never registered for
//! deletion.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, warn};

use reel_models::MediaSource;

use crate::error::{MediaError, MediaResult};
use crate::temp::TempFileSet;

/// Decoded audio below this size is treated as a failed synthesis.
pub const DEFAULT_MIN_AUDIO_BYTES: u64 = 1024;

/// What a media payload is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    fn default_extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
            MediaKind::Image => "png",
        }
    }

    /// File extension for `mime`, or the kind's default when unknown.
    pub fn extension_for(self, mime: Option<&str>) -> &'static str {
        let mime = mime.map(|m| m.trim().to_ascii_lowercase());
        match mime.as_deref() {
            Some("video/mp4") => "mp4",
            Some("video/webm") => "webm",
            Some("video/quicktime") => "mov",
            Some("audio/mpeg") | Some("audio/mp3") => "mp3",
            Some("audio/wav") | Some("audio/x-wav") | Some("audio/wave") => "wav",
            Some("audio/ogg") => "ogg",
            Some("audio/aac") => "aac",
            Some("audio/mp4") | Some("audio/m4a") | Some("audio/x-m4a") => "m4a",
            Some("image/png") => "png",
            Some("image/jpeg") | Some("image/jpg") => "jpg",
            Some("image/webp") => "webp",
            _ => self.default_extension(),
        }
    }
}

/// Decoded inline payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Split a `data:<mime>;base64,<payload>` URL. Plain base64 passes through.
pub fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let trimmed = data.trim();
    if let Some(rest) = trimmed.strip_prefix("data:") {
        if let Some((mime, payload)) = rest.split_once(";base64,") {
            let mime = Some(mime).filter(|m| !m.is_empty());
            return (mime, payload);
        }
    }
    (None, trimmed)
}

/// Decode an inline payload. An explicit `mime_type` wins over the data URL's.
pub fn decode_payload(data: &str, mime_type: Option<&str>) -> MediaResult<DecodedPayload> {
    let (embedded_mime, payload) = split_data_url(data);
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(MediaError::Decode("payload is empty".to_string()));
    }

    Ok(DecodedPayload {
        bytes,
        mime_type: mime_type.or(embedded_mime).map(str::to_string),
    })
}

async fn existing_file(path: &Path) -> MediaResult<PathBuf> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
        Ok(_) => Err(MediaError::invalid_media(format!(
            "Not a regular file: {}",
            path.display()
        ))),
        Err(_) => Err(MediaError::FileNotFound(path.to_path_buf())),
    }
}

/// Write `bytes` to `<stem>.<ext>` in the run directory.
async fn write_payload(
    payload: &DecodedPayload,
    kind: MediaKind,
    temp: &mut TempFileSet,
    stem: &str,
) -> MediaResult<PathBuf> {
    let ext = kind.extension_for(payload.mime_type.as_deref());
    let path = temp.path(&format!("{}.{}", stem, ext));
    tokio::fs::write(&path, &payload.bytes).await?;
    debug!(path = %path.display(), bytes = payload.bytes.len(), "Materialized media");
    Ok(path)
}

/// Make `source` available as a local file.
pub async fn materialize(
    source: &MediaSource,
    kind: MediaKind,
    temp: &mut TempFileSet,
    stem: &str,
) -> MediaResult<PathBuf> {
    match source {
        MediaSource::Path { path } => existing_file(path).await,
        MediaSource::Base64 { data, mime_type } => {
            let payload = decode_payload(data, mime_type.as_deref())?;
            write_payload(&payload, kind, temp, stem).await
        }
    }
}

/// Replacement rule for suspiciously short narration audio.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortAudioPolicy {
    pub min_bytes: u64,
    pub fallback: Option<PathBuf>,
}

impl Default for ShortAudioPolicy {
    fn default() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_AUDIO_BYTES,
            fallback: None,
        }
    }
}

impl ShortAudioPolicy {
    pub fn is_short(&self, len: u64) -> bool {
        len < self.min_bytes
    }
}

/// Materialize narration audio, substituting the fallback asset for short payloads.
pub async fn materialize_audio(
    source: &MediaSource,
    policy: &ShortAudioPolicy,
    temp: &mut TempFileSet,
    stem: &str,
) -> MediaResult<PathBuf> {
    let MediaSource::Base64 { data, mime_type } = source else {
        return materialize(source, MediaKind::Audio, temp, stem).await;
    };

    let payload = decode_payload(data, mime_type.as_deref())?;
    let len = payload.bytes.len() as u64;

    if policy.is_short(len) {
        match &policy.fallback {
            Some(fallback) => match existing_file(fallback).await {
                Ok(path) => {
                    warn!(
                        bytes = len,
                        fallback = %path.display(),
                        "Audio payload too short, using fallback audio"
                    );
                    return Ok(path);
                }
                Err(e) => {
                    warn!(bytes = len, error = %e, "Fallback audio unavailable, using short audio");
                }
            },
            None => warn!(bytes = len, "Audio payload too short, using it as is"),
        }
    }

    write_payload(&payload, MediaKind::Audio, temp, stem).await
}
