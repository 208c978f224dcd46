//! Voice capture from a recorded audio file

use async_trait::async_trait;
use souveraine_core::{AudioCapture, AudioPayload, ValidationError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reads a recording made by another program (`.webm`, `.ogg`, `.wav`, `.mp3`)
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioCapture for FileCapture {
    async fn capture(&self) -> souveraine_core::Result<AudioPayload> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            ValidationError::AudioCapture(format!("{}: {}", self.path.display(), e))
        })?;
        let mime_type = audio_mime_type(&self.path).ok_or_else(|| {
            ValidationError::AudioCapture(format!(
                "format non pris en charge: {}",
                self.path.display()
            ))
        })?;

        let duration = if mime_type == "audio/wav" {
            wav_duration(&bytes)
        } else {
            None
        };

        let mut payload = AudioPayload::new(bytes, mime_type);
        if let Some(name) = self.path.file_name().and_then(|n| n.to_str()) {
            payload = payload.with_file_name(name);
        }
        if let Some(duration) = duration {
            payload = payload.with_duration(duration);
        }
        tracing::debug!(
            file = %payload.file_name,
            bytes = payload.bytes.len(),
            ?duration,
            "captured audio from file"
        );
        Ok(payload)
    }
}

/// MIME type of an audio file, from its extension
pub fn audio_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    Some(match ext.as_str() {
        "webm" => "audio/webm",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        _ => return None,
    })
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Duration of a PCM WAV file from its `fmt ` byte rate and `data` size
pub fn wav_duration(bytes: &[u8]) -> Option<Duration> {
    if bytes.get(0..4)? != b"RIFF" || bytes.get(8..12)? != b"WAVE" {
        return None;
    }

    let mut byte_rate = None;
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = le_u32(bytes, offset + 4)? as usize;
        let body = offset + 8;
        match id {
            b"fmt " => byte_rate = le_u32(bytes, body + 8),
            b"data" => {
                let rate = byte_rate.filter(|r| *r > 0)?;
                // Streams still being written report a bogus size
                let size = size.min(bytes.len() - body);
                return Some(Duration::from_secs_f64(size as f64 / rate as f64));
            }
            _ => {}
        }
        // Chunks are word aligned
        offset = body.checked_add(size)?.checked_add(size % 2)?;
    }
    None
}
