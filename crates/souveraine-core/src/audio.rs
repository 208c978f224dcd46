//! Recorded audio payloads and the capture seam

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, ValidationError};

/// Recordings smaller than this are treated as silence
pub const MIN_AUDIO_BYTES: usize = 1000;

/// Recordings shorter than this are rejected when the duration is known
pub const MIN_VOICE_DURATION: Duration = Duration::from_secs(2);

/// A finished recording ready for upload
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    /// Known when the recorder reports it
    pub duration: Option<Duration>,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let file_name = format!("recording.{}", extension_for(&mime_type));
        Self {
            bytes,
            mime_type,
            file_name,
            duration: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Reject recordings too small or too short to transcribe
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.bytes.len() < MIN_AUDIO_BYTES {
            return Err(ValidationError::AudioTooShort);
        }
        match self.duration {
            Some(d) if d < MIN_VOICE_DURATION => Err(ValidationError::AudioTooShort),
            _ => Ok(()),
        }
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or_default().trim();
    match base {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/m4a" => "m4a",
        _ => "webm",
    }
}

/// Source of voice recordings (microphone, file, ...)
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Record one message and return the encoded payload
    async fn capture(&self) -> Result<AudioPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payload_rejected() {
        let payload = AudioPayload::new(vec![0; 999], "audio/webm");
        assert_eq!(payload.validate(), Err(ValidationError::AudioTooShort));
    }

    #[test]
    fn test_short_duration_rejected() {
        let payload =
            AudioPayload::new(vec![0; 4096], "audio/wav").with_duration(Duration::from_millis(1500));
        assert_eq!(payload.validate(), Err(ValidationError::AudioTooShort));
    }

    #[test]
    fn test_unknown_duration_accepted_on_size() {
        let payload = AudioPayload::new(vec![0; 1000], "audio/webm;codecs=opus");
        assert!(payload.validate().is_ok());
        assert_eq!(payload.file_name, "recording.webm");
    }

    #[test]
    fn test_file_name_from_mime() {
        assert_eq!(AudioPayload::new(vec![], "audio/wav").file_name, "recording.wav");
        assert_eq!(AudioPayload::new(vec![], "audio/ogg").file_name, "recording.ogg");
    }
}
