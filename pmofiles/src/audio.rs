//! Audio classification by file extension.

use std::path::Path;

/// Audio formats the server recognises and streams with a dedicated MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
}

impl AudioFormat {
    /// Case-insensitive lookup on the extension (`"mp3"`, `"FLAC"`, ...).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Flac => "audio/flac",
        }
    }
}

/// Content type used by the streaming endpoint.
pub fn stream_content_type(name: &str) -> &'static str {
    AudioFormat::from_name(name)
        .map(AudioFormat::mime_type)
        .unwrap_or("application/octet-stream")
}
