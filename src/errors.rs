//! Operator-facing error taxonomy.
//!
//! None of these are fatal: each is logged and handed to the
//! [`Renderer`](crate::view::Renderer) as a warning, and the controller keeps
//! running on its last known good state.

use std::path::PathBuf;

use thiserror::Error;

use crate::audio_engine::{PlaybackError, SampleLoadError};

#[derive(Debug, Error)]
pub enum SoundboardError {
    /// The config document is not valid JSON for the expected shape.
    #[error("config file {} is malformed: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file could not be read or written.
    #[error("config file {} could not be accessed: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pad has no file, or its file is gone.
    #[error("audio file not found: {}", .path.as_deref().unwrap_or("<none assigned>"))]
    MissingAsset { path: Option<String> },

    /// The output device refused the stream.
    #[error("cannot open output device {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    /// The asset could not be decoded.
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: SampleLoadError,
    },

    /// External edits will not be detected.
    #[error("cannot watch {} for changes: {reason}", .path.display())]
    WatcherSetup { path: PathBuf, reason: String },
}

impl From<PlaybackError> for SoundboardError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::MissingAsset { path } => SoundboardError::MissingAsset { path },
            PlaybackError::DeviceOpen { device, reason } => {
                SoundboardError::DeviceOpen { device, reason }
            }
            PlaybackError::Decode { path, source } => SoundboardError::Decode { path, source },
            PlaybackError::Spawn(source) => SoundboardError::DeviceOpen {
                device: "stream thread".to_string(),
                reason: source.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_asset_message() {
        let unassigned = SoundboardError::MissingAsset { path: None };
        assert_eq!(unassigned.to_string(), "audio file not found: <none assigned>");

        let missing = SoundboardError::from(PlaybackError::MissingAsset {
            path: Some("C:/Sounds/boo.mp3".to_string()),
        });
        assert_eq!(missing.to_string(), "audio file not found: C:/Sounds/boo.mp3");
    }

    #[test]
    fn test_device_open_conversion() {
        let err = SoundboardError::from(PlaybackError::DeviceOpen {
            device: "VoiceMeeter Input".to_string(),
            reason: "busy".to_string(),
        });
        assert!(matches!(err, SoundboardError::DeviceOpen { .. }));
        assert!(err.to_string().contains("VoiceMeeter Input"));
    }
}
