//! Error types for playback coordination

use thiserror::Error;

/// Failure reported by an audio output device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The source could not be opened or decoded
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The device refused a command
    #[error("Device command rejected: {0}")]
    CommandRejected(String),

    /// The output device is gone
    #[error("Device disconnected")]
    Disconnected,
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The current episode cannot be played by the device
    #[error("Episode unavailable ({url}): {reason}")]
    EpisodeUnavailable { url: String, reason: String },

    /// Device error outside of loading
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// The session loop has stopped
    #[error("Playback session is closed")]
    SessionClosed,

    /// Session thread could not be started
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
