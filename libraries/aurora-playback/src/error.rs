//! Error types for playback

use aurora_audio::AudioError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// `play`/`seek` called before any track was loaded
    #[error("No source loaded")]
    NoSourceLoaded,

    /// The player was disposed and can no longer be used
    #[error("Player has been disposed")]
    Disposed,

    /// The device-control thread is gone
    #[error("Device control context closed")]
    ContextClosed,

    #[error("Output device error: {0}")]
    Device(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
