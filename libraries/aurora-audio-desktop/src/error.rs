//! Output device errors

use aurora_playback::PlaybackError;
use thiserror::Error;

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// No device with the requested name (or no default device)
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Audio backend '{0}' is not available on this system")]
    BackendUnavailable(&'static str),

    #[error("Failed to enumerate devices: {0}")]
    Enumeration(String),

    /// No stream configuration fits the source
    #[error("Unsupported stream configuration: {0}")]
    Config(String),

    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("Failed to play stream: {0}")]
    Play(String),

    #[error("Failed to pause stream: {0}")]
    Pause(String),

    /// The audio thread is gone
    #[error("Audio thread not responding")]
    CommandChannel,
}

impl From<cpal::BuildStreamError> for DeviceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        DeviceError::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DeviceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        DeviceError::Play(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for DeviceError {
    fn from(err: cpal::PauseStreamError) -> Self {
        DeviceError::Pause(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for DeviceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        DeviceError::Config(err.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for DeviceError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        DeviceError::Config(err.to_string())
    }
}

impl From<cpal::DevicesError> for DeviceError {
    fn from(err: cpal::DevicesError) -> Self {
        DeviceError::Enumeration(err.to_string())
    }
}

impl From<DeviceError> for PlaybackError {
    fn from(err: DeviceError) -> Self {
        PlaybackError::Device(err.to_string())
    }
}
