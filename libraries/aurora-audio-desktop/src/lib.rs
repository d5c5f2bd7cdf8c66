//! Aurora Audio Desktop
//!
//! cpal-backed [`OutputDevice`](aurora_playback::OutputDevice) for desktop
//! platforms: device enumeration, backend selection (ASIO and JACK behind
//! features), stream format negotiation and a stream owned by its own audio
//! thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use aurora_audio::SymphoniaDecoder;
//! use aurora_audio_desktop::{CpalOutputDevice, DeviceConfig};
//! use aurora_playback::{SharedOptions, TrackPlayer};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = CpalOutputDevice::open(DeviceConfig::default())?;
//! let decoder = SymphoniaDecoder::with_sample_rate(device.sample_rate());
//! let player = TrackPlayer::new(Box::new(device), Arc::new(decoder), SharedOptions::default())?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod output;
mod render;

pub use backend::{list_available_backends, AudioBackend};
pub use config::{DeviceConfig, LatencyInfo, ShareMode};
pub use device::{find_device, list_devices, DeviceInfo};
pub use error::{DeviceError, Result};
pub use output::CpalOutputDevice;
