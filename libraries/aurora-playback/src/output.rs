//! Output device contract
//!
//! A device pulls samples from whatever [`OutputSource`] it was given and
//! reports when it stops. Concrete backends (cpal shared/exclusive, test
//! doubles) differ only in how they are constructed.
//!
//! The track player makes every call from its device-control thread, so
//! implementations never see two calls at once.

use crate::error::Result;
use aurora_audio::OutputSource;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Stopped,
    Playing,
    Paused,
}

/// Why a device stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// The source ran out of samples
    EndOfStream,
    /// The backend failed; the device is no longer producing audio
    Failed(String),
}

/// Invoked once per stop, after the device has stopped pulling samples
pub type StoppedHandler = Arc<dyn Fn(StopReason) + Send + Sync>;

pub trait OutputDevice: Send {
    /// Human-readable device name for logs
    fn name(&self) -> &str;

    fn set_stopped_handler(&mut self, handler: StoppedHandler);

    /// Pull from `source` from now on; does not start playback
    fn assign_source(&mut self, source: Arc<dyn OutputSource>) -> Result<()>;

    /// Release the assigned source; the device must be stopped
    fn clear_source(&mut self) -> Result<()>;

    /// Start or resume pulling
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Stop pulling; the stopped handler fires once the device is idle
    ///
    /// Does nothing on a device that is already stopped.
    fn stop(&mut self) -> Result<()>;

    fn state(&self) -> DeviceState;
}
