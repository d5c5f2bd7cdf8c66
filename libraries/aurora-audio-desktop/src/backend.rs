//! Audio backend (cpal host) selection

use crate::error::{DeviceError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    /// System default (WASAPI on Windows, CoreAudio on macOS, ALSA on Linux)
    #[default]
    Default,

    /// ASIO (Windows only), always exclusive
    #[cfg(all(target_os = "windows", feature = "asio"))]
    Asio,

    #[cfg(feature = "jack")]
    Jack,
}

impl AudioBackend {
    /// Every backend compiled into this build, default first
    pub const ALL: &'static [AudioBackend] = &[
        AudioBackend::Default,
        #[cfg(all(target_os = "windows", feature = "asio"))]
        AudioBackend::Asio,
        #[cfg(feature = "jack")]
        AudioBackend::Jack,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default if cfg!(target_os = "windows") => "WASAPI",
            Self::Default if cfg!(target_os = "macos") => "CoreAudio",
            Self::Default if cfg!(target_os = "linux") => "ALSA",
            Self::Default => "Default",

            #[cfg(all(target_os = "windows", feature = "asio"))]
            Self::Asio => "ASIO",

            #[cfg(feature = "jack")]
            Self::Jack => "JACK",
        }
    }

    /// Explicit cpal host, `None` for the platform default
    fn host_id(&self) -> Option<cpal::HostId> {
        match self {
            Self::Default => None,

            #[cfg(all(target_os = "windows", feature = "asio"))]
            Self::Asio => Some(cpal::HostId::Asio),

            #[cfg(feature = "jack")]
            Self::Jack => Some(cpal::HostId::Jack),
        }
    }

    /// The cpal host serving this backend
    pub fn to_cpal_host(&self) -> Result<cpal::Host> {
        match self.host_id() {
            None => Ok(cpal::default_host()),
            Some(id) if cpal::available_hosts().contains(&id) => {
                cpal::host_from_id(id).map_err(|_| DeviceError::BackendUnavailable(self.name()))
            }
            Some(_) => Err(DeviceError::BackendUnavailable(self.name())),
        }
    }

    pub fn is_available(&self) -> bool {
        self.to_cpal_host().is_ok()
    }
}

/// Backends usable on this machine, default first
pub fn list_available_backends() -> Vec<AudioBackend> {
    AudioBackend::ALL
        .iter()
        .copied()
        .filter(AudioBackend::is_available)
        .collect()
}
