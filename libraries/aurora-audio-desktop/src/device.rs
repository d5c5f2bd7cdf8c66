//! Output device enumeration and lookup

use crate::backend::AudioBackend;
use crate::error::{DeviceError, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub backend: AudioBackend,
    pub is_default: bool,
    /// Native sample rate (Hz)
    pub sample_rate: u32,
    pub channels: u16,
    /// Lowest and highest supported sample rates
    pub sample_rate_range: Option<(u32, u32)>,
}

#[allow(deprecated)]
pub(crate) fn device_name(device: &cpal::Device) -> Option<String> {
    device.name().ok()
}

fn describe(device: &cpal::Device, backend: AudioBackend, default_name: Option<&str>) -> Option<DeviceInfo> {
    let name = device_name(device)?;
    let config = device.default_output_config().ok()?;

    let sample_rate_range = device.supported_output_configs().ok().and_then(|configs| {
        configs.fold(None, |range: Option<(u32, u32)>, c| {
            let (min, max) = (c.min_sample_rate(), c.max_sample_rate());
            Some(range.map_or((min, max), |(lo, hi)| (lo.min(min), hi.max(max))))
        })
    });

    Some(DeviceInfo {
        is_default: default_name == Some(name.as_str()),
        name,
        backend,
        sample_rate: config.sample_rate(),
        channels: config.channels(),
        sample_rate_range,
    })
}

/// All output devices of `backend`, default first, then by name
pub fn list_devices(backend: AudioBackend) -> Result<Vec<DeviceInfo>> {
    let host = backend.to_cpal_host()?;
    let default_name = host.default_output_device().as_ref().and_then(device_name);

    let mut devices: Vec<DeviceInfo> = host
        .output_devices()?
        .filter_map(|device| describe(&device, backend, default_name.as_deref()))
        .collect();

    devices.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
    Ok(devices)
}

/// Resolve a device by exact name, or the backend's default device
pub fn find_device(backend: AudioBackend, name: Option<&str>) -> Result<cpal::Device> {
    let host = backend.to_cpal_host()?;

    let Some(name) = name else {
        return host
            .default_output_device()
            .ok_or_else(|| DeviceError::DeviceNotFound("default".into()));
    };

    host.output_devices()?
        .find(|device| device_name(device).as_deref() == Some(name))
        .ok_or_else(|| DeviceError::DeviceNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_tolerates_headless_machines() {
        match list_devices(AudioBackend::Default) {
            Ok(devices) => {
                let defaults = devices.iter().filter(|d| d.is_default).count();
                assert!(defaults <= 1);
                if defaults == 1 {
                    assert!(devices[0].is_default, "default device sorts first");
                }
            }
            Err(DeviceError::Enumeration(_)) => {}
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn unknown_device_is_not_found() {
        match find_device(AudioBackend::Default, Some("no such device 5f2c")) {
            Err(DeviceError::DeviceNotFound(name)) => assert_eq!(name, "no such device 5f2c"),
            Err(DeviceError::Enumeration(_)) => {}
            Err(e) => panic!("Unexpected error: {}", e),
            Ok(_) => panic!("found a device that does not exist"),
        }
    }
}
