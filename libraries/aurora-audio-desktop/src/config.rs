//! Device configuration and stream format negotiation

use crate::backend::AudioBackend;
use crate::error::{DeviceError, Result};
use aurora_audio::StreamFormat;
use cpal::traits::DeviceTrait;
use cpal::{BufferSize, SampleFormat, StreamConfig, SupportedBufferSize};
use serde::{Deserialize, Serialize};

/// Frames assumed for a backend-chosen buffer when estimating latency
const DEFAULT_BUFFER_ESTIMATE: u32 = 512;

/// Rough DAC/driver latency added on top of the buffer
const OUTPUT_LATENCY_ESTIMATE_MS: f32 = 5.0;

/// How the device is shared with other applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Fall back to the device's native rate when the source rate is unsupported
    #[default]
    Shared,
    /// Run the device at the source's exact rate or fail
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub backend: AudioBackend,
    /// Device name; `None` selects the backend default
    pub device_name: Option<String>,
    pub share_mode: ShareMode,
    /// Requested buffer latency; `None` leaves it to the backend
    pub latency_ms: Option<u32>,
}

impl DeviceConfig {
    pub fn with_device(mut self, name: &str) -> Self {
        self.device_name = Some(name.to_string());
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u32) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.share_mode = ShareMode::Exclusive;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyInfo {
    pub buffer_frames: u32,
    pub buffer_ms: f32,
    /// Buffer latency plus an estimate for the driver and DAC
    pub total_ms: f32,
    pub exclusive: bool,
}

impl LatencyInfo {
    fn new(buffer_size: BufferSize, sample_rate: u32, exclusive: bool) -> Self {
        let buffer_frames = match buffer_size {
            BufferSize::Fixed(frames) => frames,
            BufferSize::Default => DEFAULT_BUFFER_ESTIMATE,
        };
        let buffer_ms = buffer_frames as f32 / sample_rate.max(1) as f32 * 1000.0;
        Self {
            buffer_frames,
            buffer_ms,
            total_ms: buffer_ms + OUTPUT_LATENCY_ESTIMATE_MS,
            exclusive,
        }
    }
}

/// One supported configuration range, as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub channels: u16,
    pub min_rate: u32,
    pub max_rate: u32,
    pub format: SampleFormat,
    pub buffer: Option<(u32, u32)>,
}

impl Candidate {
    fn supports(&self, rate: u32) -> bool {
        (self.min_rate..=self.max_rate).contains(&rate)
    }

    /// Lower is better
    fn rank(&self, source: StreamFormat) -> (u8, u8) {
        let channels = if self.channels == source.channels {
            0
        } else if self.channels > source.channels {
            1
        } else {
            2
        };
        let format = u8::from(self.format != SampleFormat::F32);
        (channels, format)
    }
}

/// Stream parameters chosen for one source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Negotiated {
    pub config: StreamConfig,
    pub format: SampleFormat,
    pub latency: LatencyInfo,
}

/// Pick the stream configuration for `source`
///
/// Prefers a configuration that runs at the source's rate with the same
/// channel count. Shared mode falls back to `native` (the device default)
/// when no configuration supports the source rate.
pub(crate) fn negotiate(
    candidates: &[Candidate],
    native: (Candidate, u32),
    source: StreamFormat,
    config: &DeviceConfig,
) -> Result<Negotiated> {
    let exclusive = config.share_mode == ShareMode::Exclusive;

    let matching = candidates
        .iter()
        .filter(|c| c.supports(source.sample_rate))
        .min_by_key(|c| c.rank(source));

    let (chosen, rate) = match matching {
        Some(candidate) => (*candidate, source.sample_rate),
        None if exclusive => {
            return Err(DeviceError::Config(format!(
                "Device does not support {} Hz in exclusive mode",
                source.sample_rate
            )))
        }
        None => {
            tracing::warn!(
                source_rate = source.sample_rate,
                device_rate = native.1,
                "Device cannot run at source rate, using its native rate"
            );
            native
        }
    };

    let buffer_size = match config.latency_ms {
        Some(ms) => {
            let frames = (rate as u64 * u64::from(ms) / 1000).max(1) as u32;
            BufferSize::Fixed(match chosen.buffer {
                Some((min, max)) => frames.clamp(min, max),
                None => frames,
            })
        }
        None => BufferSize::Default,
    };

    Ok(Negotiated {
        config: StreamConfig {
            channels: chosen.channels,
            sample_rate: rate,
            buffer_size,
        },
        format: chosen.format,
        latency: LatencyInfo::new(buffer_size, rate, exclusive),
    })
}

fn buffer_range(buffer: &SupportedBufferSize) -> Option<(u32, u32)> {
    match buffer {
        SupportedBufferSize::Range { min, max } => Some((*min, *max)),
        SupportedBufferSize::Unknown => None,
    }
}

/// Query `device` and negotiate a stream for `source`
pub(crate) fn negotiate_for_device(
    device: &cpal::Device,
    source: StreamFormat,
    config: &DeviceConfig,
) -> Result<Negotiated> {
    let candidates: Vec<Candidate> = device
        .supported_output_configs()?
        .map(|c| Candidate {
            channels: c.channels(),
            min_rate: c.min_sample_rate(),
            max_rate: c.max_sample_rate(),
            format: c.sample_format(),
            buffer: buffer_range(c.buffer_size()),
        })
        .collect();

    let default = device.default_output_config()?;
    let native = Candidate {
        channels: default.channels(),
        min_rate: default.sample_rate(),
        max_rate: default.sample_rate(),
        format: default.sample_format(),
        buffer: buffer_range(default.buffer_size()),
    };

    negotiate(&candidates, (native, default.sample_rate()), source, config)
}
