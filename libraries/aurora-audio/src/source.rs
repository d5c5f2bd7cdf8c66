//! Streaming sample contracts
//!
//! Every stage of the pipeline speaks interleaved `f32` samples in `[-1.0, 1.0]`.
//! Stages pull from their upstream ([`SampleSource`]); the output device pulls
//! from the finished pipeline through the shared [`OutputSource`] handle.

use crate::error::Result;
use std::time::Duration;

/// Sample rate and channel layout of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames covering `duration`, rounded down
    pub fn frames_in(&self, duration: Duration) -> u64 {
        duration.as_millis() as u64 * u64::from(self.sample_rate) / 1000
    }

    /// Number of interleaved samples covering `duration`
    pub fn samples_in(&self, duration: Duration) -> usize {
        self.frames_in(duration) as usize * usize::from(self.channels)
    }

    /// Playback time represented by `samples` interleaved samples
    pub fn duration_of(&self, samples: usize) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = samples / usize::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

/// Pull-based producer of interleaved samples
pub trait SampleSource: Send {
    /// Fill `buffer` and return the number of samples written
    ///
    /// Fewer samples than requested means the stream is ending; `Ok(0)` means
    /// it has ended.
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize>;

    fn format(&self) -> StreamFormat;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn format(&self) -> StreamFormat {
        (**self).format()
    }
}

/// A decoded track: a sample stream with a movable play head
pub trait DecodedSource: SampleSource {
    /// Current play head, derived from samples delivered so far
    fn position(&self) -> Duration;

    /// Move the play head
    ///
    /// Callers clamp `position` to [`DecodedSource::duration`] first.
    fn set_position(&mut self, position: Duration) -> Result<()>;

    fn duration(&self) -> Duration;
}

/// Shared, thread-safe pull endpoint consumed by output devices
///
/// Devices only pull; they never own or reconfigure what they pull from.
pub trait OutputSource: Send + Sync {
    fn format(&self) -> StreamFormat;

    /// Fill `buffer`, returning how many samples were produced
    fn pull(&self, buffer: &mut [f32]) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_math() {
        let format = StreamFormat::new(48000, 2);
        assert_eq!(format.frames_in(Duration::from_millis(200)), 9600);
        assert_eq!(format.samples_in(Duration::from_millis(200)), 19200);
        assert_eq!(format.duration_of(96000), Duration::from_secs(1));
    }

    #[test]
    fn degenerate_format_has_no_duration() {
        assert_eq!(StreamFormat::new(0, 2).duration_of(100), Duration::ZERO);
        assert_eq!(StreamFormat::new(44100, 0).duration_of(100), Duration::ZERO);
    }
}
