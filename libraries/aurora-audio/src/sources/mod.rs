//! Opening tracks as decoded sources

mod local;

pub use local::LocalSource;

use crate::error::Result;
use crate::source::DecodedSource;
use aurora_core::Track;

/// Turns a track reference into a decoded sample stream
///
/// The player calls this every time it loads a track; a failure becomes a
/// play-failed event rather than an error returned to the caller.
pub trait TrackDecoder: Send + Sync {
    fn open(&self, track: &Track) -> Result<Box<dyn DecodedSource>>;
}

/// Symphonia-backed decoder for local files
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder {
    target_sample_rate: Option<u32>,
}

impl SymphoniaDecoder {
    /// Decode at each file's native sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Resample every file to `sample_rate`
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(sample_rate),
        }
    }
}

impl TrackDecoder for SymphoniaDecoder {
    fn open(&self, track: &Track) -> Result<Box<dyn DecodedSource>> {
        let source = LocalSource::open(track.path(), self.target_sample_rate, track.duration)?;
        Ok(Box::new(source))
    }
}
