//! Aurora Audio
//!
//! Everything between a file on disk and the samples an output device pulls:
//!
//! - [`sources`]: open tracks as decoded streams (Symphonia, optional rubato resampling)
//! - [`Equalizer`]: per-channel peaking biquads
//! - [`FadeProcessor`]: sample-accurate linear fades plus smoothed output gain
//! - [`AudioPipeline`]: decoded source → equalizer → fade, shared with the device
//!
//! All stages exchange interleaved `f32` samples and are pull-driven.

#![forbid(unsafe_code)]

pub mod equalizer;
pub mod error;
pub mod fade;
pub mod pipeline;
pub mod source;
pub mod sources;
pub mod volume;

pub use equalizer::{default_bands, Equalizer, EqualizerBand};
pub use error::{AudioError, Result};
pub use fade::{FadeProcessor, FadeState};
pub use pipeline::{AudioPipeline, FadeListener};
pub use source::{DecodedSource, OutputSource, SampleSource, StreamFormat};
pub use sources::{LocalSource, SymphoniaDecoder, TrackDecoder};
pub use volume::Volume;
