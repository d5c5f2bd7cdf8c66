/// Multi-band peaking equalizer
///
/// One peaking biquad per channel per band, run in series on every sample.
/// Bands are fixed at construction; [`Equalizer::update`] recomputes a single
/// band's coefficients in place so the filter bank is never reallocated and
/// filter state (and therefore continuity) survives the change.
use crate::error::Result;
use crate::source::{SampleSource, StreamFormat};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use serde::{Deserialize, Serialize};

const MAX_GAIN_DB: f32 = 24.0;

/// Center frequencies of the default ten-band layout
pub const DEFAULT_FREQUENCIES: [f32; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// One equalizer band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    /// Center frequency in Hz
    pub frequency: f32,
    /// Bandwidth in octaves
    pub bandwidth: f32,
    /// Gain in dB, clamped to +/-24
    pub gain_db: f32,
}

impl EqualizerBand {
    pub fn new(frequency: f32, bandwidth: f32, gain_db: f32) -> Self {
        Self {
            frequency,
            bandwidth,
            gain_db: gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB),
        }
    }

    /// Q factor for the band's bandwidth in octaves
    pub fn q(&self) -> f32 {
        let bandwidth = self.bandwidth.max(0.01);
        1.0 / (2.0 * (std::f32::consts::LN_2 / 2.0 * bandwidth).sinh())
    }

    fn coefficients(&self, sample_rate: u32) -> Coefficients<f32> {
        let fs = sample_rate as f32;
        let nyquist = fs / 2.0 - 1.0;
        if nyquist <= 20.0 {
            return unity_coefficients();
        }

        Coefficients::<f32>::from_params(
            Type::PeakingEQ(self.gain_db),
            fs.hz(),
            self.frequency.clamp(20.0, nyquist).hz(),
            self.q(),
        )
        .unwrap_or_else(|_| unity_coefficients())
    }
}

/// Ten flat bands, 0.8 octaves wide
pub fn default_bands() -> Vec<EqualizerBand> {
    DEFAULT_FREQUENCIES
        .iter()
        .map(|&frequency| EqualizerBand::new(frequency, 0.8, 0.0))
        .collect()
}

fn unity_coefficients() -> Coefficients<f32> {
    Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    }
}

/// Equalizer stage pulling from an upstream source
pub struct Equalizer<S> {
    source: S,
    format: StreamFormat,
    bands: Vec<EqualizerBand>,
    /// `filters[channel][band]`
    filters: Vec<Vec<DirectForm2Transposed<f32>>>,
}

impl<S: SampleSource> Equalizer<S> {
    pub fn new(source: S, bands: &[EqualizerBand]) -> Self {
        let format = source.format();
        let filters = (0..usize::from(format.channels.max(1)))
            .map(|_| {
                bands
                    .iter()
                    .map(|band| DirectForm2Transposed::<f32>::new(band.coefficients(format.sample_rate)))
                    .collect()
            })
            .collect();

        Self {
            source,
            format,
            bands: bands.to_vec(),
            filters,
        }
    }

    pub fn bands(&self) -> &[EqualizerBand] {
        &self.bands
    }

    /// Replace band `index` and recompute its coefficients on every channel
    ///
    /// Returns `false` if there is no such band.
    pub fn update(&mut self, index: usize, band: EqualizerBand) -> bool {
        let Some(slot) = self.bands.get_mut(index) else {
            return false;
        };
        *slot = band;

        let coefficients = band.coefficients(self.format.sample_rate);
        for channel in &mut self.filters {
            channel[index].update_coefficients(coefficients);
        }
        true
    }

    /// True when every band is at 0 dB, so filtering would be an identity
    pub fn is_flat(&self) -> bool {
        self.bands.iter().all(|b| b.gain_db == 0.0)
    }

    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut().flatten() {
            filter.reset_state();
        }
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SampleSource> SampleSource for Equalizer<S> {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
        let count = self.source.read(buffer)?;
        if self.is_flat() {
            return Ok(count);
        }

        let channels = self.filters.len();
        for frame in buffer[..count].chunks_mut(channels) {
            for (sample, filters) in frame.iter_mut().zip(self.filters.iter_mut()) {
                for filter in filters.iter_mut() {
                    *sample = filter.run(*sample);
                }
            }
        }
        Ok(count)
    }

    fn format(&self) -> StreamFormat {
        self.format
    }
}
