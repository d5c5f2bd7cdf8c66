//! Sample-accurate linear fades
//!
//! The processor sits at the end of the pipeline and scales every frame it
//! sees. A ramp advances once per interleaved frame, so a fade of `D` ms always
//! covers `D * sample_rate / 1000` frames regardless of channel count.
//!
//! On top of the ramp it carries the output gain (volume and mute). Gain changes
//! are spread over a few milliseconds so moving the volume slider never clicks.

use std::time::Duration;

/// Time over which a gain change is spread
const GAIN_SMOOTHING: Duration = Duration::from_millis(10);

/// Where the processor is in its fade cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    Silence,
    FadingIn,
    FullVolume,
    FadingOut,
}

impl FadeState {
    pub fn is_fading(self) -> bool {
        matches!(self, Self::FadingIn | Self::FadingOut)
    }
}

/// Output gain moving towards a target by a fixed step per frame
#[derive(Debug, Clone, Copy)]
struct GainRamp {
    current: f32,
    target: f32,
    step: f32,
}

impl GainRamp {
    fn unity() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            step: 0.0,
        }
    }

    fn is_settled(&self) -> bool {
        self.current == self.target
    }

    fn advance(&mut self) -> f32 {
        if !self.is_settled() {
            let remaining = self.target - self.current;
            if remaining.abs() <= self.step {
                self.current = self.target;
            } else {
                self.current += self.step.copysign(remaining);
            }
        }
        self.current
    }
}

/// Linear fade-in/fade-out processor
#[derive(Debug, Clone)]
pub struct FadeProcessor {
    state: FadeState,
    position: u64,
    total: u64,
    sample_rate: u32,
    gain: GainRamp,
}

impl FadeProcessor {
    /// Create a processor for a stream at `sample_rate`
    ///
    /// An initially silent processor outputs zeros until a fade-in begins.
    pub fn new(sample_rate: u32, initially_silent: bool) -> Self {
        Self {
            state: if initially_silent {
                FadeState::Silence
            } else {
                FadeState::FullVolume
            },
            position: 0,
            total: 0,
            sample_rate,
            gain: GainRamp::unity(),
        }
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    /// Start ramping up to full volume, replacing any ramp in progress
    pub fn begin_fade_in(&mut self, duration: Duration) {
        self.begin(FadeState::FadingIn, duration);
    }

    /// Start ramping down to silence, replacing any ramp in progress
    pub fn begin_fade_out(&mut self, duration: Duration) {
        self.begin(FadeState::FadingOut, duration);
    }

    /// Drop any ramp and play at full volume immediately
    pub fn set_full_volume(&mut self) {
        self.state = FadeState::FullVolume;
        self.position = 0;
        self.total = 0;
    }

    /// Target output gain (volume times mute), reached over a short ramp
    pub fn set_gain(&mut self, target: f32) {
        let target = target.max(0.0);
        let frames = self.sample_rate as u64 * GAIN_SMOOTHING.as_millis() as u64 / 1000;
        self.gain.target = target;
        if frames == 0 {
            self.gain.current = target;
            self.gain.step = 0.0;
        } else {
            self.gain.step = (target - self.gain.current).abs() / frames as f32;
        }
    }

    /// Jump straight to `gain` without smoothing
    pub fn reset_gain(&mut self, gain: f32) {
        self.gain = GainRamp {
            current: gain.max(0.0),
            target: gain.max(0.0),
            step: 0.0,
        };
    }

    /// Gain currently applied on top of the fade ramp
    pub fn gain(&self) -> f32 {
        self.gain.current
    }

    /// Scale `samples` (interleaved, `channels` per frame) in place
    ///
    /// Returns the steady state reached if a ramp completed during this call.
    /// Frames after the completion point are processed in that new state, so
    /// the whole slice is always handled.
    pub fn apply(&mut self, samples: &mut [f32], channels: usize) -> Option<FadeState> {
        let channels = channels.max(1);
        match self.state {
            FadeState::Silence => {
                samples.fill(0.0);
                None
            }
            FadeState::FullVolume => {
                self.apply_gain(samples, channels);
                None
            }
            FadeState::FadingIn | FadeState::FadingOut => self.apply_ramp(samples, channels),
        }
    }

    fn begin(&mut self, state: FadeState, duration: Duration) {
        self.state = state;
        self.position = 0;
        self.total = duration.as_millis() as u64 * u64::from(self.sample_rate) / 1000;
        tracing::trace!(?state, frames = self.total, "Fade started");
    }

    fn apply_ramp(&mut self, samples: &mut [f32], channels: usize) -> Option<FadeState> {
        let fading_in = self.state == FadeState::FadingIn;

        if self.total == 0 {
            let reached = self.finish_ramp();
            self.apply(samples, channels);
            return Some(reached);
        }

        let total = self.total as f32;
        for (index, frame) in samples.chunks_mut(channels).enumerate() {
            let ramp = self.position as f32 / total;
            let multiplier = if fading_in { ramp } else { 1.0 - ramp };
            let gain = multiplier * self.gain.advance();
            for sample in frame.iter_mut() {
                *sample *= gain;
            }

            self.position += 1;
            if self.position > self.total {
                let reached = self.finish_ramp();
                let rest = ((index + 1) * channels).min(samples.len());
                self.apply(&mut samples[rest..], channels);
                return Some(reached);
            }
        }
        None
    }

    fn finish_ramp(&mut self) -> FadeState {
        self.state = match self.state {
            FadeState::FadingIn => FadeState::FullVolume,
            _ => FadeState::Silence,
        };
        self.position = 0;
        self.total = 0;
        self.state
    }

    fn apply_gain(&mut self, samples: &mut [f32], channels: usize) {
        if self.gain.is_settled() {
            let gain = self.gain.current;
            if gain == 0.0 {
                samples.fill(0.0);
            } else if gain != 1.0 {
                for sample in samples.iter_mut() {
                    *sample *= gain;
                }
            }
            return;
        }

        for frame in samples.chunks_mut(channels) {
            let gain = self.gain.advance();
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
    }
}
