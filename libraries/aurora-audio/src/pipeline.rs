//! Audio source pipeline
//!
//! Decoded source → equalizer → fade/gain, exposed to the output device as a
//! single [`OutputSource`]. One mutex guards the whole chain: the device's
//! pull, a seek from the UI thread and a fade request from the player never
//! interleave inside a block.

use crate::equalizer::{Equalizer, EqualizerBand};
use crate::error::Result;
use crate::fade::{FadeProcessor, FadeState};
use crate::source::{DecodedSource, OutputSource, SampleSource, StreamFormat};
use crate::volume::Volume;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

/// Called on the pulling thread when a fade ramp completes
pub type FadeListener = Box<dyn Fn(FadeState) + Send + Sync>;

struct Chain {
    equalizer: Equalizer<Box<dyn DecodedSource>>,
    fade: FadeProcessor,
    volume: Volume,
    failed: bool,
}

impl Chain {
    fn process(&mut self, buffer: &mut [f32], channels: usize) -> (usize, Option<FadeState>) {
        if self.failed {
            return (0, None);
        }

        match self.equalizer.read(buffer) {
            Ok(count) => {
                let finished = self.fade.apply(&mut buffer[..count], channels);
                (count, finished)
            }
            Err(e) => {
                // a broken stream ends the track rather than stalling the device
                tracing::warn!("Decoding failed mid-stream, ending track: {}", e);
                self.failed = true;
                (0, None)
            }
        }
    }
}

pub struct AudioPipeline {
    format: StreamFormat,
    chain: Mutex<Chain>,
    listener: RwLock<Option<FadeListener>>,
}

impl AudioPipeline {
    /// Build a pipeline around a freshly opened source
    ///
    /// An `initially_silent` pipeline outputs zeros until a fade-in begins.
    pub fn new(
        source: Box<dyn DecodedSource>,
        bands: &[EqualizerBand],
        initially_silent: bool,
    ) -> Self {
        let format = source.format();
        let volume = Volume::new(100);
        let mut fade = FadeProcessor::new(format.sample_rate, initially_silent);
        fade.set_gain(volume.gain());

        Self {
            format,
            chain: Mutex::new(Chain {
                equalizer: Equalizer::new(source, bands),
                fade,
                volume,
                failed: false,
            }),
            listener: RwLock::new(None),
        }
    }

    /// Start at `volume` immediately instead of ramping from unity
    #[must_use]
    pub fn with_volume(self, volume: Volume) -> Self {
        {
            let mut chain = self.lock();
            chain.volume = volume;
            chain.fade.reset_gain(volume.gain());
        }
        self
    }

    /// Install the callback raised when a fade finishes, replacing any previous one
    pub fn set_fade_listener(&self, listener: FadeListener) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn begin_fade_in(&self, duration: Duration) {
        self.lock().fade.begin_fade_in(duration);
    }

    pub fn begin_fade_out(&self, duration: Duration) {
        self.lock().fade.begin_fade_out(duration);
    }

    /// Cancel any ramp and play at full volume
    pub fn set_full_volume(&self) {
        self.lock().fade.set_full_volume();
    }

    pub fn fade_state(&self) -> FadeState {
        self.lock().fade.state()
    }

    pub fn volume(&self) -> Volume {
        self.lock().volume
    }

    pub fn set_volume(&self, volume: Volume) {
        let mut chain = self.lock();
        chain.volume = volume;
        chain.fade.set_gain(volume.gain());
    }

    pub fn position(&self) -> Duration {
        self.lock().equalizer.inner().position()
    }

    pub fn duration(&self) -> Duration {
        self.lock().equalizer.inner().duration()
    }

    /// Move the play head, clamped to the track's duration
    ///
    /// Returns the position actually applied.
    pub fn seek(&self, position: Duration) -> Result<Duration> {
        let mut chain = self.lock();
        let target = position.min(chain.equalizer.inner().duration());
        chain.equalizer.inner_mut().set_position(target)?;
        chain.equalizer.reset();
        chain.failed = false;
        Ok(target)
    }

    pub fn equalizer_bands(&self) -> Vec<EqualizerBand> {
        self.lock().equalizer.bands().to_vec()
    }

    pub fn set_equalizer_band(&self, index: usize, band: EqualizerBand) -> bool {
        self.lock().equalizer.update(index, band)
    }

    fn lock(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSource for AudioPipeline {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn pull(&self, buffer: &mut [f32]) -> usize {
        let channels = usize::from(self.format.channels);
        let (count, finished) = self.lock().process(buffer, channels);

        // raised outside the chain lock so the listener may call back in
        if let Some(state) = finished {
            if let Some(listener) = self
                .listener
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
            {
                listener(state);
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equalizer::default_bands;
    use crate::AudioError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Constant-level stereo source at 1 kHz
    struct Constant {
        total: usize,
        read: usize,
        fail_after: Option<usize>,
    }

    impl Constant {
        fn new(duration_ms: usize) -> Self {
            Self {
                total: duration_ms * 2,
                read: 0,
                fail_after: None,
            }
        }
    }

    impl SampleSource for Constant {
        fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
            if self.fail_after.is_some_and(|n| self.read >= n) {
                return Err(AudioError::Decode("corrupt frame".into()));
            }
            let count = buffer.len().min(self.total - self.read);
            buffer[..count].fill(1.0);
            self.read += count;
            Ok(count)
        }

        fn format(&self) -> StreamFormat {
            StreamFormat::new(1000, 2)
        }
    }

    impl DecodedSource for Constant {
        fn position(&self) -> Duration {
            Duration::from_millis((self.read / 2) as u64)
        }

        fn set_position(&mut self, position: Duration) -> Result<()> {
            self.read = position.as_millis() as usize * 2;
            Ok(())
        }

        fn duration(&self) -> Duration {
            Duration::from_millis((self.total / 2) as u64)
        }
    }

    fn pipeline(duration_ms: usize) -> AudioPipeline {
        AudioPipeline::new(Box::new(Constant::new(duration_ms)), &default_bands(), false)
    }

    #[test]
    fn pulls_through_to_end_of_stream() {
        let pipeline = pipeline(100);
        let mut buf = vec![0.0f32; 120];
        assert_eq!(pipeline.pull(&mut buf), 120);
        assert!(buf.iter().all(|&s| s == 1.0));
        assert_eq!(pipeline.pull(&mut buf), 80);
        assert_eq!(pipeline.pull(&mut buf), 0);
    }

    #[test]
    fn fade_listener_fires_once_per_ramp() {
        let pipeline = pipeline(1000);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        pipeline.set_fade_listener(Box::new(move |state| {
            assert_eq!(state, FadeState::Silence);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        pipeline.begin_fade_out(Duration::from_millis(10));
        let mut buf = vec![0.0f32; 64];
        pipeline.pull(&mut buf);
        pipeline.pull(&mut buf);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.fade_state(), FadeState::Silence);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let pipeline = pipeline(500);
        assert_eq!(
            pipeline.seek(Duration::from_secs(10)).unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(pipeline.position(), Duration::from_millis(500));

        pipeline.seek(Duration::from_millis(250)).unwrap();
        assert_eq!(pipeline.position(), Duration::from_millis(250));
    }

    #[test]
    fn mute_silences_after_smoothing() {
        let pipeline = pipeline(1000);
        let mut volume = pipeline.volume();
        volume.set_muted(true);
        pipeline.set_volume(volume);

        let mut buf = vec![0.0f32; 64];
        pipeline.pull(&mut buf);
        assert!(buf[0] > 0.0);
        pipeline.pull(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn initial_volume_applies_without_ramp() {
        let pipeline = pipeline(100).with_volume(Volume::new(0));
        let mut buf = vec![0.0f32; 8];
        pipeline.pull(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
        assert_eq!(pipeline.volume().level(), 0);
    }

    #[test]
    fn decode_error_ends_stream() {
        let mut source = Constant::new(1000);
        source.fail_after = Some(10);
        let pipeline = AudioPipeline::new(Box::new(source), &default_bands(), false);

        let mut buf = vec![0.0f32; 10];
        assert_eq!(pipeline.pull(&mut buf), 10);
        assert_eq!(pipeline.pull(&mut buf), 0);
        assert_eq!(pipeline.pull(&mut buf), 0);
    }

    #[test]
    fn initially_silent_until_fade_in() {
        let pipeline = AudioPipeline::new(Box::new(Constant::new(100)), &default_bands(), true);
        let mut buf = vec![0.5f32; 8];
        pipeline.pull(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));

        pipeline.begin_fade_in(Duration::ZERO);
        pipeline.pull(&mut buf);
        assert!(buf.iter().all(|&s| s == 1.0));
    }
}
