//! Single-track engine
//!
//! The track player owns at most one pipeline and one output device. Public
//! calls validate against the current state and then schedule the real work
//! on the device-control context, where every device call, fade completion
//! and device-stopped notification runs one at a time, in order.
//!
//! Fade-outs defer the device call: `pause`/`stop` start the ramp and the
//! pipeline's fade listener performs the actual pause/stop once the output is
//! silent. A track change while playing is a fading stop with the new track
//! parked as "pending"; the stopped handler loads it and resumes playback.

use crate::context::DeviceContext;
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::output::{DeviceState, OutputDevice, StopReason, StoppedHandler};
use crate::types::{PlayState, SharedOptions};
use aurora_audio::{
    default_bands, AudioPipeline, EqualizerBand, FadeState, TrackDecoder, Volume,
};
use aurora_core::Track;
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Device call waiting for a fade-out to reach silence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Pause,
    Stop,
}

struct Core {
    state: PlayState,
    /// A stop is in flight and the device has not confirmed it yet
    stop_requested: bool,
    /// Start playing once the in-flight stop completes
    resume_after_stop: bool,
    /// Track to load once the in-flight stop completes
    pending_track: Option<Arc<Track>>,
    deferred: Option<Deferred>,

    device: Option<Box<dyn OutputDevice>>,
    device_generation: u64,
    pipeline: Option<Arc<AudioPipeline>>,
    pipeline_generation: u64,
    current_track: Option<Arc<Track>>,

    volume: Volume,
    bands: Vec<EqualizerBand>,
    disposed: bool,
}

struct Inner {
    context: DeviceContext,
    core: Mutex<Core>,
    decoder: Arc<dyn TrackDecoder>,
    options: SharedOptions,
    events: EventBus,
}

pub struct TrackPlayer {
    inner: Arc<Inner>,
}

impl TrackPlayer {
    pub fn new(
        device: Box<dyn OutputDevice>,
        decoder: Arc<dyn TrackDecoder>,
        options: SharedOptions,
    ) -> Result<Self> {
        let inner = Arc::new(Inner {
            context: DeviceContext::spawn("aurora-device-control")?,
            core: Mutex::new(Core {
                state: PlayState::Stop,
                stop_requested: false,
                resume_after_stop: false,
                pending_track: None,
                deferred: None,
                device: None,
                device_generation: 0,
                pipeline: None,
                pipeline_generation: 0,
                current_track: None,
                volume: Volume::default(),
                bands: default_bands(),
                disposed: false,
            }),
            decoder,
            options,
            events: EventBus::new(),
        });

        let attach = inner.clone();
        inner.context.run(move || attach.attach_device(device))?;
        Ok(Self { inner })
    }

    /// Start or resume playback
    ///
    /// Resuming from pause fades in when fades are enabled.
    pub fn play(&self) -> Result<()> {
        {
            let core = self.inner.lock();
            check_usable(&core)?;
            if core.pipeline.is_none() && core.pending_track.is_none() {
                return Err(PlaybackError::NoSourceLoaded);
            }
        }
        let inner = self.inner.clone();
        self.inner.context.post(move || inner.do_play())
    }

    /// Pause playback; ignored unless playing
    pub fn pause(&self, allow_fade_out: bool) -> Result<()> {
        check_usable(&self.inner.lock())?;
        let inner = self.inner.clone();
        self.inner
            .context
            .post(move || inner.do_pause(allow_fade_out))
    }

    /// Stop playback
    ///
    /// The state becomes `Stop` only once the device confirms; subscribe to
    /// events to observe it. `cancel_pending` drops a track change that was
    /// waiting for the device to stop.
    pub fn stop(&self, allow_fade_out: bool, cancel_pending: bool) -> Result<()> {
        check_usable(&self.inner.lock())?;
        let inner = self.inner.clone();
        self.inner
            .context
            .post(move || inner.do_stop(allow_fade_out, cancel_pending))
    }

    /// Switch to `track`
    ///
    /// While stopped the track loads before this returns. Otherwise the
    /// current track is stopped first (fading if enabled) and the new one is
    /// loaded, and resumed if it was playing, when the device confirms.
    pub fn change_source(&self, track: Arc<Track>) -> Result<()> {
        let busy = {
            let core = self.inner.lock();
            check_usable(&core)?;
            core.state != PlayState::Stop || core.stop_requested
        };

        let inner = self.inner.clone();
        if busy {
            self.inner.context.post(move || inner.do_change_source(track))
        } else {
            self.inner.context.run(move || inner.do_change_source(track))
        }
    }

    /// Move the play head, clamped to the track's duration
    pub fn seek(&self, position: Duration) -> Result<Duration> {
        let pipeline = {
            let core = self.inner.lock();
            check_usable(&core)?;
            core.pipeline.clone().ok_or(PlaybackError::NoSourceLoaded)?
        };
        let applied = pipeline.seek(position)?;
        tracing::debug!(position_ms = applied.as_millis() as u64, "Seek");
        Ok(applied)
    }

    pub fn state(&self) -> PlayState {
        self.inner.lock().state
    }

    pub fn position(&self) -> Duration {
        self.pipeline().map_or(Duration::ZERO, |p| p.position())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.pipeline().map(|p| p.duration())
    }

    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.inner.lock().current_track.clone()
    }

    pub fn has_source(&self) -> bool {
        self.inner.lock().pipeline.is_some()
    }

    pub fn volume(&self) -> Volume {
        self.inner.lock().volume
    }

    /// Set the volume level (0-100) on the player and the loaded pipeline
    pub fn set_volume(&self, level: u8) {
        let mut core = self.inner.lock();
        core.volume.set_level(level);
        apply_volume(&core);
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().volume.is_muted()
    }

    pub fn set_muted(&self, muted: bool) {
        let mut core = self.inner.lock();
        core.volume.set_muted(muted);
        apply_volume(&core);
    }

    pub fn equalizer_bands(&self) -> Vec<EqualizerBand> {
        self.inner.lock().bands.clone()
    }

    /// Change one equalizer band now and for every later track
    pub fn set_equalizer_band(&self, index: usize, band: EqualizerBand) -> bool {
        let mut core = self.inner.lock();
        let Some(slot) = core.bands.get_mut(index) else {
            return false;
        };
        *slot = band;
        if let Some(pipeline) = &core.pipeline {
            pipeline.set_equalizer_band(index, band);
        }
        true
    }

    /// Replace the output device, moving the loaded pipeline onto it
    pub fn set_device(&self, device: Box<dyn OutputDevice>) -> Result<()> {
        check_usable(&self.inner.lock())?;
        let inner = self.inner.clone();
        self.inner.context.run(move || inner.attach_device(device))
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn options(&self) -> &SharedOptions {
        &self.inner.options
    }

    /// Wait until all device work scheduled so far has run
    pub fn flush(&self) -> Result<()> {
        self.inner.context.run(|| ())
    }

    /// Stop the device and release everything
    ///
    /// No track-finished event is raised. Later calls fail with
    /// [`PlaybackError::Disposed`].
    pub fn dispose(&self) -> Result<()> {
        let inner = self.inner.clone();
        self.inner.context.run(move || inner.do_dispose())
    }

    fn pipeline(&self) -> Option<Arc<AudioPipeline>> {
        self.inner.lock().pipeline.clone()
    }
}

fn check_usable(core: &Core) -> Result<()> {
    if core.disposed {
        Err(PlaybackError::Disposed)
    } else {
        Ok(())
    }
}

fn device_is_pulling(core: &Core) -> bool {
    core.device
        .as_ref()
        .is_some_and(|device| device.state() == DeviceState::Playing)
}

fn apply_volume(core: &Core) {
    if let Some(pipeline) = &core.pipeline {
        pipeline.set_volume(core.volume);
    }
}

// Everything below runs on the device-control context.
impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn do_play(self: &Arc<Self>) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        if core.stop_requested {
            core.resume_after_stop = true;
            return;
        }
        self.start_playback(&mut core);
    }

    fn start_playback(&self, core: &mut Core) {
        let Some(pipeline) = core.pipeline.clone() else {
            return;
        };
        let options = self.options.get();

        match core.state {
            PlayState::Play => {
                // playing again while a fading pause is in flight cancels it
                if core.deferred.take().is_some() {
                    if options.fade_enabled {
                        pipeline.begin_fade_in(options.fade_duration());
                    } else {
                        pipeline.set_full_volume();
                    }
                }
                return;
            }
            PlayState::Pause if options.fade_enabled => {
                pipeline.begin_fade_in(options.fade_duration());
            }
            PlayState::Pause => pipeline.set_full_volume(),
            PlayState::Stop => pipeline.set_full_volume(),
        }

        let Some(device) = core.device.as_mut() else {
            return;
        };
        match device.start() {
            Ok(()) => self.set_state(core, PlayState::Play),
            Err(e) => self.report_device_error(&e),
        }
    }

    fn do_pause(self: &Arc<Self>, allow_fade_out: bool) {
        let mut core = self.lock();
        if core.disposed
            || core.state != PlayState::Play
            || core.stop_requested
            || core.deferred.is_some()
        {
            return;
        }

        let options = self.options.get();
        if allow_fade_out && options.fade_enabled && device_is_pulling(&core) {
            if let Some(pipeline) = &core.pipeline {
                pipeline.begin_fade_out(options.fade_duration());
                core.deferred = Some(Deferred::Pause);
                return;
            }
        }
        self.pause_device(&mut core);
    }

    fn pause_device(&self, core: &mut Core) {
        let Some(device) = core.device.as_mut() else {
            return;
        };
        match device.pause() {
            Ok(()) => self.set_state(core, PlayState::Pause),
            Err(e) => self.report_device_error(&e),
        }
    }

    fn do_stop(self: &Arc<Self>, allow_fade_out: bool, cancel_pending: bool) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        if cancel_pending {
            core.pending_track = None;
            core.resume_after_stop = false;
        }
        self.request_stop(&mut core, allow_fade_out);
    }

    fn request_stop(self: &Arc<Self>, core: &mut Core, allow_fade_out: bool) {
        if core.stop_requested || core.state == PlayState::Stop {
            return;
        }
        core.stop_requested = true;

        // a fade only completes while the device pulls samples
        let pulling = device_is_pulling(core);

        // a fading pause already heads to silence; finish it as a stop
        if core.deferred == Some(Deferred::Pause) && pulling {
            core.deferred = Some(Deferred::Stop);
            return;
        }

        let options = self.options.get();
        if core.state == PlayState::Play && allow_fade_out && options.fade_enabled && pulling {
            if let Some(pipeline) = &core.pipeline {
                pipeline.begin_fade_out(options.fade_duration());
                core.deferred = Some(Deferred::Stop);
                return;
            }
        }
        self.stop_device(core);
    }

    fn stop_device(self: &Arc<Self>, core: &mut Core) {
        core.deferred = None;
        if let Some(device) = core.device.as_mut() {
            if device.state() == DeviceState::Stopped {
                // stop() is a no-op here, so no confirmation will come;
                // a stop the device already reported is ignored from now on
                core.device_generation += 1;
                device.set_stopped_handler(self.stopped_handler(core.device_generation));
                self.complete_stop(core, StopReason::Requested);
                return;
            }
        }

        let result = match core.device.as_mut() {
            Some(device) => device.stop(),
            None => Err(PlaybackError::Device("No output device attached".into())),
        };
        // without a working device no stopped notification will arrive
        if let Err(e) = result {
            self.report_device_error(&e);
            self.complete_stop(core, StopReason::Requested);
        }
    }

    fn do_change_source(self: &Arc<Self>, track: Arc<Track>) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        if core.stop_requested {
            core.pending_track = Some(track);
            return;
        }

        match core.state {
            PlayState::Stop => {
                self.load(&mut core, track);
            }
            PlayState::Play => {
                core.pending_track = Some(track);
                core.resume_after_stop = true;
                self.request_stop(&mut core, true);
            }
            PlayState::Pause => {
                core.pending_track = Some(track);
                core.resume_after_stop = false;
                self.request_stop(&mut core, false);
            }
        }
    }

    fn on_device_stopped(self: &Arc<Self>, generation: u64, reason: StopReason) {
        let mut core = self.lock();
        if core.disposed || generation != core.device_generation {
            return;
        }
        self.complete_stop(&mut core, reason);
    }

    fn complete_stop(self: &Arc<Self>, core: &mut Core, reason: StopReason) {
        let requested = std::mem::take(&mut core.stop_requested);
        core.deferred = None;
        self.set_state(core, PlayState::Stop);

        if let StopReason::Failed(message) = &reason {
            tracing::warn!("Output device failed: {}", message);
            self.events.emit(PlayerEvent::DeviceError {
                message: message.clone(),
            });
        }

        // a track that ran out plays again from the top
        if let Some(pipeline) = &core.pipeline {
            if reason == StopReason::EndOfStream || pipeline.position() >= pipeline.duration() {
                if let Err(e) = pipeline.seek(Duration::ZERO) {
                    tracing::warn!("Failed to rewind finished track: {}", e);
                }
            }
        }

        if !requested {
            let track_id = core.current_track.as_ref().map(|t| t.id.clone());
            tracing::debug!(?track_id, "Track finished");
            self.events.emit(PlayerEvent::TrackFinished { track_id });
        }

        if let Some(track) = core.pending_track.take() {
            self.load(core, track);
        }

        if std::mem::take(&mut core.resume_after_stop) && core.pipeline.is_some() {
            self.start_playback(core);
        }
    }

    fn on_fade_finished(self: &Arc<Self>, generation: u64, reached: FadeState) {
        let mut core = self.lock();
        if core.disposed || generation != core.pipeline_generation {
            return;
        }
        // only a fade-out that reached silence releases a deferred call
        if reached != FadeState::Silence {
            return;
        }

        match core.deferred.take() {
            Some(Deferred::Pause) if core.state == PlayState::Play => {
                self.pause_device(&mut core);
            }
            Some(Deferred::Stop) => self.stop_device(&mut core),
            _ => {}
        }
    }

    fn load(self: &Arc<Self>, core: &mut Core, track: Arc<Track>) {
        core.pipeline = None;
        core.pipeline_generation += 1;
        let previous_track_id = core.current_track.take().map(|t| t.id.clone());

        let source = match self.decoder.open(&track) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %track.path().display(), "Failed to load track: {}", e);
                // the device still holds the previous pipeline and its decoder
                if let Some(device) = core.device.as_mut() {
                    if let Err(e) = device.clear_source() {
                        self.report_device_error(&e);
                    }
                }
                self.events.emit(PlayerEvent::PlayFailed {
                    track_id: track.id.clone(),
                    cause: e.to_string(),
                });
                return;
            }
        };

        let pipeline =
            Arc::new(AudioPipeline::new(source, &core.bands, false).with_volume(core.volume));
        let generation = core.pipeline_generation;
        let weak = Arc::downgrade(self);
        let context = self.context.handle();
        // runs on the audio thread; the player is only upgraded on the context
        pipeline.set_fade_listener(Box::new(move |reached| {
            let weak = weak.clone();
            let _ = context.post(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_fade_finished(generation, reached);
                }
            });
        }));

        if let Some(device) = core.device.as_mut() {
            if let Err(e) = device.assign_source(pipeline.clone()) {
                self.report_device_error(&e);
            }
        }

        tracing::info!(
            track = %track.title,
            duration_ms = pipeline.duration().as_millis() as u64,
            "Loaded track"
        );
        core.pipeline = Some(pipeline);
        core.current_track = Some(track.clone());
        self.events.emit(PlayerEvent::TrackChanged {
            track_id: track.id.clone(),
            previous_track_id,
        });
    }

    fn attach_device(self: &Arc<Self>, mut device: Box<dyn OutputDevice>) {
        let mut core = self.lock();
        core.device_generation += 1;
        device.set_stopped_handler(self.stopped_handler(core.device_generation));

        if let Some(mut old) = core.device.take() {
            tracing::info!(from = old.name(), to = device.name(), "Switching output device");
            if let Err(e) = old.stop() {
                tracing::warn!("Failed to stop previous device: {}", e);
            }
        }

        if let Some(pipeline) = &core.pipeline {
            if let Err(e) = device.assign_source(pipeline.clone()) {
                self.report_device_error(&e);
            }
        }
        core.device = Some(device);

        if core.stop_requested {
            // the old device's confirmation is ignored now, so finish here
            self.complete_stop(&mut core, StopReason::Requested);
        } else if core.state == PlayState::Play {
            if let Some(device) = core.device.as_mut() {
                if let Err(e) = device.start() {
                    self.report_device_error(&e);
                }
            }
        }
    }

    fn stopped_handler(self: &Arc<Self>, generation: u64) -> StoppedHandler {
        let weak = Arc::downgrade(self);
        let context = self.context.handle();
        Arc::new(move |reason| {
            let weak = weak.clone();
            let _ = context.post(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_device_stopped(generation, reason);
                }
            });
        })
    }

    fn do_dispose(&self) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        core.device_generation += 1;
        core.pipeline_generation += 1;

        if let Some(mut device) = core.device.take() {
            if let Err(e) = device.stop() {
                tracing::warn!("Failed to stop device on dispose: {}", e);
            }
        }
        core.pipeline = None;
        core.pending_track = None;
        core.current_track = None;
        core.deferred = None;
        core.stop_requested = false;
        core.resume_after_stop = false;
        self.set_state(&mut core, PlayState::Stop);
        tracing::debug!("Track player disposed");
    }

    fn set_state(&self, core: &mut Core, state: PlayState) {
        if core.state == state {
            return;
        }
        debug_assert!(
            core.state.can_transition_to(state),
            "illegal transition {:?} -> {:?}",
            core.state,
            state
        );
        tracing::debug!(from = ?core.state, to = ?state, "Play state changed");
        core.state = state;
        self.events.emit(PlayerEvent::StateChanged { state });
    }

    fn report_device_error(&self, error: &PlaybackError) {
        tracing::warn!("Output device error: {}", error);
        self.events.emit(PlayerEvent::DeviceError {
            message: error.to_string(),
        });
    }
}
