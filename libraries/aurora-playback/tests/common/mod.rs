//! Test doubles for driving a player without audio hardware
//!
//! `MockDevice` never pulls on its own: tests call [`MockHandle::pump`] to
//! play a block, which makes fade timing exact. Sources run at 1 kHz, so one
//! frame is one millisecond.

#![allow(dead_code)]

use aurora_audio::{AudioError, DecodedSource, OutputSource, SampleSource, StreamFormat, TrackDecoder};
use aurora_core::{Track, TrackId};
use aurora_playback::{
    DeviceState, OutputDevice, PlaybackError, PlayerEvent, PlayerOptions, SharedOptions, StopReason,
    StoppedHandler, TrackPlayer,
};
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const RATE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Assign,
    Clear,
    Start,
    Pause,
    Stop,
}

#[derive(Default)]
struct MockState {
    source: Option<Arc<dyn OutputSource>>,
    handler: Option<StoppedHandler>,
    device: Option<DeviceState>,
    calls: Vec<Call>,
    fail_start: bool,
}

#[derive(Clone, Default)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|&&c| c == call).count()
    }

    pub fn state(&self) -> DeviceState {
        self.0.lock().unwrap().device.unwrap_or(DeviceState::Stopped)
    }

    pub fn has_source(&self) -> bool {
        self.0.lock().unwrap().source.is_some()
    }

    /// Make every later `start` fail, as a device that vanished would
    pub fn fail_start(&self, fail: bool) {
        self.0.lock().unwrap().fail_start = fail;
    }

    /// Pull `frames` frames if the device is playing
    ///
    /// An empty pull ends the stream the way a real device does.
    pub fn pump(&self, frames: usize) -> Vec<f32> {
        let source = {
            let state = self.0.lock().unwrap();
            if state.device != Some(DeviceState::Playing) {
                return Vec::new();
            }
            match &state.source {
                Some(source) => source.clone(),
                None => return Vec::new(),
            }
        };

        let channels = usize::from(source.format().channels);
        let mut buffer = vec![0.0f32; frames * channels];
        let count = source.pull(&mut buffer);
        buffer.truncate(count);

        if count == 0 {
            self.finish(StopReason::EndOfStream);
        }
        buffer
    }

    /// Pump until the source runs dry
    pub fn drain(&self) {
        for _ in 0..10_000 {
            if self.pump(64).is_empty() {
                return;
            }
        }
        panic!("source never ended");
    }

    /// Simulate the backend failing mid-stream
    pub fn fail(&self, message: &str) {
        self.finish(StopReason::Failed(message.to_string()));
    }

    fn finish(&self, reason: StopReason) {
        let handler = {
            let mut state = self.0.lock().unwrap();
            state.device = Some(DeviceState::Stopped);
            state.handler.clone()
        };
        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

pub struct MockDevice {
    name: String,
    handle: MockHandle,
}

impl MockDevice {
    pub fn new(name: &str) -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                name: name.to_string(),
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl OutputDevice for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_stopped_handler(&mut self, handler: StoppedHandler) {
        self.handle.0.lock().unwrap().handler = Some(handler);
    }

    fn assign_source(&mut self, source: Arc<dyn OutputSource>) -> aurora_playback::Result<()> {
        let mut state = self.handle.0.lock().unwrap();
        state.source = Some(source);
        state.calls.push(Call::Assign);
        Ok(())
    }

    fn clear_source(&mut self) -> aurora_playback::Result<()> {
        let mut state = self.handle.0.lock().unwrap();
        state.source = None;
        state.calls.push(Call::Clear);
        Ok(())
    }

    fn start(&mut self) -> aurora_playback::Result<()> {
        let mut state = self.handle.0.lock().unwrap();
        state.calls.push(Call::Start);
        if state.fail_start {
            return Err(PlaybackError::Device("device unavailable".into()));
        }
        state.device = Some(DeviceState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> aurora_playback::Result<()> {
        let mut state = self.handle.0.lock().unwrap();
        state.device = Some(DeviceState::Paused);
        state.calls.push(Call::Pause);
        Ok(())
    }

    fn stop(&mut self) -> aurora_playback::Result<()> {
        {
            let mut state = self.handle.0.lock().unwrap();
            if state.device.unwrap_or(DeviceState::Stopped) == DeviceState::Stopped {
                return Ok(());
            }
            state.calls.push(Call::Stop);
        }
        self.handle.finish(StopReason::Requested);
        Ok(())
    }

    fn state(&self) -> DeviceState {
        self.handle.state()
    }
}

/// Stereo source of constant full-scale samples
pub struct ToneSource {
    total_frames: usize,
    frame: usize,
}

impl ToneSource {
    pub fn new(duration: Duration) -> Self {
        Self {
            total_frames: duration.as_millis() as usize,
            frame: 0,
        }
    }
}

impl SampleSource for ToneSource {
    fn read(&mut self, buffer: &mut [f32]) -> aurora_audio::Result<usize> {
        let frames = (buffer.len() / 2).min(self.total_frames - self.frame);
        buffer[..frames * 2].fill(1.0);
        self.frame += frames;
        Ok(frames * 2)
    }

    fn format(&self) -> StreamFormat {
        StreamFormat::new(RATE, 2)
    }
}

impl DecodedSource for ToneSource {
    fn position(&self) -> Duration {
        Duration::from_millis(self.frame as u64)
    }

    fn set_position(&mut self, position: Duration) -> aurora_audio::Result<()> {
        self.frame = (position.as_millis() as usize).min(self.total_frames);
        Ok(())
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.total_frames as u64)
    }
}

/// Opens registered tracks as tones; anything else fails to decode
#[derive(Default)]
pub struct MockDecoder {
    known: Mutex<HashMap<PathBuf, Duration>>,
}

impl MockDecoder {
    pub fn register(&self, track: &Track) {
        self.known
            .lock()
            .unwrap()
            .insert(track.path().to_path_buf(), track.duration);
    }
}

impl TrackDecoder for MockDecoder {
    fn open(&self, track: &Track) -> aurora_audio::Result<Box<dyn DecodedSource>> {
        match self.known.lock().unwrap().get(track.path()) {
            Some(&duration) => Ok(Box::new(ToneSource::new(duration))),
            None => Err(AudioError::FileNotFound(track.path().display().to_string())),
        }
    }
}

pub struct Rig {
    pub player: TrackPlayer,
    pub device: MockHandle,
    pub decoder: Arc<MockDecoder>,
    pub options: SharedOptions,
    pub events: Receiver<PlayerEvent>,
}

pub fn rig(options: PlayerOptions) -> Rig {
    let (device, handle) = MockDevice::new("mock");
    let decoder = Arc::new(MockDecoder::default());
    let options = SharedOptions::new(options);
    let player = TrackPlayer::new(Box::new(device), decoder.clone(), options.clone()).unwrap();
    let events = player.subscribe();
    Rig {
        player,
        device: handle,
        decoder,
        options,
        events,
    }
}

pub fn fading(duration_ms: u32) -> PlayerOptions {
    PlayerOptions {
        fade_enabled: true,
        fade_duration_ms: duration_ms,
        ..PlayerOptions::default()
    }
}

pub fn no_fade() -> PlayerOptions {
    PlayerOptions {
        fade_enabled: false,
        ..PlayerOptions::default()
    }
}

pub fn track(name: &str, duration_ms: u64) -> Arc<Track> {
    Arc::new(Track::with_id(
        TrackId::new(name),
        format!("/music/{}.flac", name),
        name,
        Duration::from_millis(duration_ms),
    ))
}

/// Let callbacks that schedule further device work run to completion
pub fn settle(player: &TrackPlayer) {
    for _ in 0..4 {
        player.flush().unwrap();
    }
}

pub fn drain_events(events: &Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    events.try_iter().collect()
}

/// Wait for an event matching `predicate`, returning everything seen up to it
pub fn wait_for(
    events: &Receiver<PlayerEvent>,
    predicate: impl Fn(&PlayerEvent) -> bool,
) -> Vec<PlayerEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Ok(event) => {
                let done = predicate(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(_) => break,
        }
    }
    panic!("event never arrived; saw {:?}", seen);
}
