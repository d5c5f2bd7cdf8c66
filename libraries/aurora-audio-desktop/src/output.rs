//! cpal output device
//!
//! cpal streams are not `Send` on every platform, so a dedicated audio thread
//! owns the device and its stream. [`CpalOutputDevice`] talks to it over a
//! command channel; `start` and `pause` wait for the thread's answer so stream
//! errors reach the caller.

use crate::config::{negotiate_for_device, DeviceConfig, LatencyInfo, Negotiated};
use crate::device::{device_name, find_device};
use crate::error::{DeviceError, Result};
use crate::render::render;
use aurora_audio::OutputSource;
use aurora_playback::{DeviceState, OutputDevice, StopReason, StoppedHandler};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

enum AudioCommand {
    Assign(Arc<dyn OutputSource>),
    Clear,
    Start(Sender<Result<()>>),
    Pause(Sender<Result<()>>),
    Stop,
    /// The stream with this id pulled an empty buffer
    Drained(u64),
    /// The stream with this id lost its device
    Failed(u64, String),
    Shutdown,
}

/// State visible outside the audio thread
struct Shared {
    state: Mutex<DeviceState>,
    handler: Mutex<Option<StoppedHandler>>,
    latency: Mutex<Option<LatencyInfo>>,
}

impl Shared {
    fn set_state(&self, state: DeviceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> DeviceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_stopped(&self, reason: StopReason) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

/// Output device backed by a cpal stream
///
/// A stream is built on the first `start` after a source is assigned, at the
/// rate and channel layout negotiated for that source.
pub struct CpalOutputDevice {
    name: String,
    sample_rate: u32,
    command_tx: Sender<AudioCommand>,
    shared: Arc<Shared>,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalOutputDevice {
    /// Open the device selected by `config`
    ///
    /// # Errors
    /// Returns an error if the backend or device is unavailable
    pub fn open(config: DeviceConfig) -> Result<Self> {
        let device = find_device(config.backend, config.device_name.as_deref())?;
        let name = device_name(&device).unwrap_or_else(|| "Unknown device".to_string());
        let sample_rate = device.default_output_config()?.sample_rate();

        let shared = Arc::new(Shared {
            state: Mutex::new(DeviceState::Stopped),
            handler: Mutex::new(None),
            latency: Mutex::new(None),
        });
        let (command_tx, command_rx) = unbounded();

        let thread_shared = Arc::clone(&shared);
        let callback_tx = command_tx.clone();
        let audio_thread = thread::Builder::new()
            .name("aurora-audio-output".to_string())
            .spawn(move || {
                // streams are not Send, so everything holding one lives here
                let audio = AudioThread {
                    device,
                    config,
                    shared: thread_shared,
                    command_tx: callback_tx,
                    source: None,
                    stream: None,
                    stream_id: 0,
                };
                audio.run(&command_rx);
            })
            .map_err(|e| DeviceError::StreamBuild(e.to_string()))?;

        tracing::info!(device = %name, sample_rate, "Opened output device");

        Ok(Self {
            name,
            sample_rate,
            command_tx,
            shared,
            audio_thread: Some(audio_thread),
        })
    }

    /// Open the backend's default device with default settings
    pub fn open_default() -> Result<Self> {
        Self::open(DeviceConfig::default())
    }

    /// The device's native sample rate
    ///
    /// Decoding at this rate avoids falling back to a rate the source does
    /// not have in shared mode.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Latency of the current stream, once one has been built
    pub fn latency(&self) -> Option<LatencyInfo> {
        *self
            .shared
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, command: AudioCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| DeviceError::CommandChannel)
    }

    fn request(&self, command: impl FnOnce(Sender<Result<()>>) -> AudioCommand) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(command(reply_tx))?;
        reply_rx.recv().map_err(|_| DeviceError::CommandChannel)?
    }
}

impl OutputDevice for CpalOutputDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_stopped_handler(&mut self, handler: StoppedHandler) {
        *self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn assign_source(&mut self, source: Arc<dyn OutputSource>) -> aurora_playback::Result<()> {
        Ok(self.send(AudioCommand::Assign(source))?)
    }

    fn clear_source(&mut self) -> aurora_playback::Result<()> {
        Ok(self.send(AudioCommand::Clear)?)
    }

    fn start(&mut self) -> aurora_playback::Result<()> {
        Ok(self.request(AudioCommand::Start)?)
    }

    fn pause(&mut self) -> aurora_playback::Result<()> {
        Ok(self.request(AudioCommand::Pause)?)
    }

    fn stop(&mut self) -> aurora_playback::Result<()> {
        Ok(self.send(AudioCommand::Stop)?)
    }

    fn state(&self) -> DeviceState {
        self.shared.state()
    }
}

impl Drop for CpalOutputDevice {
    fn drop(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Owns the cpal device and stream
struct AudioThread {
    device: cpal::Device,
    config: DeviceConfig,
    shared: Arc<Shared>,
    /// Handed to stream callbacks so they can report back
    command_tx: Sender<AudioCommand>,
    source: Option<Arc<dyn OutputSource>>,
    stream: Option<Stream>,
    /// Identifies the live stream; reports from older streams are ignored
    stream_id: u64,
}

impl AudioThread {
    fn run(mut self, command_rx: &Receiver<AudioCommand>) {
        while let Ok(command) = command_rx.recv() {
            match command {
                AudioCommand::Assign(source) => {
                    // a new source may need a different stream format
                    self.close_stream();
                    self.source = Some(source);
                    self.shared.set_state(DeviceState::Stopped);
                }
                AudioCommand::Clear => {
                    self.close_stream();
                    self.source = None;
                    self.shared.set_state(DeviceState::Stopped);
                }
                AudioCommand::Start(reply) => {
                    let _ = reply.send(self.start());
                }
                AudioCommand::Pause(reply) => {
                    let _ = reply.send(self.pause());
                }
                AudioCommand::Stop => {
                    if self.shared.state() != DeviceState::Stopped {
                        self.stop(StopReason::Requested);
                    }
                }
                AudioCommand::Drained(id) => {
                    if id == self.stream_id && self.shared.state() == DeviceState::Playing {
                        tracing::debug!("Output source drained");
                        self.stop(StopReason::EndOfStream);
                    }
                }
                AudioCommand::Failed(id, message) => {
                    if id == self.stream_id && self.stream.is_some() {
                        tracing::error!(error = %message, "Output stream failed");
                        self.stop(StopReason::Failed(message));
                    }
                }
                AudioCommand::Shutdown => {
                    self.close_stream();
                    break;
                }
            }
        }
        tracing::debug!("Audio output thread exiting");
    }

    fn start(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let source = self
                .source
                .clone()
                .ok_or_else(|| DeviceError::Config("No source assigned".to_string()))?;
            self.stream = Some(self.open_stream(source)?);
        }
        if let Some(stream) = &self.stream {
            stream.play()?;
        }
        self.shared.set_state(DeviceState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.pause()?;
            self.shared.set_state(DeviceState::Paused);
        }
        Ok(())
    }

    /// Drop the stream, then tell the player
    fn stop(&mut self, reason: StopReason) {
        self.close_stream();
        self.shared.set_state(DeviceState::Stopped);
        self.shared.notify_stopped(reason);
    }

    fn close_stream(&mut self) {
        // dropping a cpal stream waits for its callback to return
        self.stream = None;
        self.stream_id += 1;
    }

    fn open_stream(&mut self, source: Arc<dyn OutputSource>) -> Result<Stream> {
        let Negotiated {
            config,
            format,
            latency,
        } = negotiate_for_device(&self.device, source.format(), &self.config)?;

        tracing::info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            format = ?format,
            latency_ms = latency.total_ms,
            "Building output stream"
        );
        *self
            .shared
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(latency);

        let id = self.stream_id;
        match format {
            SampleFormat::F32 => self.build::<f32>(&config, source, id),
            SampleFormat::F64 => self.build::<f64>(&config, source, id),
            SampleFormat::I16 => self.build::<i16>(&config, source, id),
            SampleFormat::I32 => self.build::<i32>(&config, source, id),
            SampleFormat::U16 => self.build::<u16>(&config, source, id),
            other => Err(DeviceError::Config(format!(
                "Unsupported sample format: {:?}",
                other
            ))),
        }
    }

    fn build<T>(
        &self,
        config: &cpal::StreamConfig,
        source: Arc<dyn OutputSource>,
        id: u64,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = usize::from(config.channels);
        let drained_tx = self.command_tx.clone();
        let error_tx = self.command_tx.clone();
        let mut scratch = Vec::new();
        let mut drained = false;

        let stream = self.device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = render(data, channels, source.as_ref(), &mut scratch);
                if frames == 0 && !drained {
                    drained = true;
                    let _ = drained_tx.send(AudioCommand::Drained(id));
                }
            },
            move |err| {
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    let _ = error_tx.send(AudioCommand::Failed(id, err.to_string()));
                } else {
                    tracing::warn!(error = %err, "Output stream error");
                }
            },
            None,
        )?;
        Ok(stream)
    }
}
