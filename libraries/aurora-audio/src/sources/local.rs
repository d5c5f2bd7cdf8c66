//! Streaming decoder for local files
//!
//! Symphonia reads packets on demand; decoded audio is converted to
//! interleaved stereo `f32` whatever the file's sample format, then optionally
//! resampled with rubato so every track reaches the device at one rate.

use crate::error::{AudioError, Result};
use crate::source::{DecodedSource, SampleSource, StreamFormat};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::Time;

/// Output is always interleaved stereo
const CHANNELS: usize = 2;

/// Resampler input chunk, in seconds of source audio
const RESAMPLE_CHUNK_SECONDS: f64 = 0.1;

pub struct LocalSource {
    path: PathBuf,
    source_sample_rate: u32,
    output_sample_rate: u32,

    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,

    buffer: VecDeque<f32>,
    resampler: Option<SincFixedIn<f32>>,
    /// Decoded samples waiting for a full resampler chunk
    pending: Vec<f32>,

    samples_read: usize,
    total_duration: Duration,
    is_eof: bool,
}

impl LocalSource {
    /// Open `path` for streaming
    ///
    /// Only the container header is probed here; packets are decoded as the
    /// stream is read. `fallback_duration` is used when the container does not
    /// declare a frame count.
    pub fn open(
        path: impl AsRef<Path>,
        target_sample_rate: Option<u32>,
        fallback_duration: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(&path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;
        let format_reader = probed.format;

        let track = format_reader
            .default_track()
            .ok_or_else(|| AudioError::UnsupportedFormat("No audio tracks found".into()))?;

        let source_sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let output_sample_rate = target_sample_rate.unwrap_or(source_sample_rate);
        let track_id = track.id;
        let total_duration = track
            .codec_params
            .n_frames
            .map(|frames| Duration::from_secs_f64(frames as f64 / f64::from(source_sample_rate)))
            .unwrap_or(fallback_duration);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::UnsupportedFormat(format!("No decoder: {}", e)))?;

        let resampler = if source_sample_rate == output_sample_rate {
            None
        } else {
            Some(create_resampler(source_sample_rate, output_sample_rate)?)
        };

        tracing::debug!(
            path = %path.display(),
            source_sample_rate,
            output_sample_rate,
            duration_ms = total_duration.as_millis() as u64,
            "Opened local source"
        );

        Ok(Self {
            path,
            source_sample_rate,
            output_sample_rate,
            format_reader,
            decoder,
            track_id,
            buffer: VecDeque::with_capacity(output_sample_rate as usize * CHANNELS),
            resampler,
            pending: Vec::new(),
            samples_read: 0,
            total_duration,
            is_eof: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sample rate of the file itself
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Decode one packet into the buffer; `false` once the file is exhausted
    fn decode_next_packet(&mut self) -> Result<bool> {
        let packet = match self.format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(false);
            }
            Err(SymphoniaError::ResetRequired) => {
                self.finish()?;
                return Ok(false);
            }
            Err(e) => return Err(AudioError::Decode(format!("Error reading packet: {}", e))),
        };

        if packet.track_id() != self.track_id {
            return Ok(true);
        }

        let samples = match self.decoder.decode(&packet) {
            Ok(decoded) => to_interleaved_stereo(decoded),
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::warn!(path = %self.path.display(), "Skipping corrupt packet: {}", msg);
                return Ok(true);
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        if self.resampler.is_some() {
            self.pending.extend_from_slice(&samples);
            self.resample_pending(false)?;
        } else {
            self.buffer.extend(samples);
        }
        Ok(true)
    }

    fn finish(&mut self) -> Result<()> {
        self.is_eof = true;
        self.resample_pending(true)
    }

    /// Run every complete chunk of pending samples through the resampler
    ///
    /// With `flush`, the trailing partial chunk is processed too.
    fn resample_pending(&mut self, flush: bool) -> Result<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };

        loop {
            let chunk_frames = resampler.input_frames_next();
            let available = self.pending.len() / CHANNELS;

            if available >= chunk_frames {
                let input = deinterleave(&self.pending[..chunk_frames * CHANNELS]);
                let output = resampler
                    .process(&input, None)
                    .map_err(|e| AudioError::Resample(e.to_string()))?;
                interleave_into(&output, usize::MAX, &mut self.buffer);
                self.pending.drain(..chunk_frames * CHANNELS);
            } else if flush && available > 0 {
                let input = deinterleave(&self.pending[..available * CHANNELS]);
                let output = resampler
                    .process_partial(Some(input.as_slice()), None)
                    .map_err(|e| AudioError::Resample(e.to_string()))?;
                // the partial call pads with silence; keep only real audio
                let ratio =
                    f64::from(self.output_sample_rate) / f64::from(self.source_sample_rate);
                let keep = (available as f64 * ratio).round() as usize;
                interleave_into(&output, keep, &mut self.buffer);
                self.pending.clear();
                return Ok(());
            } else {
                return Ok(());
            }
        }
    }
}

impl SampleSource for LocalSource {
    fn read(&mut self, output: &mut [f32]) -> Result<usize> {
        while self.buffer.len() < output.len() && !self.is_eof {
            if !self.decode_next_packet()? {
                break;
            }
        }

        let count = self.buffer.len().min(output.len());
        for (dst, src) in output.iter_mut().zip(self.buffer.drain(..count)) {
            *dst = src;
        }
        output[count..].fill(0.0);
        self.samples_read += count;
        Ok(count)
    }

    fn format(&self) -> StreamFormat {
        StreamFormat::new(self.output_sample_rate, CHANNELS as u16)
    }
}

impl DecodedSource for LocalSource {
    fn position(&self) -> Duration {
        self.format().duration_of(self.samples_read)
    }

    fn set_position(&mut self, position: Duration) -> Result<()> {
        self.buffer.clear();
        self.pending.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.samples_read = self.format().samples_in(position);

        if position >= self.total_duration {
            self.is_eof = true;
            return Ok(());
        }

        let time = Time::new(position.as_secs(), f64::from(position.subsec_nanos()) / 1e9);
        self.format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| AudioError::Seek(e.to_string()))?;
        self.decoder.reset();
        self.is_eof = false;
        Ok(())
    }

    fn duration(&self) -> Duration {
        self.total_duration
    }
}

fn create_resampler(from: u32, to: u32) -> Result<SincFixedIn<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_frames = (f64::from(from) * RESAMPLE_CHUNK_SECONDS) as usize;

    SincFixedIn::<f32>::new(
        f64::from(to) / f64::from(from),
        2.0,
        params,
        chunk_frames.max(1),
        CHANNELS,
    )
    .map_err(|e| AudioError::Resample(e.to_string()))
}

fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
    let frames = samples.len() / CHANNELS;
    let mut planes = vec![Vec::with_capacity(frames); CHANNELS];
    for frame in samples.chunks_exact(CHANNELS) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

fn interleave_into(planes: &[Vec<f32>], max_frames: usize, out: &mut VecDeque<f32>) {
    let frames = planes.first().map_or(0, Vec::len).min(max_frames);
    for i in 0..frames {
        for plane in planes {
            out.push_back(plane[i]);
        }
    }
}

/// Interleave the first two channels as `f32`, duplicating mono
fn stereo_from<T, F>(buf: &AudioBuffer<T>, normalize: F) -> Vec<f32>
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let left = buf.chan(0);
    let right = if buf.spec().channels.count() > 1 {
        buf.chan(1)
    } else {
        left
    };

    let mut output = Vec::with_capacity(frames * CHANNELS);
    for (&l, &r) in left.iter().zip(right).take(frames) {
        output.push(normalize(l));
        output.push(normalize(r));
    }
    output
}

fn to_interleaved_stereo(decoded: AudioBufferRef<'_>) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => stereo_from(&buf, |s| s),
        AudioBufferRef::F64(buf) => stereo_from(&buf, |s| s as f32),
        AudioBufferRef::S8(buf) => stereo_from(&buf, |s| f32::from(s) / f32::from(i8::MAX)),
        AudioBufferRef::S16(buf) => stereo_from(&buf, |s| f32::from(s) / f32::from(i16::MAX)),
        AudioBufferRef::S24(buf) => stereo_from(&buf, |s| s.inner() as f32 / 8388607.0),
        AudioBufferRef::S32(buf) => stereo_from(&buf, |s| s as f32 / i32::MAX as f32),
        AudioBufferRef::U8(buf) => {
            stereo_from(&buf, |s| (f32::from(s) / f32::from(u8::MAX)) * 2.0 - 1.0)
        }
        AudioBufferRef::U16(buf) => {
            stereo_from(&buf, |s| (f32::from(s) / f32::from(u16::MAX)) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            stereo_from(&buf, |s| (s.inner() as f32 / 16777215.0) * 2.0 - 1.0)
        }
        AudioBufferRef::U32(buf) => {
            stereo_from(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
    }
}
