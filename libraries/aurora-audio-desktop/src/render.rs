//! Fills cpal output buffers from an [`OutputSource`]

use aurora_audio::OutputSource;
use cpal::{FromSample, Sample};

/// Fill `output` (interleaved, `device_channels` per frame) from `source`
///
/// Source frames are mapped onto the device layout: mono is duplicated,
/// stereo into mono is averaged, anything else copies the shared channels
/// and leaves the rest silent. Whatever the source cannot fill is silence.
///
/// Returns the number of frames that carried source audio; `0` means the
/// source has ended.
pub(crate) fn render<T>(
    output: &mut [T],
    device_channels: usize,
    source: &dyn OutputSource,
    scratch: &mut Vec<f32>,
) -> usize
where
    T: Sample + FromSample<f32>,
{
    let source_channels = usize::from(source.format().channels);
    if device_channels == 0 || source_channels == 0 {
        output.fill(T::EQUILIBRIUM);
        return 0;
    }

    let frames = output.len() / device_channels;
    scratch.resize(frames * source_channels, 0.0);
    let pulled = source.pull(&mut scratch[..frames * source_channels]);
    let filled = pulled / source_channels;

    for (out, input) in output
        .chunks_exact_mut(device_channels)
        .zip(scratch.chunks_exact(source_channels))
        .take(filled)
    {
        map_frame(input, out);
    }
    output[filled * device_channels..].fill(T::EQUILIBRIUM);

    filled
}

fn map_frame<T>(input: &[f32], out: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    match (input.len(), out.len()) {
        (a, b) if a == b => {
            for (o, &s) in out.iter_mut().zip(input) {
                *o = T::from_sample(s);
            }
        }
        (1, _) => out.fill(T::from_sample(input[0])),
        (2, 1) => out[0] = T::from_sample((input[0] + input[1]) * 0.5),
        _ => {
            let shared = input.len().min(out.len());
            for (o, &s) in out[..shared].iter_mut().zip(&input[..shared]) {
                *o = T::from_sample(s);
            }
            out[shared..].fill(T::EQUILIBRIUM);
        }
    }
}
