//! Sample rate conversion using rubato.
//!
//! Pads are decoded once per trigger and converted to the rate of the output
//! device the stream is opened on.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::audio_engine::constants::RESAMPLE_CHUNK_FRAMES;
use crate::audio_engine::errors::SampleLoadError;

/// Resamples interleaved audio from `input_rate` to `output_rate`.
///
/// Returns a copy of the input when the rates already match.
pub fn resample(
    input: &[f32],
    channels: usize,
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<f32>, SampleLoadError> {
    if input_rate == output_rate || input.is_empty() || channels == 0 {
        return Ok(input.to_vec());
    }

    let ratio = f64::from(output_rate) / f64::from(input_rate);
    let planar = deinterleave(input, channels);
    let frames = planar[0].len();
    if frames == 0 {
        return Ok(Vec::new());
    }
    let chunk = RESAMPLE_CHUNK_FRAMES.min(frames);
    let expected = (frames as f64 * ratio).ceil() as usize;

    log::debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels)",
        frames,
        input_rate,
        output_rate,
        channels
    );

    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, chunk, channels)?;

    let mut planar_out: Vec<Vec<f32>> = vec![Vec::with_capacity(expected); channels];
    let mut pos = 0;
    while frames - pos >= chunk {
        let block: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..pos + chunk]).collect();
        append_planar(&mut planar_out, resampler.process(&block, None)?);
        pos += chunk;
    }
    if pos < frames {
        let block: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..]).collect();
        append_planar(
            &mut planar_out,
            resampler.process_partial(Some(block.as_slice()), None)?,
        );
    }
    append_planar(
        &mut planar_out,
        resampler.process_partial(None::<&[&[f32]]>, None)?,
    );

    // The interpolator lags its input; drop the lead-in so frame 0 lines up.
    let delay = resampler.output_delay();
    for channel in &mut planar_out {
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected);
    }

    Ok(interleave(&planar_out))
}

fn append_planar(target: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (channel, samples) in target.iter_mut().zip(block) {
        channel.extend_from_slice(&samples);
    }
}

/// Input:  [L, R, L, R, ...]
/// Output: [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut interleaved = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for channel in planar {
            interleaved.push(channel[frame]);
        }
    }
    interleaved
}
