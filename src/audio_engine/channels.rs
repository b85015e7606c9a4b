use crate::audio_engine::errors::SampleLoadError;

/// Maps audio samples from one channel configuration to another.
///
/// Currently supports:
/// - Mono (1 channel) → N channels: duplicates the mono signal to every channel
/// - Stereo (2 channels) → Mono (1 channel): averages both channels
/// - Stereo (2 channels) → N > 2 channels: left/right on the first two, silence elsewhere
/// - Same channel count: no conversion needed
///
/// # Parameters
///
/// - `samples`: Interleaved audio samples to convert
/// - `file_channels`: Number of channels in the source audio
/// - `output_channels`: Number of channels for the output
///
/// # Returns
///
/// - `Ok(Vec<f32>)`: Samples with converted channel layout
/// - `Err(SampleLoadError)`: Unsupported channel mapping
pub fn map_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, SampleLoadError> {
    if file_channels == output_channels {
        return Ok(samples);
    }

    match (file_channels, output_channels) {
        // Mono → N: duplicate each sample
        (1, n) if n > 1 => {
            let mut out = Vec::with_capacity(samples.len() * n);
            for s in samples {
                out.extend(std::iter::repeat_n(s, n));
            }
            Ok(out)
        }
        // Stereo → Mono: average each frame
        (2, 1) => {
            let mut out = Vec::with_capacity(samples.len() / 2);
            for frame in samples.chunks_exact(2) {
                out.push((frame[0] + frame[1]) * 0.5);
            }
            Ok(out)
        }
        // Stereo → surround layouts: front pair only
        (2, n) if n > 2 => {
            let mut out = Vec::with_capacity(samples.len() / 2 * n);
            for frame in samples.chunks_exact(2) {
                out.push(frame[0]);
                out.push(frame[1]);
                out.extend(std::iter::repeat_n(0.0, n - 2));
            }
            Ok(out)
        }
        // Unsupported mapping
        _ => Err(SampleLoadError::UnsupportedChannels {
            file_channels,
            output_channels,
        }),
    }
}
