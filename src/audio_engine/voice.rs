//! Per-stream playback state.
//!
//! This module provides the [`Voice`] struct which represents the decoded pad
//! asset a single output stream is playing, with its current playback position.
//!
//! Each active stream owns exactly one voice, moved into the device callback.
//! The voice reports exhaustion so the stream owner can tear the stream down.

use crate::audio_engine::StreamId;
use crate::messages::SampleBuffer;

/// A single voice, representing a playing pad asset.
#[derive(Debug)]
pub(crate) struct Voice {
    /// Identity of the stream this voice belongs to.
    pub stream_id: StreamId,

    /// The sample buffer being played.
    pub sample: SampleBuffer,

    /// Current playback position in frames.
    pub frame_pos: usize,

    /// Gain applied to every sample (0.0 to 1.0).
    pub volume: f32,
}

impl Voice {
    /// Creates a new voice positioned at the first frame.
    pub fn new(stream_id: StreamId, sample: SampleBuffer, volume: f32) -> Self {
        Self {
            stream_id,
            sample,
            frame_pos: 0,
            volume,
        }
    }

    /// Total number of frames in the sample.
    pub fn frames(&self) -> usize {
        self.sample.samples.len() / self.sample.channels.max(1)
    }

    pub fn is_finished(&self) -> bool {
        self.frame_pos >= self.frames()
    }

    /// Fills `output` (interleaved, same channel count as the sample) with the
    /// next block, padding with silence past the end.
    ///
    /// Returns `true` once every frame has been rendered.
    pub fn render(&mut self, output: &mut [f32]) -> bool {
        let channels = self.sample.channels.max(1);
        let total = self.frames();

        for frame in output.chunks_mut(channels) {
            if self.frame_pos < total {
                let start = self.frame_pos * channels;
                for (ch, out) in frame.iter_mut().enumerate() {
                    *out = self.sample.samples[start + ch] * self.volume;
                }
                self.frame_pos += 1;
            } else {
                frame.fill(0.0);
            }
        }

        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn sample(channels: usize, data: Vec<f32>) -> SampleBuffer {
        SampleBuffer {
            channels,
            samples: Arc::from(data.into_boxed_slice()),
        }
    }

    #[test]
    fn test_voice_creation() {
        let voice = Voice::new(StreamId(42), sample(2, vec![0.0; 4]), 0.75);

        assert_eq!(voice.stream_id, StreamId(42));
        assert_eq!(voice.frame_pos, 0);
        assert_eq!(voice.frames(), 2);
        assert!((voice.volume - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_render_applies_gain() {
        let mut voice = Voice::new(StreamId(1), sample(1, vec![1.0, -1.0, 0.5]), 0.5);
        let mut out = [0.0f32; 2];

        let finished = voice.render(&mut out);

        assert!(!finished);
        assert_eq!(out, [0.5, -0.5]);
        assert_eq!(voice.frame_pos, 2);
    }

    #[test]
    fn test_render_pads_silence_and_reports_end() {
        let mut voice = Voice::new(StreamId(1), sample(2, vec![0.2, 0.4]), 1.0);
        let mut out = [9.0f32; 6];

        let finished = voice.render(&mut out);

        assert!(finished);
        assert_eq!(out, [0.2, 0.4, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_render_after_end_is_silent() {
        let mut voice = Voice::new(StreamId(3), sample(1, vec![0.3]), 1.0);
        let mut out = [0.0f32; 1];
        assert!(voice.render(&mut out));

        let mut again = [1.0f32; 4];
        assert!(voice.render(&mut again));
        assert!(again.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_empty_sample_is_finished_immediately() {
        let voice = Voice::new(StreamId(0), sample(2, Vec::new()), 1.0);
        assert!(voice.is_finished());
    }
}
