//! Audio Stream Module
//!
//! This module handles CPAL output streams for the [`CpalBackend`]:
//! - Device resolution and stream configuration
//! - Decoding the pad asset to the device format
//! - The render callback and end-of-data detection
//! - Tearing streams down off the audio thread
//!
//! Each stream lives on its own owner thread. The audio callback never drops
//! the stream; it only signals the owner, which releases the device and then
//! reports completion.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};

use crate::audio_engine::devices::{device_name, find_output_device};
use crate::audio_engine::sample_loader::decode_audio_file_to_sample_buffer;
use crate::audio_engine::voice::Voice;
use crate::audio_engine::{
    CompletionNotifier, OutputBackend, OutputStream, PlaybackError, StreamRequest,
};

const DEFAULT_DEVICE_LABEL: &str = "default";

enum StreamSignal {
    /// Stopped by the engine; no completion is reported.
    Stop,
    /// The voice rendered its last frame.
    Drained,
}

/// Output backend on the default CPAL host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OutputBackend for CpalBackend {
    fn open(
        &self,
        request: StreamRequest,
        on_finished: CompletionNotifier,
    ) -> Result<Box<dyn OutputStream>, PlaybackError> {
        let (signal_tx, signal_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let drained_tx = signal_tx.clone();
        let device_label = request
            .device
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE_LABEL.to_string());

        let thread_handle = thread::Builder::new()
            .name(format!("pad-stream-{}", request.id.0))
            .spawn(move || {
                let stream = match start_stream(&request, drained_tx) {
                    Ok(stream) => {
                        ready_tx.send(Ok(())).ok();
                        stream
                    }
                    Err(err) => {
                        ready_tx.send(Err(err)).ok();
                        return;
                    }
                };
                own_stream(stream, signal_rx, on_finished);
            })
            .map_err(PlaybackError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(StreamHandle {
                signal_tx,
                thread_handle: Some(thread_handle),
            })),
            Ok(Err(err)) => {
                thread_handle.join().ok();
                Err(err)
            }
            Err(_) => {
                thread_handle.join().ok();
                Err(PlaybackError::DeviceOpen {
                    device: device_label,
                    reason: "stream thread exited during setup".to_string(),
                })
            }
        }
    }
}

/// Holds the stream until it is stopped or drained, then drops it here on the
/// owner thread.
fn own_stream(stream: Stream, signals: Receiver<StreamSignal>, on_finished: CompletionNotifier) {
    let signal = signals.recv();
    if let Err(err) = stream.pause() {
        log::debug!("Failed to pause stream: {}", err);
    }
    drop(stream);

    if let Ok(StreamSignal::Drained) = signal {
        on_finished();
    }
}

fn resolve_device(host: &cpal::Host, id: Option<&str>) -> Option<cpal::Device> {
    if let Some(id) = id {
        if let Some(device) = find_output_device(host, id) {
            return Some(device);
        }
        log::warn!("Output device {:?} not found, using the system default", id);
    }
    host.default_output_device()
}

/// Opens the device, decodes the asset for it and starts playback.
fn start_stream(request: &StreamRequest, drained: Sender<StreamSignal>) -> Result<Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = resolve_device(&host, request.device.as_deref()).ok_or_else(|| {
        PlaybackError::DeviceOpen {
            device: request
                .device
                .clone()
                .unwrap_or_else(|| DEFAULT_DEVICE_LABEL.to_string()),
            reason: "no output device available".to_string(),
        }
    })?;
    let device_label = device_name(&device).unwrap_or_else(|| DEFAULT_DEVICE_LABEL.to_string());
    let open_err = |reason: String| PlaybackError::DeviceOpen {
        device: device_label.clone(),
        reason,
    };

    let config = device
        .default_output_config()
        .map_err(|e| open_err(e.to_string()))?;
    let sample_rate = config.sample_rate();
    let channels = config.channels();

    let sample = decode_audio_file_to_sample_buffer(&request.path, channels as usize, sample_rate)
        .map_err(|source| PlaybackError::Decode {
            path: request.path.display().to_string(),
            source,
        })?;
    let mut voice = Voice::new(request.id, sample, request.gain);

    log::debug!(
        "Stream {} on {} ({} ch@{} Hz, {} frames)",
        voice.stream_id,
        device_label,
        channels,
        sample_rate,
        voice.frames()
    );

    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: BufferSize::Default,
    };

    let id = request.id;
    let mut drained = Some(drained);
    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if voice.render(data) {
                    if let Some(tx) = drained.take() {
                        tx.send(StreamSignal::Drained).ok();
                    }
                }
            },
            move |err| {
                log::error!("Audio stream {} error: {}", id, err);
            },
            None,
        )
        .map_err(|e| open_err(e.to_string()))?;

    stream.play().map_err(|e| open_err(e.to_string()))?;
    Ok(stream)
}

/// Engine-side handle; stopping blocks until the device is released.
struct StreamHandle {
    signal_tx: Sender<StreamSignal>,
    thread_handle: Option<JoinHandle<()>>,
}

impl OutputStream for StreamHandle {
    fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // Fails once the owner already exited after draining.
            self.signal_tx.send(StreamSignal::Stop).ok();
            if handle.join().is_err() {
                log::error!("Stream owner thread panicked");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_engine::StreamId;
    use crate::audio_engine::sample_loader::tests::write_pcm16_wav;
    use std::path::PathBuf;

    #[test]
    fn test_missing_device_falls_back_to_default() {
        let host = cpal::default_host();
        let default = host.default_output_device().and_then(|d| device_name(&d));
        let resolved = resolve_device(&host, Some("No Such Device 1234")).and_then(|d| device_name(&d));
        assert_eq!(resolved, default);
    }

    #[test]
    fn test_open_and_stop_twice() {
        // This is a smoke test; actual playback requires audio hardware
        if cpal::default_host().default_output_device().is_none() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blip.wav");
        write_pcm16_wav(&path, 1, 44_100, &[0i16; 441]).unwrap();

        let (tx, rx) = mpsc::channel();
        let request = StreamRequest {
            id: StreamId(1),
            path: PathBuf::from(&path),
            gain: 0.0,
            device: None,
        };
        let result = CpalBackend::new().open(request, Box::new(move || {
            tx.send(()).ok();
        }));

        match result {
            Ok(mut stream) => {
                // Virtual devices may never pull data, so only a bounded wait.
                let _ = rx.recv_timeout(std::time::Duration::from_secs(2));
                stream.stop();
                stream.stop();
            }
            Err(err) => assert!(matches!(
                err,
                PlaybackError::DeviceOpen { .. } | PlaybackError::Decode { .. }
            )),
        }
    }
}
