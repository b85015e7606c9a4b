//! Audio Engine Module
//!
//! This module starts, tracks and tears down the output streams pads play on.
//! It is organized into sub-modules, each with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL output streams, one owner thread per stream
//! - [`channels`]: Channel layout conversion
//! - [`constants`]: Configuration constants and limits
//! - [`devices`]: Output device enumeration and selection
//! - [`errors`]: Audio-specific error types
//! - [`resampler`]: Sample rate conversion
//! - [`sample_loader`]: Audio file loading and decoding
//! - [`voice`]: Per-stream playback state
//!
//! The main [`PlaybackEngine`] struct applies a pad's [`Policy`] when it is
//! triggered: exclusive pads own at most one stream per slot, overlapping pads
//! stack an unbounded number of streams.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::audio_engine::constants::{VOLUME_MAX, VOLUME_MIN};
use crate::config::{Pad, Policy};
use crate::messages::ControllerEvent;

pub mod audio_stream;
mod channels;
pub mod constants;
pub mod devices;
mod errors;
mod resampler;
mod sample_loader;
mod voice;

#[cfg(test)]
pub(crate) mod test_support;

pub use audio_stream::CpalBackend;
pub use devices::{DeviceRegistry, OutputDevice};
pub use errors::{PlaybackError, SampleLoadError};

/// Instance identity of one active stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a backend needs to open one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub id: StreamId,
    pub path: PathBuf,
    pub gain: f32,
    /// Selected device id; `None` means the system default.
    pub device: Option<String>,
}

/// Invoked once, from any thread, when a stream plays to its end.
///
/// Not invoked when the stream is stopped.
pub type CompletionNotifier = Box<dyn FnOnce() + Send + 'static>;

/// A started output stream.
pub trait OutputStream: Send {
    /// Stops playback and releases the device resources. Must tolerate
    /// being called after the stream already ended, and more than once.
    fn stop(&mut self);
}

/// Opens output streams. The seam between the engine and the audio host.
pub trait OutputBackend: Send + Sync {
    fn open(
        &self,
        request: StreamRequest,
        on_finished: CompletionNotifier,
    ) -> Result<Box<dyn OutputStream>, PlaybackError>;
}

struct ActiveStream {
    id: StreamId,
    slot: usize,
    output: Box<dyn OutputStream>,
}

impl ActiveStream {
    fn release(mut self) {
        self.output.stop();
    }
}

/// Exclusive streams keyed by slot, overlapping streams keyed by id.
#[derive(Default)]
struct ActiveStreams {
    exclusive: HashMap<usize, ActiveStream>,
    overlapping: HashMap<StreamId, ActiveStream>,
}

/// Effective stream gain: master × pad volume, clamped to [0, 1].
///
/// A pad volume of zero or less means "unset" and counts as full volume.
pub fn effective_gain(master_gain: f32, pad_volume: f32) -> f32 {
    let pad = if pad_volume.is_finite() && pad_volume > VOLUME_MIN {
        pad_volume.min(VOLUME_MAX)
    } else {
        VOLUME_MAX
    };
    let master = if master_gain.is_finite() {
        master_gain
    } else {
        VOLUME_MIN
    };
    (master * pad).clamp(VOLUME_MIN, VOLUME_MAX)
}

/// Owns every active output stream.
pub struct PlaybackEngine {
    backend: Box<dyn OutputBackend>,
    streams: Mutex<ActiveStreams>,
    next_id: AtomicU64,
    device: Mutex<Option<String>>,
    asset_root: Option<PathBuf>,
    events: Sender<ControllerEvent>,
}

impl PlaybackEngine {
    /// `events` receives a [`ControllerEvent::StreamFinished`] for every
    /// stream that plays to its end.
    pub fn new(backend: Box<dyn OutputBackend>, events: Sender<ControllerEvent>) -> Self {
        Self {
            backend,
            streams: Mutex::new(ActiveStreams::default()),
            next_id: AtomicU64::new(0),
            device: Mutex::new(None),
            asset_root: None,
            events,
        }
    }

    /// Relative pad paths are resolved against `root`.
    pub fn with_asset_root(mut self, root: Option<&Path>) -> Self {
        self.asset_root = root.map(Path::to_path_buf);
        self
    }

    /// Takes effect on the next `play`; running streams are left alone.
    pub fn select_device(&self, device: Option<String>) {
        *self.device.lock().unwrap_or_else(PoisonError::into_inner) = device;
    }

    pub fn selected_device(&self) -> Option<String> {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_streams(&self) -> MutexGuard<'_, ActiveStreams> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts `pad` on `slot` under the pad's policy.
    pub fn play(&self, pad: &Pad, slot: usize, master_gain: f32) -> Result<StreamId, PlaybackError> {
        let path = pad
            .resolve_file(self.asset_root.as_deref())
            .filter(|path| path.is_file())
            .ok_or_else(|| PlaybackError::MissingAsset {
                path: pad.file_path.clone(),
            })?;

        let id = StreamId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let request = StreamRequest {
            id,
            path,
            gain: effective_gain(master_gain, pad.volume),
            device: self.selected_device(),
        };

        log::debug!(
            "Slot {} -> stream {} ({}, gain {:.2})",
            slot,
            id,
            pad.policy.as_mode(),
            request.gain
        );

        match pad.policy {
            Policy::Exclusive => self.play_exclusive(slot, request),
            Policy::Overlapping => self.play_overlapping(slot, request),
        }
    }

    fn play_exclusive(&self, slot: usize, request: StreamRequest) -> Result<StreamId, PlaybackError> {
        let id = request.id;
        let mut streams = self.lock_streams();

        // The previous stream is fully released before the new one registers.
        if let Some(previous) = streams.exclusive.remove(&slot) {
            log::debug!("Preempting stream {} on slot {}", previous.id, slot);
            previous.release();
        }

        let output = self.backend.open(request, self.completion(slot, id))?;
        streams
            .exclusive
            .insert(slot, ActiveStream { id, slot, output });
        Ok(id)
    }

    fn play_overlapping(&self, slot: usize, request: StreamRequest) -> Result<StreamId, PlaybackError> {
        let id = request.id;
        let output = self.backend.open(request, self.completion(slot, id))?;
        self.lock_streams()
            .overlapping
            .insert(id, ActiveStream { id, slot, output });
        Ok(id)
    }

    fn completion(&self, slot: usize, id: StreamId) -> CompletionNotifier {
        let events = self.events.clone();
        Box::new(move || {
            events
                .send(ControllerEvent::StreamFinished { slot, id })
                .ok();
        })
    }

    /// Handles a natural end of stream `id` started from `slot`.
    ///
    /// The exclusive registration is only removed if it still belongs to `id`;
    /// a stale completion for a preempted stream is a no-op. Returns whether
    /// anything was released.
    pub fn finish(&self, slot: usize, id: StreamId) -> bool {
        let finished = {
            let mut streams = self.lock_streams();
            match streams.exclusive.get(&slot) {
                Some(active) if active.id == id => streams.exclusive.remove(&slot),
                _ => streams.overlapping.remove(&id),
            }
        };

        match finished {
            Some(stream) => {
                log::debug!("Stream {} on slot {} finished", id, slot);
                stream.release();
                true
            }
            None => false,
        }
    }

    /// Stops the exclusive stream and every overlapping stream of `slot`.
    pub fn stop_slot(&self, slot: usize) {
        let stopped: Vec<ActiveStream> = {
            let mut streams = self.lock_streams();
            let ids: Vec<StreamId> = streams
                .overlapping
                .values()
                .filter(|s| s.slot == slot)
                .map(|s| s.id)
                .collect();
            let mut stopped: Vec<ActiveStream> = ids
                .iter()
                .filter_map(|id| streams.overlapping.remove(id))
                .collect();
            stopped.extend(streams.exclusive.remove(&slot));
            stopped
        };
        for stream in stopped {
            stream.release();
        }
    }

    /// Stops and releases every stream. Idempotent.
    pub fn stop_all(&self) {
        let ActiveStreams {
            exclusive,
            overlapping,
        } = std::mem::take(&mut *self.lock_streams());

        let count = exclusive.len() + overlapping.len();
        for stream in exclusive.into_values().chain(overlapping.into_values()) {
            stream.release();
        }
        if count > 0 {
            log::info!("Stopped {} stream(s)", count);
        }
    }

    /// Number of live streams, exclusive and overlapping.
    pub fn active_count(&self) -> usize {
        let streams = self.lock_streams();
        streams.exclusive.len() + streams.overlapping.len()
    }

    pub fn is_slot_active(&self, slot: usize) -> bool {
        let streams = self.lock_streams();
        streams.exclusive.contains_key(&slot) || streams.overlapping.values().any(|s| s.slot == slot)
    }

    /// Id of the exclusive stream registered for `slot`.
    pub fn exclusive_stream(&self, slot: usize) -> Option<StreamId> {
        self.lock_streams().exclusive.get(&slot).map(|s| s.id)
    }

    pub fn overlapping_count(&self) -> usize {
        self.lock_streams().overlapping.len()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}
