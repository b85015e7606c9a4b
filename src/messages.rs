//! Message definitions for communication with the controller's owning thread.
//!
//! Everything that happens off the controller thread (stream completion on a stream
//! owner thread, debounced file changes on the watcher thread, operator input on the
//! command reader) reaches the controller as a [`ControllerEvent`] over an `mpsc`
//! channel, so all shared state is mutated from one place.

use std::sync::Arc;

use crate::audio_engine::StreamId;
use crate::config::{GridSettings, Pad};

/// Decoded, device-ready audio for one stream.
#[derive(Debug, Clone)]
pub(crate) struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

/// Message delivered to the [`SoundboardController`](crate::controller::SoundboardController).
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The config file was edited by someone else (debounced).
    ExternalChange,

    /// A stream played to the end of its data.
    ///
    /// # Parameters
    /// * `slot` - Pad slot the stream was started from
    /// * `id` - Identity of the finished stream
    StreamFinished { slot: usize, id: StreamId },

    /// Operator pressed a pad.
    Trigger(usize),

    /// Operator pressed a key combination, e.g. `"Ctrl+1"`.
    KeyPressed(String),

    /// The pad editor submitted a full replacement for a slot.
    EditCommitted { slot: usize, pad: Pad },

    /// Master volume in percent (0 to 100).
    SetMasterVolume(f32),

    /// Select the output device at this index of the registry list.
    SelectDevice(usize),

    /// Ask the renderer to show the device list.
    ListDevices,

    /// Change grid dimensions and button styling.
    ApplyGrid(GridSettings),

    /// Stop every active stream.
    StopAll,

    /// Reload the config file on operator request.
    Reload,

    /// Leave the event loop and run the shutdown sequence.
    Shutdown,
}
