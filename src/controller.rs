//! The soundboard controller: one owning thread for every state transition.
//!
//! Operator intents, debounced file changes and stream completions all arrive
//! as [`ControllerEvent`]s and are applied here, in order. The controller owns
//! the in-memory [`Configuration`]; every mutation goes out through
//! [`ConfigStore::save`] so the watcher's self-write suppression holds.

use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, Sender};

use crate::audio_engine::constants::MASTER_PERCENT_MAX;
use crate::audio_engine::{DeviceRegistry, OutputBackend, PlaybackEngine, StreamId};
use crate::config::{ConfigStore, Configuration, GridSettings, Hotkey, Loaded, Pad};
use crate::errors::SoundboardError;
use crate::messages::ControllerEvent;
use crate::view::{GridView, Renderer};
use crate::watcher::FileChangeWatcher;

pub struct SoundboardController<R: Renderer> {
    store: ConfigStore,
    config: Configuration,
    engine: PlaybackEngine,
    devices: DeviceRegistry,
    renderer: R,
    events: Sender<ControllerEvent>,
    watcher: Option<FileChangeWatcher>,
    master_gain: f32,
    shut_down: bool,
}

impl<R: Renderer> SoundboardController<R> {
    /// Loads the document, resolves its output device and renders the grid.
    ///
    /// Stream completions are delivered back through `events`.
    pub fn new(
        mut store: ConfigStore,
        backend: Box<dyn OutputBackend>,
        devices: DeviceRegistry,
        renderer: R,
        events: Sender<ControllerEvent>,
    ) -> Self {
        let Loaded { config, warning } = store.load();
        let engine =
            PlaybackEngine::new(backend, events.clone()).with_asset_root(store.base_dir());

        let mut controller = Self {
            store,
            config,
            engine,
            devices,
            renderer,
            events,
            watcher: None,
            master_gain: 1.0,
            shut_down: false,
        };

        if let Some(err) = warning {
            controller.report(err);
        }
        controller.sync_device();
        controller.render();
        controller
    }

    /// Starts reporting external edits of the config file. A setup failure is
    /// reported and leaves the soundboard usable without edit detection.
    pub fn start_watching(&mut self) {
        if self.watcher.is_some() {
            return;
        }
        match FileChangeWatcher::new(
            self.store.path(),
            self.store.suppression(),
            self.events.clone(),
        ) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(err) => self.report(err),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Applies one event. `Break` after shutdown.
    pub fn handle(&mut self, event: ControllerEvent) -> ControlFlow<()> {
        match event {
            ControllerEvent::ExternalChange => self.external_change(),
            ControllerEvent::StreamFinished { slot, id } => self.stream_finished(slot, id),
            ControllerEvent::Trigger(slot) => self.trigger(slot),
            ControllerEvent::KeyPressed(combo) => {
                if !self.key_pressed(&combo) {
                    log::debug!("No pad bound to {:?}", combo);
                }
            }
            ControllerEvent::EditCommitted { slot, pad } => self.commit_edit(slot, pad),
            ControllerEvent::SetMasterVolume(percent) => self.set_master_volume(percent),
            ControllerEvent::SelectDevice(index) => self.select_device(index),
            ControllerEvent::ListDevices => self.list_devices(),
            ControllerEvent::ApplyGrid(settings) => self.apply_grid(settings),
            ControllerEvent::StopAll => self.stop_all(),
            ControllerEvent::Reload => self.reload(),
            ControllerEvent::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Event loop; returns after a `Shutdown` event and the shutdown sequence.
    pub fn run(mut self, events: Receiver<ControllerEvent>) {
        for event in events.iter() {
            if self.handle(event).is_break() {
                return;
            }
        }
        self.shutdown();
    }

    /// Plays the pad at `slot` with the current master gain.
    pub fn trigger(&mut self, slot: usize) {
        let Some(pad) = self.config.pads.get(slot) else {
            log::warn!("No pad at slot {}", slot);
            return;
        };
        if let Err(err) = self.engine.play(pad, slot, self.master_gain) {
            self.report(err.into());
        }
    }

    /// Triggers the first pad, in grid order, bound to `combo`.
    ///
    /// Returns whether the key was handled.
    pub fn key_pressed(&mut self, combo: &str) -> bool {
        let Some(pressed) = Hotkey::parse(combo) else {
            return false;
        };
        let slot = self
            .config
            .pads
            .iter()
            .position(|pad| pad.parsed_hotkey().as_ref() == Some(&pressed));

        match slot {
            Some(slot) => {
                log::debug!("{} -> slot {}", pressed, slot);
                self.trigger(slot);
                true
            }
            None => false,
        }
    }

    /// Replaces the pad at `slot` with `pad`, saves and re-renders.
    pub fn commit_edit(&mut self, slot: usize, mut pad: Pad) {
        let Some(target) = self.config.pads.get_mut(slot) else {
            log::warn!("Edit for slot {} outside the grid ignored", slot);
            return;
        };
        pad.normalize();
        *target = pad;
        self.persist();
        self.render();
    }

    pub fn apply_grid(&mut self, settings: GridSettings) {
        self.config.apply_grid(settings);
        log::info!(
            "Grid set to {}x{} (font {}, padding {})",
            self.config.grid_rows,
            self.config.grid_cols,
            self.config.button_font_size,
            self.config.button_padding
        );
        self.persist();
        self.render();
    }

    /// `percent` is clamped to 0..=100. Applies to the next trigger.
    pub fn set_master_volume(&mut self, percent: f32) {
        if !percent.is_finite() {
            log::warn!("Ignoring master volume {}", percent);
            return;
        }
        self.master_gain = percent.clamp(0.0, MASTER_PERCENT_MAX) / MASTER_PERCENT_MAX;
        log::info!("Master volume {:.0}%", self.master_gain * MASTER_PERCENT_MAX);
    }

    /// Selects the device at `index` of the registry list and persists its id.
    pub fn select_device(&mut self, index: usize) {
        let Some(device) = self.devices.select_index(index).cloned() else {
            self.report(SoundboardError::DeviceOpen {
                device: format!("#{index}"),
                reason: "no output device at this position".to_string(),
            });
            return;
        };
        log::info!("Output device set to {}", device.name);

        self.engine.select_device(Some(device.id.clone()));
        self.config.selected_output_device_id = Some(device.id);
        self.persist();
    }

    pub fn list_devices(&mut self) {
        self.devices.refresh();
        self.renderer
            .show_devices(self.devices.devices(), self.devices.selected());
    }

    /// Rereads the document from disk. On failure the last known good
    /// document stays in effect.
    pub fn reload(&mut self) {
        let Loaded { config, warning } = self.store.load();
        if let Some(err) = warning {
            self.report(err);
        }

        let device_changed = !same_device(
            config.selected_output_device_id.as_deref(),
            self.devices.selected(),
        );
        self.config = config;
        if device_changed {
            self.sync_device();
        }
        self.render();
    }

    /// A debounced change notification from the watcher.
    pub fn external_change(&mut self) {
        // The window may have been re-armed while the event was queued.
        if self.store.is_suppressed() {
            log::debug!("Ignoring change notification during own write");
            return;
        }
        log::info!("{} changed on disk, reloading", self.store.path().display());
        self.reload();
    }

    pub fn stream_finished(&mut self, slot: usize, id: StreamId) {
        if !self.engine.finish(slot, id) {
            log::debug!("Completion of stream {} on slot {} already handled", id, slot);
        }
    }

    pub fn stop_all(&mut self) {
        self.engine.stop_all();
    }

    /// Stops every stream, releases the watcher and the device list.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.engine.stop_all();
        if let Some(mut watcher) = self.watcher.take() {
            watcher.shutdown();
        }
        self.devices = DeviceRegistry::default();
        log::info!("Soundboard shut down");
    }

    /// Points the engine at the document's device, falling back to the
    /// system default when it is unset or no longer present.
    fn sync_device(&mut self) {
        match self.config.selected_output_device_id.as_deref() {
            Some(id) => {
                if self.devices.select_id(id).is_none() {
                    log::warn!("Output device {:?} not found, using the system default", id);
                }
            }
            None => self.devices.clear(),
        }
        self.engine
            .select_device(self.devices.selected().map(str::to_string));
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.config) {
            self.report(err);
        }
    }

    fn render(&mut self) {
        let view = GridView::from_config(&self.config);
        self.renderer.render(&view);
    }

    fn report(&mut self, err: SoundboardError) {
        log::warn!("{err}");
        self.renderer.warn(&err);
    }
}

impl<R: Renderer> Drop for SoundboardController<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn same_device(document: Option<&str>, selected: Option<&str>) -> bool {
    match (document, selected) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}
