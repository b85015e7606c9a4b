//! Output device enumeration and selection.
//!
//! Devices are identified by their host name. The registry keeps the list in
//! host order so operators can pick by index; an unknown id falls back to the
//! system default.

use cpal::traits::{DeviceTrait, HostTrait};

/// One selectable output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    pub id: String,
    pub name: String,
}

#[allow(deprecated)]
pub(crate) fn device_name(device: &cpal::Device) -> Option<String> {
    device.name().ok()
}

/// Finds the output device named `id` on `host`.
pub(crate) fn find_output_device(host: &cpal::Host, id: &str) -> Option<cpal::Device> {
    match host.output_devices() {
        Ok(mut devices) => devices.find(|d| device_name(d).is_some_and(|name| name == id)),
        Err(err) => {
            log::warn!("Failed to enumerate output devices: {}", err);
            None
        }
    }
}

/// Known output devices plus the current selection.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<OutputDevice>,
    selected: Option<String>,
    from_host: bool,
}

impl DeviceRegistry {
    /// Lists the default host's output devices.
    ///
    /// An enumeration failure yields an empty registry; playback then uses
    /// the system default.
    pub fn enumerate() -> Self {
        Self {
            devices: Self::query_host(),
            selected: None,
            from_host: true,
        }
    }

    /// A fixed device list, not tied to an audio host.
    pub fn from_devices(devices: Vec<OutputDevice>) -> Self {
        Self {
            devices,
            selected: None,
            from_host: false,
        }
    }

    fn query_host() -> Vec<OutputDevice> {
        let host = cpal::default_host();
        match host.output_devices() {
            Ok(devices) => devices
                .filter_map(|device| device_name(&device))
                .map(|name| OutputDevice {
                    id: name.clone(),
                    name,
                })
                .collect(),
            Err(err) => {
                log::warn!("Failed to enumerate output devices: {}", err);
                Vec::new()
            }
        }
    }

    /// Re-queries the host. The selection is kept only if the device is
    /// still present.
    pub fn refresh(&mut self) {
        if !self.from_host {
            return;
        }
        self.devices = Self::query_host();
        if let Some(id) = self.selected.take() {
            self.select_id(&id);
        }
    }

    pub fn devices(&self) -> &[OutputDevice] {
        &self.devices
    }

    /// Selected device id; `None` means the system default.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects the device at `index`. Out of range leaves the selection
    /// unchanged and returns `None`.
    pub fn select_index(&mut self, index: usize) -> Option<&OutputDevice> {
        let device = self.devices.get(index)?;
        self.selected = Some(device.id.clone());
        Some(device)
    }

    /// Selects by id, case-insensitively. An unknown id selects the system
    /// default and returns `None`.
    pub fn select_id(&mut self, id: &str) -> Option<&OutputDevice> {
        let found = self
            .devices
            .iter()
            .find(|device| device.id.eq_ignore_ascii_case(id));
        self.selected = found.map(|device| device.id.clone());
        found
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::from_devices(
            ["Speakers", "Headphones", "CABLE Input"]
                .into_iter()
                .map(|name| OutputDevice {
                    id: name.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_select_index() {
        let mut registry = registry();
        assert_eq!(registry.selected(), None);

        let device = registry.select_index(1).map(|d| d.id.clone());
        assert_eq!(device.as_deref(), Some("Headphones"));
        assert_eq!(registry.selected(), Some("Headphones"));

        assert!(registry.select_index(9).is_none());
        assert_eq!(registry.selected(), Some("Headphones"));
    }

    #[test]
    fn test_select_id_is_case_insensitive() {
        let mut registry = registry();
        assert!(registry.select_id("cable input").is_some());
        assert_eq!(registry.selected(), Some("CABLE Input"));
    }

    #[test]
    fn test_unknown_id_falls_back_to_default() {
        let mut registry = registry();
        registry.select_index(0);

        assert!(registry.select_id("Unplugged USB").is_none());
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn test_clear_and_refresh_without_host() {
        let mut registry = registry();
        registry.select_index(2);
        registry.refresh();
        assert_eq!(registry.selected(), Some("CABLE Input"));
        assert_eq!(registry.devices().len(), 3);

        registry.clear();
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn test_enumerate_does_not_panic() {
        // Headless machines simply report no devices.
        let registry = DeviceRegistry::enumerate();
        assert_eq!(registry.selected(), None);
    }
}
