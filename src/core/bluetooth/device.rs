//! Discovered-device records shared between the session layer and the
//! presentation layer.

use std::sync::Arc;

use regex::Regex;

use crate::core::bluetooth::capability::BleDevice;

/// Represents a discovered Bluetooth device
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceInfo {
    /// Platform-specific unique identifier for the device (especially important on macOS)
    pub id: String,
    /// The name of the device, if available
    pub name: Option<String>,
    /// The address of the device (extracted from the id where the platform embeds one)
    pub address: Option<String>,
    /// The signal strength (RSSI) of the device at discovery time
    pub rssi: Option<i16>,
}

impl DeviceInfo {
    /// Name for display, falling back to the platform id.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// A device returned by discovery: the displayable record plus the opaque
/// platform handle the session layer connects through.
#[derive(Clone)]
pub struct DiscoveredDevice {
    pub info: DeviceInfo,
    pub handle: Arc<dyn BleDevice>,
}

/// Pulls a MAC address out of a platform device id, when one is embedded.
/// macOS ids are opaque UUIDs and yield `None`.
pub fn extract_mac_address(device_id: &str) -> Option<String> {
    let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").unwrap();
    re.find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase())
}
