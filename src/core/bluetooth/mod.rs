//! Bluetooth functionality for the smart lamp bridge
//! This module owns device discovery, the GATT connection lifecycle, and
//! characteristic access, all behind an injected platform capability.

pub mod capability;
pub mod constants;
mod device;
mod error;
mod events;
mod manager;
mod platform;
mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export types that should be publicly accessible
pub use capability::{BleAdapter, BleCharacteristic, BleDevice, BleService, DeviceFilter};
pub use constants::*;
pub use device::{DeviceInfo, DiscoveredDevice};
pub use error::BleError;
pub use events::{ServiceSummary, SessionEvent};
pub use manager::SessionManager;
pub use platform::PlatformAdapter;
pub use session::{SessionStatus, Subscription};
