//! The platform Bluetooth capability, abstracted behind traits.
//! The session manager only ever talks to these; production wires in the
//! system BLE stack (`platform`), tests wire in fakes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::device::DiscoveredDevice;
use crate::core::bluetooth::error::BleError;

/// Criteria for selecting a device during discovery.
///
/// An empty `services` list means accept any broadcasting device.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Service UUIDs the device must advertise.
    pub services: Vec<Uuid>,
    /// Optional fragment the advertised device name must contain.
    pub name_fragment: Option<String>,
}

impl DeviceFilter {
    /// Whether a device with the given advertised name passes the name
    /// fragment, if one is set. A filter without a fragment accepts any
    /// name, including none.
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        match &self.name_fragment {
            Some(fragment) => name.map(|n| n.contains(fragment.as_str())).unwrap_or(false),
            None => true,
        }
    }
}

/// Entry point to the platform Bluetooth stack.
#[async_trait]
pub trait BleAdapter: Send + Sync {
    /// Whether Bluetooth can be used at all right now.
    async fn is_available(&self) -> bool;

    /// Request a device matching `filter`. Resolves with the first match,
    /// `BleError::NoDeviceFound` when the scan window closes empty, or
    /// `BleError::UserCancelled` when `cancel` fires first.
    async fn request_device(
        &self,
        filter: &DeviceFilter,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredDevice, BleError>;
}

/// A discovered peripheral the session layer can connect to.
#[async_trait]
pub trait BleDevice: Send + Sync {
    fn id(&self) -> String;
    fn name(&self) -> Option<String>;
    async fn is_connected(&self) -> bool;
    async fn connect(&self) -> Result<(), BleError>;
    async fn disconnect(&self) -> Result<(), BleError>;
    /// Resolve a primary service by UUID on a connected device.
    async fn primary_service(&self, uuid: Uuid) -> Result<Arc<dyn BleService>, BleError>;
}

/// A resolved GATT service.
#[async_trait]
pub trait BleService: Send + Sync {
    fn uuid(&self) -> Uuid;
    async fn characteristics(&self) -> Result<Vec<Arc<dyn BleCharacteristic>>, BleError>;
}

/// A resolved GATT characteristic.
#[async_trait]
pub trait BleCharacteristic: Send + Sync {
    fn uuid(&self) -> Uuid;
    async fn read(&self) -> Result<Vec<u8>, BleError>;
    async fn write(&self, payload: &[u8]) -> Result<(), BleError>;
    /// Start notifications, forwarding each value change into `sink` until
    /// the receiving side goes away.
    async fn start_notifications(
        &self,
        sink: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), BleError>;
    /// Stop notifications. Best-effort; the session layer logs failures
    /// instead of surfacing them.
    async fn stop_notifications(&self) -> Result<(), BleError>;
}
