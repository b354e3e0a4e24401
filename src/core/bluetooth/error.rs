//! Error taxonomy for the BLE session layer.
//! Platform failures are normalized into these variants so callers can show
//! a stable message for each failure class instead of raw stack output.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BleError {
    /// Bluetooth exists but cannot be used right now (adapter off, or the
    /// environment forbids it).
    #[error("Bluetooth is not available on this system")]
    CapabilityUnavailable,

    /// The scan window closed without a matching device broadcasting.
    #[error("no matching device found; make sure the lamp is powered on and broadcasting")]
    NoDeviceFound,

    #[error("Bluetooth access denied")]
    PermissionDenied,

    /// The platform has no Bluetooth support at all.
    #[error("Bluetooth is not supported on this platform")]
    Unsupported,

    /// Device selection was abandoned before a device was picked.
    #[error("device selection was cancelled")]
    UserCancelled,

    /// The transport-level connect step failed. No session exists.
    #[error("failed to connect: {0}")]
    TransportConnectFailed(String),

    /// The (service, characteristic) pair is not in the active session's
    /// map, either because it never resolved or the session is gone.
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },

    /// Anything the taxonomy does not cover; the platform message is
    /// passed through verbatim.
    #[error("{0}")]
    Unknown(String),
}
