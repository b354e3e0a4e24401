//! Events pushed to the presentation layer as the session changes.

use std::collections::HashMap;

use uuid::Uuid;

use crate::core::bluetooth::device::DeviceInfo;

/// What a connect resolved: service UUID to the UUIDs of its
/// characteristics. Handles stay inside the session; the presentation layer
/// addresses characteristics by UUID pair only.
pub type ServiceSummary = HashMap<Uuid, Vec<Uuid>>;

/// Session lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, serde::Serialize)]
pub enum SessionEvent {
    /// Discovery picked a device.
    DeviceSelected(DeviceInfo),
    /// The transport connection is up and services are resolved.
    Connected(DeviceInfo),
    /// The session ended, explicitly or because the link dropped.
    Disconnected,
    /// The services (possibly a subset of the filter) that resolved.
    ServicesDiscovered(ServiceSummary),
}
