//! Session manager for the smart lamp bridge
//! This module provides the main interface for bluetooth operations:
//! discovery, the connection lifecycle, and characteristic access against
//! the one active device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::capability::{BleAdapter, BleCharacteristic, BleDevice, DeviceFilter};
use crate::core::bluetooth::device::{DeviceInfo, DiscoveredDevice};
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::events::SessionEvent;
use crate::core::bluetooth::session::{ActiveSession, SessionStatus, Subscription};

/// Manages the single BLE session against an injected platform capability.
///
/// At most one session is active at a time: a new connect or discovery
/// tears down the previous session first.
pub struct SessionManager {
    adapter: Arc<dyn BleAdapter>,
    filter: DeviceFilter,
    status: Mutex<SessionStatus>,
    /// Every device discovery has ever returned, deduplicated by id.
    /// Informational; never consulted to skip a re-discovery.
    known_devices: Mutex<Vec<DeviceInfo>>,
    /// Platform handles for discovered devices, addressable by id.
    handles: Mutex<HashMap<String, Arc<dyn BleDevice>>>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    discovery_cancel: Mutex<CancellationToken>,
    /// Most recent write/read/subscribe failure, for callers that get a
    /// boolean or `None` back and want the reason.
    last_error: Mutex<Option<String>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        adapter: Arc<dyn BleAdapter>,
        filter: DeviceFilter,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            adapter,
            filter,
            status: Mutex::new(SessionStatus::Idle),
            known_devices: Mutex::new(Vec::new()),
            handles: Mutex::new(HashMap::new()),
            session: tokio::sync::Mutex::new(None),
            discovery_cancel: Mutex::new(CancellationToken::new()),
            last_error: Mutex::new(None),
            events,
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap()
    }

    /// Every device discovery has returned so far, in discovery order.
    pub fn known_devices(&self) -> Vec<DeviceInfo> {
        self.known_devices.lock().unwrap().clone()
    }

    /// The most recent recorded write/read/subscribe failure.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Cancel an in-flight discovery, if any. The pending `discover` call
    /// resolves with `BleError::UserCancelled`.
    pub fn cancel_discovery(&self) {
        self.discovery_cancel.lock().unwrap().cancel();
    }

    /// Request a device matching the configured filter.
    ///
    /// Fails fast with `CapabilityUnavailable` before any platform call
    /// when Bluetooth is unusable. On success the device is remembered and
    /// becomes connectable through [`SessionManager::connect`].
    pub async fn discover(&self) -> Result<DeviceInfo, BleError> {
        if !self.adapter.is_available().await {
            return Err(BleError::CapabilityUnavailable);
        }
        self.clear_error();

        // A fresh discovery supersedes whatever session is still open.
        let superseding = { self.session.lock().await.is_some() };
        if superseding {
            info!("new discovery requested, closing the previous session");
            self.disconnect().await;
        }

        let cancel = {
            let mut guard = self.discovery_cancel.lock().unwrap();
            *guard = CancellationToken::new();
            guard.clone()
        };

        self.set_status(SessionStatus::Discovering);
        info!(
            "starting device discovery ({} service filter(s))",
            self.filter.services.len()
        );
        match self.adapter.request_device(&self.filter, &cancel).await {
            Ok(found) => {
                self.remember(&found);
                self.set_status(SessionStatus::DeviceSelected);
                self.emit(SessionEvent::DeviceSelected(found.info.clone()));
                info!("device selected: {}", found.info.display_name());
                Ok(found.info)
            }
            Err(err) => {
                self.set_status(SessionStatus::Idle);
                Err(err)
            }
        }
    }

    /// Connect to a previously discovered device and resolve the filter's
    /// services in order.
    ///
    /// Only the transport connect can fail the operation as a whole; a
    /// service that does not resolve is logged and skipped, and the session
    /// maps whatever subset did resolve.
    pub async fn connect(&self, device_id: &str) -> Result<(), BleError> {
        let device = self
            .handles
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or_else(|| BleError::Unknown(format!("no discovered device with id {device_id}")))?;

        let superseding = { self.session.lock().await.is_some() };
        if superseding {
            info!("closing the previous session before connecting to {device_id}");
            self.disconnect().await;
        }

        self.set_status(SessionStatus::Connecting);
        if let Err(err) = device.connect().await {
            self.set_status(SessionStatus::Idle);
            return Err(BleError::TransportConnectFailed(err.to_string()));
        }
        self.set_status(SessionStatus::Connected);

        let mut characteristics = HashMap::new();
        for service_uuid in &self.filter.services {
            match Self::resolve_service(device.as_ref(), *service_uuid).await {
                Ok(chars) => {
                    debug!("service {service_uuid} resolved with {} characteristic(s)", chars.len());
                    characteristics.insert(*service_uuid, chars);
                }
                Err(err) => warn!("service {service_uuid} not resolved, skipping: {err}"),
            }
        }

        let session = ActiveSession {
            device: device.clone(),
            characteristics,
        };
        let summary = session.summary();
        {
            *self.session.lock().await = Some(session);
        }
        self.set_status(SessionStatus::Ready);

        let info = self.info_for(device_id, device.as_ref());
        info!(
            "connected to {}, {} of {} service(s) resolved",
            info.display_name(),
            summary.len(),
            self.filter.services.len()
        );
        self.emit(SessionEvent::Connected(info));
        self.emit(SessionEvent::ServicesDiscovered(summary));
        Ok(())
    }

    async fn resolve_service(
        device: &dyn BleDevice,
        uuid: Uuid,
    ) -> Result<HashMap<Uuid, Arc<dyn BleCharacteristic>>, BleError> {
        let service = device.primary_service(uuid).await?;
        let chars = service.characteristics().await?;
        Ok(chars.into_iter().map(|c| (c.uuid(), c)).collect())
    }

    /// Disconnect and drop the session. Never fails; with no active session
    /// this only re-asserts `Idle`. All characteristic handles the session
    /// owned become unreachable.
    pub async fn disconnect(&self) {
        let previous = { self.session.lock().await.take() };
        match previous {
            Some(session) => {
                if session.device.is_connected().await {
                    if let Err(err) = session.device.disconnect().await {
                        warn!("platform disconnect failed, dropping session anyway: {err}");
                    }
                }
                self.set_status(SessionStatus::Idle);
                self.emit(SessionEvent::Disconnected);
                info!("session closed");
            }
            None => self.set_status(SessionStatus::Idle),
        }
    }

    /// Write `payload` to the characteristic at the exact (service,
    /// characteristic) pair. Returns false on any failure, with the reason
    /// retrievable through [`SessionManager::last_error`]. An unmapped pair
    /// fails locally without touching the platform. No retry.
    pub async fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> bool {
        let chr = match self.characteristic(service, characteristic).await {
            Ok(chr) => chr,
            Err(err) => {
                debug!("{err}");
                self.record_error(err.to_string());
                return false;
            }
        };
        match chr.write(payload).await {
            Ok(()) => true,
            Err(err) => {
                warn!("write to {characteristic} failed: {err}");
                self.record_error(err.to_string());
                false
            }
        }
    }

    /// Read the characteristic's current value, or `None` on any failure
    /// (reason recorded, same contract as writes).
    pub async fn read_characteristic(&self, service: Uuid, characteristic: Uuid) -> Option<Vec<u8>> {
        let chr = match self.characteristic(service, characteristic).await {
            Ok(chr) => chr,
            Err(err) => {
                debug!("{err}");
                self.record_error(err.to_string());
                return None;
            }
        };
        match chr.read().await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("read from {characteristic} failed: {err}");
                self.record_error(err.to_string());
                None
            }
        }
    }

    /// Register `listener` for value-change notifications on the
    /// characteristic. Returns `None` on any failure (reason recorded).
    /// The returned [`Subscription`] must be used to remove the listener;
    /// it is not torn down with the session.
    pub async fn subscribe<F>(
        &self,
        service: Uuid,
        characteristic: Uuid,
        listener: F,
    ) -> Option<Subscription>
    where
        F: Fn(Vec<u8>) + Send + 'static,
    {
        let chr = match self.characteristic(service, characteristic).await {
            Ok(chr) => chr,
            Err(err) => {
                debug!("{err}");
                self.record_error(err.to_string());
                return None;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(err) = chr.start_notifications(tx).await {
            warn!("failed to start notifications on {characteristic}: {err}");
            self.record_error(err.to_string());
            return None;
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    value = rx.recv() => match value {
                        Some(value) => listener(value),
                        None => break,
                    },
                }
            }
            drop(rx);
            if let Err(err) = chr.stop_notifications().await {
                warn!("failed to stop notifications on {}: {err}", chr.uuid());
            }
        });
        Some(Subscription::new(token, task))
    }

    async fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Arc<dyn BleCharacteristic>, BleError> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|session| session.characteristic(service, characteristic))
            .ok_or(BleError::CharacteristicNotFound {
                service,
                characteristic,
            })
    }

    fn remember(&self, found: &DiscoveredDevice) {
        self.handles
            .lock()
            .unwrap()
            .insert(found.info.id.clone(), found.handle.clone());
        let mut known = self.known_devices.lock().unwrap();
        if !known.iter().any(|d| d.id == found.info.id) {
            known.push(found.info.clone());
        }
    }

    fn info_for(&self, device_id: &str, device: &dyn BleDevice) -> DeviceInfo {
        self.known_devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .unwrap_or_else(|| DeviceInfo {
                id: device.id(),
                name: device.name(),
                address: None,
                rssi: None,
            })
    }

    fn set_status(&self, next: SessionStatus) {
        let mut status = self.status.lock().unwrap();
        if *status != next {
            debug!("session status: {} -> {next}", *status);
            *status = next;
        }
    }

    fn record_error(&self, message: String) {
        *self.last_error.lock().unwrap() = Some(message);
    }

    fn clear_error(&self) {
        *self.last_error.lock().unwrap() = None;
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("no event listener registered, dropping session event");
        }
    }
}
