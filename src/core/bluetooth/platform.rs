//! System Bluetooth capability backed by the `bluest` cross-platform stack.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Device, Service};
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::capability::{
    BleAdapter, BleCharacteristic, BleDevice, BleService, DeviceFilter,
};
use crate::core::bluetooth::device::{extract_mac_address, DeviceInfo, DiscoveredDevice};
use crate::core::bluetooth::error::BleError;

/// Maps platform errors onto the session error taxonomy. Anything without
/// a clear counterpart keeps its original message.
fn normalize(err: bluest::Error) -> BleError {
    use bluest::error::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => BleError::NoDeviceFound,
        ErrorKind::NotAuthorized => BleError::PermissionDenied,
        ErrorKind::NotSupported => BleError::Unsupported,
        _ => BleError::Unknown(err.to_string()),
    }
}

/// The production [`BleAdapter`] over the system Bluetooth stack.
///
/// Discovery scans for at most `scan_window` and picks the first device the
/// platform filter (plus the optional name fragment) matches, the
/// counterpart of a user confirming the first entry in a chooser dialog.
pub struct PlatformAdapter {
    adapter: Adapter,
    scan_window: Duration,
}

impl PlatformAdapter {
    /// Acquires the default system adapter and waits for it to power on.
    pub async fn new(scan_window: Duration) -> Result<Self, BleError> {
        let adapter = Adapter::default().await.ok_or(BleError::Unsupported)?;
        adapter.wait_available().await.map_err(normalize)?;
        info!("Bluetooth adapter is available");
        Ok(Self {
            adapter,
            scan_window,
        })
    }

    fn wrap_device(&self, device: Device, rssi: Option<i16>) -> DiscoveredDevice {
        let id = device.id().to_string();
        let info = DeviceInfo {
            name: device.name().ok(),
            address: extract_mac_address(&id),
            rssi,
            id,
        };
        DiscoveredDevice {
            info,
            handle: Arc::new(PlatformDevice {
                adapter: self.adapter.clone(),
                inner: device,
            }),
        }
    }
}

#[async_trait]
impl BleAdapter for PlatformAdapter {
    async fn is_available(&self) -> bool {
        // Availability was established when the adapter was acquired; the
        // platform offers no cheap re-query.
        true
    }

    async fn request_device(
        &self,
        filter: &DeviceFilter,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredDevice, BleError> {
        // A device the system is already connected to does not advertise,
        // so when a name fragment narrows the search, check those first.
        if filter.name_fragment.is_some() {
            if let Ok(connected) = self.adapter.connected_devices().await {
                for device in connected {
                    if filter.matches_name(device.name().ok().as_deref()) {
                        info!("matched an already-connected device: {}", device.id());
                        let rssi = device.rssi().await.ok();
                        return Ok(self.wrap_device(device, rssi));
                    }
                }
            }
        }

        let mut scan = self
            .adapter
            .scan(&filter.services)
            .await
            .map_err(normalize)?;

        let deadline = tokio::time::sleep(self.scan_window);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BleError::UserCancelled),
                _ = &mut deadline => return Err(BleError::NoDeviceFound),
                next = scan.next() => match next {
                    Some(found) => {
                        let name = found.device.name().ok();
                        debug!("advertisement from {:?} (rssi {:?})", name, found.rssi);
                        if !filter.matches_name(name.as_deref()) {
                            continue;
                        }
                        return Ok(self.wrap_device(found.device, found.rssi));
                    }
                    None => return Err(BleError::NoDeviceFound),
                },
            }
        }
    }
}

struct PlatformDevice {
    adapter: Adapter,
    inner: Device,
}

#[async_trait]
impl BleDevice for PlatformDevice {
    fn id(&self) -> String {
        self.inner.id().to_string()
    }

    fn name(&self) -> Option<String> {
        self.inner.name().ok()
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    async fn connect(&self) -> Result<(), BleError> {
        self.adapter
            .connect_device(&self.inner)
            .await
            .map_err(normalize)
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.adapter
            .disconnect_device(&self.inner)
            .await
            .map_err(normalize)
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<Arc<dyn BleService>, BleError> {
        let services = self.inner.services().await.map_err(normalize)?;
        services
            .iter()
            .find(|s| s.uuid() == uuid)
            .cloned()
            .map(|inner| Arc::new(PlatformService { inner }) as Arc<dyn BleService>)
            .ok_or_else(|| BleError::Unknown(format!("service {uuid} not found on device")))
    }
}

struct PlatformService {
    inner: Service,
}

#[async_trait]
impl BleService for PlatformService {
    fn uuid(&self) -> Uuid {
        self.inner.uuid()
    }

    async fn characteristics(&self) -> Result<Vec<Arc<dyn BleCharacteristic>>, BleError> {
        let chars = self.inner.characteristics().await.map_err(normalize)?;
        Ok(chars
            .into_iter()
            .map(|inner| Arc::new(PlatformCharacteristic { inner }) as Arc<dyn BleCharacteristic>)
            .collect())
    }
}

struct PlatformCharacteristic {
    inner: Characteristic,
}

#[async_trait]
impl BleCharacteristic for PlatformCharacteristic {
    fn uuid(&self) -> Uuid {
        self.inner.uuid()
    }

    async fn read(&self) -> Result<Vec<u8>, BleError> {
        self.inner
            .read()
            .await
            .map(|value| value.to_vec())
            .map_err(normalize)
    }

    async fn write(&self, payload: &[u8]) -> Result<(), BleError> {
        self.inner.write(payload).await.map_err(normalize)
    }

    async fn start_notifications(
        &self,
        sink: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), BleError> {
        let chr = self.inner.clone();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let stream = match chr.notify().await {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(normalize(err)));
                    return;
                }
            };
            tokio::pin!(stream);
            loop {
                tokio::select! {
                    _ = sink.closed() => break,
                    next = stream.next() => match next {
                        Some(Ok(value)) => {
                            if sink.send(value.to_vec()).is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            warn!("notification stream error on {}: {err}", chr.uuid());
                            break;
                        }
                        None => break,
                    },
                }
            }
            // Dropping the stream is what tells the platform to stop
            // sending notifications.
            debug!("notification forwarding for {} ended", chr.uuid());
        });
        match ready_rx.await {
            Ok(result) => result,
            Err(_) => Err(BleError::Unknown(
                "notification task ended before subscribing".to_string(),
            )),
        }
    }

    async fn stop_notifications(&self) -> Result<(), BleError> {
        // Stopping happens when the forwarding task drops its notify
        // stream; there is nothing further to ask of the platform.
        Ok(())
    }
}
