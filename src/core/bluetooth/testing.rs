//! Fake capability implementations that drive the session layer in tests
//! without a Bluetooth stack.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::capability::{
    BleAdapter, BleCharacteristic, BleDevice, BleService, DeviceFilter,
};
use crate::core::bluetooth::device::{DeviceInfo, DiscoveredDevice};
use crate::core::bluetooth::error::BleError;

pub struct FakeCharacteristic {
    uuid: Uuid,
    value: Mutex<Vec<u8>>,
    writes: Mutex<Vec<Vec<u8>>>,
    sink: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl FakeCharacteristic {
    pub fn new(uuid: Uuid) -> Arc<Self> {
        Arc::new(Self {
            uuid,
            value: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
        })
    }

    pub fn set_value(&self, value: Vec<u8>) {
        *self.value.lock().unwrap() = value;
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// Push a value change to whoever subscribed. Returns false when nobody
    /// is listening any more.
    pub fn notify(&self, value: Vec<u8>) -> bool {
        self.sink
            .lock()
            .unwrap()
            .as_ref()
            .map(|sink| sink.send(value).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl BleCharacteristic for FakeCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn read(&self) -> Result<Vec<u8>, BleError> {
        Ok(self.value.lock().unwrap().clone())
    }

    async fn write(&self, payload: &[u8]) -> Result<(), BleError> {
        self.writes.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn start_notifications(
        &self,
        sink: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), BleError> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn stop_notifications(&self) -> Result<(), BleError> {
        Ok(())
    }
}

pub struct FakeService {
    uuid: Uuid,
    characteristics: Vec<Arc<FakeCharacteristic>>,
}

impl FakeService {
    pub fn new(uuid: Uuid, characteristics: Vec<Arc<FakeCharacteristic>>) -> Arc<Self> {
        Arc::new(Self {
            uuid,
            characteristics,
        })
    }
}

#[async_trait]
impl BleService for FakeService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    async fn characteristics(&self) -> Result<Vec<Arc<dyn BleCharacteristic>>, BleError> {
        Ok(self
            .characteristics
            .iter()
            .map(|c| c.clone() as Arc<dyn BleCharacteristic>)
            .collect())
    }
}

pub struct FakeDevice {
    id: String,
    name: Option<String>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    services: Mutex<Vec<Arc<FakeService>>>,
}

impl FakeDevice {
    pub fn new(id: &str, name: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            services: Mutex::new(Vec::new()),
        })
    }

    pub fn add_service(&self, service: Arc<FakeService>) {
        self.services.lock().unwrap().push(service);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleDevice for FakeDevice {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<(), BleError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BleError::Unknown("simulated link failure".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<Arc<dyn BleService>, BleError> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.uuid == uuid)
            .map(|s| s.clone() as Arc<dyn BleService>)
            .ok_or_else(|| BleError::Unknown(format!("service {uuid} not present")))
    }
}

pub struct FakeAdapter {
    available: AtomicBool,
    request_calls: AtomicUsize,
    last_filter: Mutex<Option<DeviceFilter>>,
    queue: Mutex<VecDeque<Arc<FakeDevice>>>,
}

impl FakeAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            request_calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Queue a device for the next discovery to return.
    pub fn queue_device(&self, device: Arc<FakeDevice>) {
        self.queue.lock().unwrap().push_back(device);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<DeviceFilter> {
        self.last_filter.lock().unwrap().clone()
    }
}

#[async_trait]
impl BleAdapter for FakeAdapter {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_device(
        &self,
        filter: &DeviceFilter,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredDevice, BleError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());

        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(device) => {
                let info = DeviceInfo {
                    id: device.id.clone(),
                    name: device.name.clone(),
                    address: None,
                    rssi: Some(-42),
                };
                Ok(DiscoveredDevice {
                    info,
                    handle: device as Arc<dyn BleDevice>,
                })
            }
            // Nothing advertising: park until the caller gives up.
            None => {
                cancel.cancelled().await;
                Err(BleError::UserCancelled)
            }
        }
    }
}
