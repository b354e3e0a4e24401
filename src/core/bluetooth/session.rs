//! Connection-session state: the lifecycle state machine, the handle map a
//! live session owns, and the subscription guard returned by subscribe.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::capability::{BleCharacteristic, BleDevice};
use crate::core::bluetooth::events::ServiceSummary;

/// Lifecycle of the single connection session.
///
/// `Idle` is terminal after a disconnect: nothing reconnects automatically,
/// a new discovery has to be requested explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Discovering,
    DeviceSelected,
    Connecting,
    Connected,
    Ready,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Discovering => "discovering",
            SessionStatus::DeviceSelected => "device selected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// A live GATT connection and the characteristics resolved under it.
/// Dropped wholesale on disconnect, which is what invalidates the handles.
pub(crate) struct ActiveSession {
    pub device: Arc<dyn BleDevice>,
    pub characteristics: HashMap<Uuid, HashMap<Uuid, Arc<dyn BleCharacteristic>>>,
}

impl ActiveSession {
    pub fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<Arc<dyn BleCharacteristic>> {
        self.characteristics
            .get(&service)
            .and_then(|chars| chars.get(&characteristic))
            .cloned()
    }

    pub fn summary(&self) -> ServiceSummary {
        self.characteristics
            .iter()
            .map(|(service, chars)| (*service, chars.keys().copied().collect()))
            .collect()
    }
}

/// Handle to an active notification listener.
///
/// Keep it alive for as long as the listener should run; call
/// [`Subscription::unsubscribe`] to remove the listener and best-effort stop
/// platform notifications.
pub struct Subscription {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    /// Stops the listener. Returns once no further notifications will be
    /// delivered. Errors from stopping platform notifications are logged,
    /// never surfaced.
    pub async fn unsubscribe(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            warn!("notification listener task did not shut down cleanly: {err}");
        }
    }
}
