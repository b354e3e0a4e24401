//! Application state management
//! This module wires the platform capability, session manager, and lamp
//! controller together for the presentation layer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::core::bluetooth::{
    DeviceFilter, PlatformAdapter, SessionEvent, SessionManager,
};
use crate::core::lamp::LampController;

/// Global application state
pub struct AppState {
    manager: Arc<SessionManager>,
    lamp: LampController,
}

impl AppState {
    /// Builds the session stack against the system Bluetooth adapter and
    /// returns it together with the session event stream.
    pub async fn new(
        config: &BridgeConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        info!("initializing Bluetooth session manager");
        let adapter =
            PlatformAdapter::new(Duration::from_secs(config.scan_window_secs)).await?;
        let (events, receiver) = mpsc::unbounded_channel();
        let filter = DeviceFilter {
            services: vec![config.output_service_uuid],
            name_fragment: config.device_name.clone(),
        };
        let manager = Arc::new(SessionManager::new(Arc::new(adapter), filter, events));
        let lamp = LampController::new(
            manager.clone(),
            config.output_service_uuid,
            config.output_char_uuid,
        );
        Ok((Self { manager, lamp }, receiver))
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn lamp(&self) -> &LampController {
        &self.lamp
    }
}
