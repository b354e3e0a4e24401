//! Runtime configuration for the bridge.

use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    DEFAULT_SCAN_WINDOW_SECS, UUID_LAMP_OUTPUT_SERVICE, UUID_OUTPUT_CONTROL_CHAR,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// How long discovery keeps scanning before giving up, in seconds.
    #[serde(default = "default_scan_window")]
    pub scan_window_secs: u64,

    /// Only devices whose advertised name contains this fragment are
    /// selected. Unset means any device passing the service filter.
    #[serde(default)]
    pub device_name: Option<String>,

    /// Service the lamp firmware exposes for output control.
    #[serde(default = "default_output_service")]
    pub output_service_uuid: Uuid,

    /// Characteristic that accepts the single-byte lamp command.
    #[serde(default = "default_output_char")]
    pub output_char_uuid: Uuid,
}

fn default_scan_window() -> u64 {
    DEFAULT_SCAN_WINDOW_SECS
}

fn default_output_service() -> Uuid {
    UUID_LAMP_OUTPUT_SERVICE
}

fn default_output_char() -> Uuid {
    UUID_OUTPUT_CONTROL_CHAR
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scan_window_secs: default_scan_window(),
            device_name: None,
            output_service_uuid: default_output_service(),
            output_char_uuid: default_output_char(),
        }
    }
}

impl BridgeConfig {
    /// Loads the config file at `path`. With no path, or a path that does
    /// not exist yet, the defaults are used.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}
