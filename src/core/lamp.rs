//! Lamp commands and the controller that sends them
//! This module contains the wire encoding of lamp commands and the
//! controller that writes them to the output characteristic.

use std::fmt;
use std::sync::Arc;

use log::info;
use uuid::Uuid;

use crate::core::bluetooth::SessionManager;

/// Lamp commands. The entire wire protocol is one ASCII digit per toggle;
/// there is no framing, checksum, or versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LampCommand {
    /// Switch the lamp on (`'1'`, 0x31)
    On,
    /// Switch the lamp off (`'0'`, 0x30)
    Off,
}

impl LampCommand {
    pub fn from_state(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Convert the command to its byte representation
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Self::On => b"1".to_vec(),
            Self::Off => b"0".to_vec(),
        }
    }
}

impl fmt::Display for LampCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// Sends lamp commands through the active session's output characteristic.
pub struct LampController {
    manager: Arc<SessionManager>,
    service: Uuid,
    characteristic: Uuid,
}

impl LampController {
    pub fn new(manager: Arc<SessionManager>, service: Uuid, characteristic: Uuid) -> Self {
        Self {
            manager,
            service,
            characteristic,
        }
    }

    /// Returns true once the device acknowledged the write. On failure the
    /// reason is available from the session manager's `last_error`.
    pub async fn set_power(&self, on: bool) -> bool {
        let command = LampCommand::from_state(on);
        info!("sending lamp command: {command}");
        self.manager
            .write_characteristic(self.service, self.characteristic, &command.to_bytes())
            .await
    }
}
