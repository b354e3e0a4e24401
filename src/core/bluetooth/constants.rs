//! Constants used throughout the application
//! This module contains the fixed wire UUIDs of the lamp firmware and
//! discovery defaults.

use uuid::Uuid;

/// The BLE service the ESP32 lamp firmware exposes for output control.
pub const UUID_LAMP_OUTPUT_SERVICE: Uuid = Uuid::from_u128(0x4869e6e5_dec6_4a9d_a0a4_eda6b5448b97);

/// The characteristic that accepts single-byte lamp commands.
pub const UUID_OUTPUT_CONTROL_CHAR: Uuid = Uuid::from_u128(0x05c4d03a_ac78_4627_8778_f23fab166ba8);

/// How long discovery keeps scanning before giving up, in seconds.
pub const DEFAULT_SCAN_WINDOW_SECS: u64 = 10;
