//! Smart lamp bridge library
//! This is the main library for the smart lamp bridge: a BLE session layer
//! plus the single-byte lamp command protocol and a CLI front end.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod state;

// Re-export the types most callers need
pub use crate::config::BridgeConfig;
pub use crate::core::bluetooth::{
    BleAdapter, BleError, DeviceFilter, DeviceInfo, SessionEvent, SessionManager, SessionStatus,
    Subscription,
};
pub use crate::core::lamp::{LampCommand, LampController};
pub use crate::state::AppState;
