//! Core functionality for the smart lamp bridge
//! This module contains the BLE session layer and the lamp command
//! protocol built on top of it.

pub mod bluetooth;
pub mod lamp;

// Re-export commonly used types
pub use bluetooth::SessionManager;
pub use lamp::{LampCommand, LampController};
