//! `hapticbind` - Hotkey-driven vibration for Intiface haptic devices
//!
//! Connects to a local Intiface (Buttplug) server and maps global keyboard or
//! mouse triggers to vibration commands. A `CommandDispatcher` runs a tokio
//! runtime on its own thread and serializes intensity commands to the single
//! selected device, `InputHook` feeds trigger events from a global hook thread,
//! and `AppController` ties both to the GUI.

// Module declarations
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod input;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use error::{HapticError, Result};
