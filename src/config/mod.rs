//! Configuration management module
//!
//! Loads and saves the user's keybindings, vibration intensity and server
//! address. Settings are stored in `<config dir>/hapticbind/keybindings.json`
//! with atomic writes to prevent corruption.

pub mod manager;
pub mod models;

pub use manager::ConfigManager;
pub use models::{DEFAULT_SERVER_ADDRESS, Settings};
