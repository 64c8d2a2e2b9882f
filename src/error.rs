//! Error types for `hapticbind`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains, so a failure
//! coming out of the Buttplug client or the input hook can still be traced
//! back to its origin in the log file.

use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `hapticbind`
#[derive(Debug, Error)]
pub enum HapticError {
    /// Could not reach or handshake with the Intiface server
    #[error("Failed to connect to Intiface: {0}")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A command was issued while no device is selected
    #[error("No device connected")]
    NoDevice,

    /// The device rejected or failed a command
    #[error("Device command failed: {0}")]
    DeviceCommandFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The selected device exposes no vibrate, linear or rotate actuator
    #[error("Device doesn't support vibrate")]
    UnsupportedDevice,

    /// A key or mouse-button name could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Global keyboard/mouse hook could not be installed
    #[error("Input hook error: {0}")]
    InputHookError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The command dispatcher thread is gone
    #[error("Command dispatcher is not running")]
    DispatcherStopped,

    /// Configuration error
    /// Preserves the underlying error source for full error chain transparency
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `hapticbind` operations
pub type Result<T> = std::result::Result<T, HapticError>;

/// Convert an error to a user-friendly message
///
/// Returns a message suitable for an error dialog, including hints for the
/// most common causes.
pub fn get_user_friendly_error(error: &HapticError) -> String {
    match error {
        HapticError::ConnectionFailed(e) => {
            format!(
                "Unable to connect to Intiface:\n\n{e}\n\n\
                 Please ensure:\n\
                 - Intiface Central is running\n\
                 - The server is started (default port 12345)\n\
                 - The server address in keybindings.json is correct"
            )
        }
        HapticError::NoDevice => "No device is connected.\n\n\
             Press 'Connect to Intiface' and turn your device on."
            .to_string(),
        HapticError::DeviceCommandFailed(e) => {
            format!(
                "The device did not accept the command:\n\n{e}\n\n\
                 Check that the device is still paired in Intiface."
            )
        }
        HapticError::UnsupportedDevice => "This device doesn't support vibration.\n\n\
             Only devices with vibrate, linear or rotate actuators can be used."
            .to_string(),
        HapticError::InvalidKey(key) => {
            format!(
                "Invalid key: {key}\n\n\
                 Choose a letter, digit, function key or one of the listed mouse buttons."
            )
        }
        HapticError::InputHookError(e) => {
            format!(
                "Global hotkeys are unavailable: {e}\n\
                 The Vibrate button still works. On Linux, global hooks need an X11 session."
            )
        }
        HapticError::DispatcherStopped => "The device worker has stopped.\n\n\
             Please restart the application."
            .to_string(),
        HapticError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to the hapticbind config directory."
            .to_string(),
        HapticError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        HapticError::JsonError(e) => {
            format!(
                "Settings file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
    }
}
