//! Haptic device control module
//!
//! Sends vibration commands to a single device connected through Intiface.
//!
//! # Overview
//!
//! - **`DeviceLink`**: the seam to the device protocol. `ButtplugLink` talks
//!   to an Intiface server over WebSocket; tests use an in-memory link.
//! - **`CommandDispatcher`**: background thread running a tokio runtime that
//!   owns the link and executes `DeviceCommand`s one at a time.
//! - **`CommandSender`**: cloneable handle that GUI callbacks and the input
//!   hook use to submit commands without blocking.
//!
//! # Command Flow
//!
//! ```text
//! GUI / hook → AppController → CommandSender → dispatcher worker → DeviceLink
//!                   ↑                                  │
//!                   └──────────── DeviceEvent ─────────┘
//! ```
//!
//! # Ordering
//!
//! The worker drains everything queued, collapses runs of `Vibrate` into
//! the newest value, and awaits each send before starting the next. There
//! is never more than one command in flight and never more than one pending
//! intensity per device.

pub mod buttplug_link;
pub mod dispatcher;

pub use buttplug_link::ButtplugLink;
pub use dispatcher::{CommandDispatcher, CommandSender, DispatcherOptions, coalesce};

use crate::error::Result;
use std::future::Future;
use std::sync::mpsc;

/// Client name announced to the Intiface server
pub const CLIENT_NAME: &str = "Haptic Control App";

/// Commands accepted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    /// Connect to the server and select the first device found
    Connect,
    /// Set the vibration intensity (0.0 stops)
    Vibrate(f64),
    /// Stop the device, disconnect and end the worker
    Shutdown,
}

/// Events reported by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Connecting to the server
    Connecting,
    /// Connected, scanning for devices
    Scanning,
    /// A device was selected
    Connected {
        /// Device name as reported by the server
        name: String,
    },
    /// Connecting or scanning failed
    ConnectFailed(String),
    /// A command failed on the connected device
    CommandFailed(String),
    /// The device has no usable actuator
    Unsupported,
    /// The device or the server went away
    Disconnected,
}

/// Where a link reports asynchronous events such as device removal
pub type LinkEventSink = mpsc::SyncSender<DeviceEvent>;

/// Connection to a haptic device server
///
/// All methods are called from the dispatcher worker only, one at a time.
pub trait DeviceLink: Send + 'static {
    /// Connect to the server at `server_address`
    fn connect(
        &mut self,
        server_address: &str,
        client_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Scan until a device is available and select it, returning its name
    ///
    /// `events` receives `DeviceEvent::Disconnected` if the selected device
    /// or the server goes away later.
    fn find_device(&mut self, events: LinkEventSink)
    -> impl Future<Output = Result<String>> + Send;

    /// Drive the selected device at `intensity` (0.0-1.0)
    fn send_intensity(&mut self, intensity: f64) -> impl Future<Output = Result<()>> + Send;

    /// Stop the device and disconnect from the server
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether a device is selected and the server is reachable
    fn is_connected(&self) -> bool;
}
