//! Application logic controller module
//!
//! This module coordinates between the input hook, the device dispatcher and
//! the GUI, implementing the core application logic.
//!
//! # Overview
//!
//! The application controller is the central coordinator that:
//! - **Receives trigger events** from the global input hook
//! - **Tracks the vibration trigger** and the stored intensity
//! - **Queues device commands** on the dispatcher
//! - **Follows the connection** through dispatcher events
//! - **Sends state updates** to the GUI for display
//!
//! # Architecture
//!
//! - `AppController`: Main controller, shared as `Arc<Mutex<AppController>>`
//! - `AppState`: State snapshot sent to GUI for display updates
//! - `VibrationState`: Hold-to-vibrate state machine and intensity steps
//!
//! # Event Flow
//!
//! ```text
//! InputHook → TriggerEvent ─┐
//!                           ├→ AppController → DeviceCommand → CommandDispatcher
//! GUI callbacks ────────────┘        ↓   ↑
//!                               AppState  DeviceEvent
//!                                  ↓
//!                                 GUI
//! ```
//!
//! # Trigger Logic
//!
//! 1. **Press**: starts vibrating at the stored intensity, only when a device
//!    is connected. Auto-repeat presses while held are ignored.
//! 2. **Release**: sends intensity 0.0.
//! 3. **Increase / Decrease**: move the intensity by 0.1 within `[0.0, 1.0]`
//!    and resend it if the trigger is held.

pub mod app_controller;
pub mod vibration;

pub use app_controller::{AppController, AppState, ConnectionPhase, RebindOutcome};
pub use vibration::{INTENSITY_STEP, VibrationState, format_intensity};
