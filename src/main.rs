//! `hapticbind` - drive an Intiface haptic device from global hotkeys
//!
//! Connects to a local Intiface server, selects the first device it finds
//! and vibrates it while the bound key or mouse button is held.

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![expect(
    missing_docs,
    reason = "Slint-generated code from include_modules! lacks doc comments"
)]
#![allow(clippy::unwrap_used)] // Slint-generated code from include_modules! uses .unwrap() extensively

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use hapticbind::{
    config::ConfigManager,
    controller::{AppController, AppState},
    device::{ButtplugLink, CLIENT_NAME, CommandDispatcher, DeviceEvent, DispatcherOptions},
    input::{InputHook, TriggerEvent},
    utils,
};
use gui::GuiController;
use parking_lot::Mutex;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{error, info, warn};

// Include Slint-generated code
slint::include_modules!();

/// Capacity of the trigger, device event and GUI state channels
const CHANNEL_CAPACITY: usize = 64;

/// How long to wait for the device to stop and disconnect on exit
const DISPATCHER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Main entry point for the application
///
/// Starts logging, loads settings, then brings up the dispatcher, controller,
/// input hook and GUI. On exit the settings are saved and the device stopped.
fn main() -> Result<()> {
    let _log_guard = utils::init_logging().context("Failed to initialize logging system")?;

    let settings = ConfigManager::load().context("Failed to load settings")?;
    info!(
        "Settings loaded: vibration={:?}, increase={:?}, decrease={:?}, intensity={}, server={}",
        settings.vibration_key,
        settings.intensity_increase_key,
        settings.intensity_decrease_key,
        settings.vibration_intensity,
        settings.server_address
    );

    let (trigger_tx, trigger_rx) = mpsc::sync_channel::<TriggerEvent>(CHANNEL_CAPACITY);
    let (device_event_tx, device_event_rx) = mpsc::sync_channel::<DeviceEvent>(CHANNEL_CAPACITY);
    let (app_state_tx, app_state_rx) = mpsc::sync_channel::<AppState>(CHANNEL_CAPACITY);

    info!("Starting device command dispatcher");
    let dispatcher = CommandDispatcher::spawn(
        ButtplugLink::new(),
        DispatcherOptions {
            server_address: settings.server_address.clone(),
            client_name: CLIENT_NAME.to_string(),
        },
        device_event_tx,
    )
    .context("Failed to start device command dispatcher")?;

    info!("Creating application controller");
    let app_controller = AppController::new(
        settings,
        ConfigManager::get_config_path(),
        dispatcher.sender(),
        app_state_tx,
    );
    let hook_control = app_controller.hook_control();
    let app_controller_handle = Arc::new(Mutex::new(app_controller));

    info!("Creating GUI controller");
    let gui_controller = GuiController::new(Arc::clone(&app_controller_handle), app_state_rx)
        .context("Failed to create GUI controller")?;

    info!("Starting application controller thread");
    let _controller_handle =
        AppController::spawn_event_loop(Arc::clone(&app_controller_handle), trigger_rx, device_event_rx);

    info!("Starting global input hook");
    let _hook_handle = InputHook::new(hook_control, trigger_tx).start();

    app_controller_handle.lock().send_initial_state();

    info!("Starting GUI event loop");
    let gui_result = gui_controller
        .run()
        .context("GUI event loop terminated with error");

    // Runs whether or not the GUI exited cleanly
    if let Err(e) = app_controller_handle.lock().shutdown() {
        error!("Failed to save settings on exit: {}", e);
    }
    if let Err(e) = dispatcher.shutdown(DISPATCHER_SHUTDOWN_TIMEOUT) {
        warn!("Device dispatcher did not shut down cleanly: {}", e);
    }

    info!("hapticbind shutting down");
    gui_result
}
