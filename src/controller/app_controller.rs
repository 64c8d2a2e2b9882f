//! Application controller implementation
//!
//! This module implements the main application logic controller that
//! coordinates between the input hook, the device dispatcher and the GUI.

use crate::config::{ConfigManager, Settings};
use crate::controller::vibration::{VibrationState, format_intensity};
use crate::device::{CommandSender, DeviceCommand, DeviceEvent};
use crate::error::{Result, get_user_friendly_error};
use crate::input::{
    Binding, BindingKind, BindingTable, HookControl, TriggerEvent, UiKey, key_name_from_ui_text,
    parse_binding,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shown when the global hook could not be installed
const HOTKEYS_UNAVAILABLE: &str =
    "Global hotkeys unavailable; use the Vibrate button while the window is focused";

/// Application state for GUI updates
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Status line text (may span two lines)
    pub status: String,
    /// Whether the Connect button is clickable
    pub connect_enabled: bool,
    /// Whether the Vibrate button is clickable
    pub vibrate_enabled: bool,
    /// Whether the vibration trigger is held
    pub vibrating: bool,
    /// Stored intensity (0.0-1.0)
    pub intensity: f64,
    /// Label of the vibration binding
    pub vibration_binding: String,
    /// Label of the intensity increase binding
    pub increase_binding: String,
    /// Label of the intensity decrease binding
    pub decrease_binding: String,
    /// Persistent warning line, empty when there is nothing to report
    pub notice: String,
}

/// Where the device connection currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Idle; Connect is available
    #[default]
    Disconnected,
    /// Handshaking with the server
    Connecting,
    /// Connected to the server, waiting for a device
    Scanning,
    /// A device is selected
    Connected {
        /// Device name as reported by the server
        device: String,
    },
}

impl ConnectionPhase {
    /// Whether a device is selected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Result of a rebind attempt from the rebind prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindOutcome {
    /// The binding was changed
    Rebound(Binding),
    /// The key is already bound to this trigger
    SameKey,
    /// The key is bound to a different trigger
    Conflict(BindingKind),
    /// The key cannot be bound to this trigger
    Invalid,
    /// The prompt was dismissed
    Cancelled,
}

impl RebindOutcome {
    /// Whether the rebind prompt should close
    pub fn closes_prompt(&self) -> bool {
        matches!(self, Self::Rebound(_) | Self::Cancelled)
    }

    /// Message title shown in the prompt
    pub fn title(&self) -> &'static str {
        match self {
            Self::Rebound(_) => "Key Rebound",
            Self::SameKey => "Same Key",
            Self::Conflict(_) => "Key In Use",
            Self::Invalid => "Invalid Key",
            Self::Cancelled => "",
        }
    }

    /// Message text for a rebind of `kind`
    pub fn message(&self, kind: BindingKind) -> String {
        match self {
            Self::Rebound(Binding::Mouse(button)) => {
                format!("Vibration rebound to: {} Mouse Button", capitalize(button.name()))
            }
            Self::Rebound(Binding::Key(name)) => {
                format!("{} key rebound to: {}", capitalize(kind.label()), name)
            }
            Self::SameKey => format!("You are already using this key for {}.", kind.label()),
            Self::Conflict(other) => format!("This key is already used for {}.", other.label()),
            Self::Invalid => "Invalid key entered.".to_string(),
            Self::Cancelled => String::new(),
        }
    }

    /// Title and message on one line, as shown in the window
    pub fn summary(&self, kind: BindingKind) -> String {
        format!("{}: {}", self.title(), self.message(kind))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Application logic controller
pub struct AppController {
    /// Current settings, written back on shutdown
    settings: Settings,
    /// Where `shutdown` saves the settings
    settings_path: PathBuf,
    vibration: VibrationState,
    phase: ConnectionPhase,
    status: String,
    notice: Option<String>,
    /// Device command queue
    commands: CommandSender,
    /// Bindings shared with the input hook thread
    hook: HookControl,
    /// State sender to GUI
    gui_state_sender: mpsc::SyncSender<AppState>,
}

impl AppController {
    /// Create a controller for `settings`
    ///
    /// The returned controller owns the binding table; hand
    /// [`AppController::hook_control`] to the input hook.
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        commands: CommandSender,
        gui_state_sender: mpsc::SyncSender<AppState>,
    ) -> Self {
        let hook = HookControl::new(BindingTable::from_settings(&settings));
        let vibration = VibrationState::new(settings.vibration_intensity);
        Self {
            settings,
            settings_path,
            vibration,
            phase: ConnectionPhase::Disconnected,
            status: "Not Connected".to_string(),
            notice: None,
            commands,
            hook,
            gui_state_sender,
        }
    }

    /// Handle shared with the input hook
    pub fn hook_control(&self) -> HookControl {
        self.hook.clone()
    }

    /// Current settings including intensity and bindings changed at runtime
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current connection phase
    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    /// Current vibration state
    pub fn vibration(&self) -> VibrationState {
        self.vibration
    }

    /// Spawn the event loop in a background thread. Only locks controller while handling individual events,
    /// preventing GUI callbacks from being blocked.
    ///
    /// The loop ends once the device event channel disconnects, which happens
    /// when the dispatcher worker exits.
    pub fn spawn_event_loop(
        controller: Arc<Mutex<AppController>>,
        trigger_receiver: mpsc::Receiver<TriggerEvent>,
        device_receiver: mpsc::Receiver<DeviceEvent>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            use std::sync::mpsc::{RecvTimeoutError, TryRecvError};

            info!("Entering main event loop (trigger events + device events)");
            let mut triggers = Some(trigger_receiver);
            'events: loop {
                if let Some(receiver) = &triggers {
                    match receiver.recv_timeout(Duration::from_millis(100)) {
                        Ok(trigger) => controller.lock().handle_trigger(trigger),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            warn!("Trigger channel disconnected, continuing without hotkeys");
                            controller.lock().hotkeys_unavailable();
                            triggers = None;
                        }
                    }
                } else {
                    // Hook is gone; wait on device events instead
                    match device_receiver.recv_timeout(Duration::from_millis(100)) {
                        Ok(event) => controller.lock().handle_device_event(event),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break 'events,
                    }
                }

                loop {
                    match device_receiver.try_recv() {
                        Ok(event) => controller.lock().handle_device_event(event),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break 'events,
                    }
                }
            }
            info!("Main event loop exited");
        })
    }

    /// Ask the dispatcher to connect and select a device
    pub fn connect(&mut self) {
        if self.phase != ConnectionPhase::Disconnected {
            debug!("Connect ignored in phase {:?}", self.phase);
            return;
        }

        self.phase = ConnectionPhase::Connecting;
        self.status = "Connecting...".to_string();
        if let Err(e) = self.commands.submit(DeviceCommand::Connect) {
            error!("Failed to queue connect: {}", e);
            self.phase = ConnectionPhase::Disconnected;
            self.status = format!("Error: {e}");
        }
        self.send_state_update();
    }

    /// Vibration trigger pressed (GUI button or hotkey)
    pub fn start_vibration(&mut self) {
        if let Some(intensity) = self.vibration.press(self.phase.is_connected()) {
            debug!("Vibration started at {}", intensity);
            self.submit_intensity(intensity);
            self.send_state_update();
        }
    }

    /// Vibration trigger released
    pub fn stop_vibration(&mut self) {
        if let Some(intensity) = self.vibration.release() {
            debug!("Vibration stopped");
            self.submit_intensity(intensity);
            self.send_state_update();
        }
    }

    /// Raise the intensity one step
    pub fn increase_intensity(&mut self) {
        let resend = self.vibration.increase();
        self.intensity_changed(resend);
    }

    /// Lower the intensity one step
    pub fn decrease_intensity(&mut self) {
        let resend = self.vibration.decrease();
        self.intensity_changed(resend);
    }

    /// Set the intensity from the slider
    pub fn set_intensity(&mut self, intensity: f64) {
        let resend = self.vibration.set_intensity(intensity);
        self.intensity_changed(resend);
    }

    fn intensity_changed(&mut self, resend: Option<f64>) {
        let intensity = self.vibration.intensity();
        debug!("Intensity set to {}", intensity);
        self.settings.vibration_intensity = intensity;

        if let Some(intensity) = resend {
            self.submit_intensity(intensity);
        }
        if let ConnectionPhase::Connected { device } = &self.phase {
            self.status = connected_status(device, intensity);
        }
        self.send_state_update();
    }

    fn submit_intensity(&mut self, intensity: f64) {
        if let Err(e) = self.commands.submit(DeviceCommand::Vibrate(intensity)) {
            error!("Failed to queue intensity {}: {}", intensity, e);
            self.status = format!("Error: {e}");
        }
    }

    /// The rebind prompt for `kind` opened
    ///
    /// Hotkeys are suspended until the prompt closes so the key being
    /// captured does not also fire its old trigger.
    pub fn begin_rebind(&mut self, kind: BindingKind) {
        debug!("Rebinding {}", kind.label());
        self.stop_vibration();
        self.hook.set_suspended(true);
    }

    /// The rebind prompt closed without a change
    pub fn cancel_rebind(&mut self) {
        self.hook.set_suspended(false);
    }

    /// Rebind `kind` to the key described by a GUI key event
    pub fn rebind_key_text(&mut self, kind: BindingKind, text: &str) -> RebindOutcome {
        match key_name_from_ui_text(text) {
            UiKey::Cancel => {
                self.cancel_rebind();
                RebindOutcome::Cancelled
            }
            UiKey::Named(name) => match parse_binding(&name) {
                Ok(binding) => self.rebind(kind, binding),
                Err(e) => {
                    warn!("Rejected key {:?}: {}", name, e);
                    RebindOutcome::Invalid
                }
            },
            UiKey::Unknown(raw) => {
                debug!("Unbindable key text {:?}", raw);
                RebindOutcome::Invalid
            }
        }
    }

    /// Bind `binding` to `kind`
    ///
    /// A binding sharing a key or button with another trigger is refused, so
    /// one key never drives two triggers.
    pub fn rebind(&mut self, kind: BindingKind, binding: Binding) -> RebindOutcome {
        if !kind.accepts(&binding) {
            return RebindOutcome::Invalid;
        }

        let table = self.hook.bindings();
        if table.get(kind) == &binding {
            return RebindOutcome::SameKey;
        }
        if let Some(other) = table.conflict_with(kind, &binding) {
            return RebindOutcome::Conflict(other);
        }

        info!("{} binding changed to {}", kind.label(), binding);
        self.settings.set_binding(kind, &binding);
        self.hook.rebind(kind, binding.clone());
        self.hook.set_suspended(false);
        self.send_state_update();
        RebindOutcome::Rebound(binding)
    }

    /// Handle a trigger from the global input hook
    pub fn handle_trigger(&mut self, trigger: TriggerEvent) {
        match trigger {
            TriggerEvent::VibrateStart => self.start_vibration(),
            TriggerEvent::VibrateStop => self.stop_vibration(),
            TriggerEvent::IntensityIncrease => self.increase_intensity(),
            TriggerEvent::IntensityDecrease => self.decrease_intensity(),
        }
    }

    /// Handle progress or failure reported by the dispatcher
    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connecting => {
                self.phase = ConnectionPhase::Connecting;
                self.status = "Connecting...".to_string();
            }
            DeviceEvent::Scanning => {
                self.phase = ConnectionPhase::Scanning;
                self.status = "Connected.  Scanning...".to_string();
            }
            DeviceEvent::Connected { name } => {
                info!("Device ready: {}", name);
                self.status = connected_status(&name, self.vibration.intensity());
                self.phase = ConnectionPhase::Connected { device: name };
            }
            DeviceEvent::ConnectFailed(message) => {
                warn!("Connection failed: {}", message);
                self.phase = ConnectionPhase::Disconnected;
                self.status = format!("Connection Error: {message}");
            }
            DeviceEvent::CommandFailed(message) => {
                self.status = format!("Error: {message}");
            }
            DeviceEvent::Unsupported => {
                self.status = "Device doesn't support vibrate".to_string();
            }
            DeviceEvent::Disconnected => {
                info!("Device disconnected");
                self.phase = ConnectionPhase::Disconnected;
                self.vibration.reset();
                self.status = "Device disconnected".to_string();
            }
        }
        self.send_state_update();
    }

    /// Record that global hotkeys are not available
    ///
    /// Shows the failure reported by the hook when there is one.
    pub fn hotkeys_unavailable(&mut self) {
        let notice = match self.hook.take_failure() {
            Some(e) => get_user_friendly_error(&e),
            None => HOTKEYS_UNAVAILABLE.to_string(),
        };
        self.notice = Some(notice);
        self.send_state_update();
    }

    /// Send initial state to GUI. Call once after the GUI is ready.
    pub fn send_initial_state(&self) {
        info!("Sending initial state update to populate GUI");
        self.send_state_update();
    }

    /// Stop vibrating and save settings
    ///
    /// The dispatcher is shut down separately by its owner.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("Controller shutting down");
        self.stop_vibration();
        self.settings.vibration_intensity = self.vibration.intensity();
        ConfigManager::save_to(&self.settings, &self.settings_path).inspect_err(|e| {
            warn!(
                "Failed to save settings to {}: {}",
                self.settings_path.display(),
                e
            );
        })
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AppState {
        let table = self.hook.bindings();
        AppState {
            status: self.status.clone(),
            connect_enabled: self.phase == ConnectionPhase::Disconnected,
            vibrate_enabled: self.phase.is_connected(),
            vibrating: self.vibration.is_vibrating(),
            intensity: self.vibration.intensity(),
            vibration_binding: table.vibration.label(),
            increase_binding: table.increase.label(),
            decrease_binding: table.decrease.label(),
            notice: self.notice.clone().unwrap_or_default(),
        }
    }

    /// Send current state update to GUI
    ///
    /// Never blocks: the GUI thread may itself be waiting on the controller
    /// lock, so a full queue drops the update instead.
    fn send_state_update(&self) {
        match self.gui_state_sender.try_send(self.state()) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => warn!("GUI state queue full, dropping update"),
            Err(mpsc::TrySendError::Disconnected(_)) => {
                debug!("GUI state receiver gone, dropping update");
            }
        }
    }
}

fn connected_status(device: &str, intensity: f64) -> String {
    format!(
        "Connected to: {device}\nIntensity:{}",
        format_intensity(intensity)
    )
}
