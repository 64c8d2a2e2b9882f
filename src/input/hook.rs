//! Global keyboard and mouse hook
//!
//! Runs `rdev::listen` on a dedicated thread and translates raw input events
//! into `TriggerEvent`s using the current `BindingTable`. Rebinding swaps the
//! table in place; the hook itself is installed once.

use crate::config::Settings;
use crate::error::{HapticError, StringError};
use crate::input::bindings::{Binding, BindingKind, hook_keys};
use parking_lot::{Mutex, RwLock};
use rdev::EventType;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Events emitted by the input hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Vibration binding pressed
    VibrateStart,
    /// Vibration binding released
    VibrateStop,
    /// Increase binding pressed
    IntensityIncrease,
    /// Decrease binding pressed
    IntensityDecrease,
}

/// The three active trigger bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    /// Vibrate while held
    pub vibration: Binding,
    /// Raise intensity
    pub increase: Binding,
    /// Lower intensity
    pub decrease: Binding,
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl BindingTable {
    /// Build the table from persisted settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            vibration: settings.binding(BindingKind::Vibration),
            increase: settings.binding(BindingKind::IntensityIncrease),
            decrease: settings.binding(BindingKind::IntensityDecrease),
        }
    }

    /// Binding for `kind`
    pub fn get(&self, kind: BindingKind) -> &Binding {
        match kind {
            BindingKind::Vibration => &self.vibration,
            BindingKind::IntensityIncrease => &self.increase,
            BindingKind::IntensityDecrease => &self.decrease,
        }
    }

    /// Replace the binding for `kind`
    pub fn set(&mut self, kind: BindingKind, binding: Binding) {
        match kind {
            BindingKind::Vibration => self.vibration = binding,
            BindingKind::IntensityIncrease => self.increase = binding,
            BindingKind::IntensityDecrease => self.decrease = binding,
        }
    }

    /// Another trigger already listening on a key or button of `binding`
    pub fn conflict_with(&self, kind: BindingKind, binding: &Binding) -> Option<BindingKind> {
        BindingKind::ALL
            .into_iter()
            .filter(|other| *other != kind)
            .find(|other| self.get(*other).overlaps(binding))
    }

    /// Translate a raw hook event into a trigger
    ///
    /// The vibration binding fires on both press and release; the intensity
    /// bindings fire on press only (auto-repeat included).
    pub fn translate(&self, event: &EventType) -> Option<TriggerEvent> {
        match event {
            EventType::KeyPress(key) => {
                if key_matches(&self.vibration, *key) {
                    Some(TriggerEvent::VibrateStart)
                } else if key_matches(&self.increase, *key) {
                    Some(TriggerEvent::IntensityIncrease)
                } else if key_matches(&self.decrease, *key) {
                    Some(TriggerEvent::IntensityDecrease)
                } else {
                    None
                }
            }
            EventType::KeyRelease(key) if key_matches(&self.vibration, *key) => {
                Some(TriggerEvent::VibrateStop)
            }
            EventType::ButtonPress(button) if button_matches(&self.vibration, *button) => {
                Some(TriggerEvent::VibrateStart)
            }
            EventType::ButtonRelease(button) if button_matches(&self.vibration, *button) => {
                Some(TriggerEvent::VibrateStop)
            }
            _ => None,
        }
    }
}

fn key_matches(binding: &Binding, key: rdev::Key) -> bool {
    match binding {
        Binding::Key(name) => hook_keys(name).is_some_and(|keys| keys.contains(&key)),
        Binding::Mouse(_) => false,
    }
}

fn button_matches(binding: &Binding, button: rdev::Button) -> bool {
    match binding {
        Binding::Mouse(mouse) => mouse.hook_button() == button,
        Binding::Key(_) => false,
    }
}

/// Shared handle for changing what the hook listens for
///
/// Cheap to clone; all clones see the same table.
#[derive(Debug, Clone)]
pub struct HookControl {
    table: Arc<RwLock<BindingTable>>,
    suspended: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<HapticError>>>,
}

impl HookControl {
    /// Create a control handle around `table`
    pub fn new(table: BindingTable) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
            suspended: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot of the current bindings
    pub fn bindings(&self) -> BindingTable {
        self.table.read().clone()
    }

    /// Replace the binding for `kind`
    pub fn rebind(&self, kind: BindingKind, binding: Binding) {
        debug!("Hook binding for {} set to {}", kind.label(), binding);
        self.table.write().set(kind, binding);
    }

    /// Stop emitting triggers (while a rebind prompt has focus)
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    /// Whether triggers are currently suppressed
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Record why the hook stopped
    pub fn report_failure(&self, error: HapticError) {
        *self.failure.lock() = Some(error);
    }

    /// Take the recorded hook failure, if any
    pub fn take_failure(&self) -> Option<HapticError> {
        self.failure.lock().take()
    }

    /// Translate an event unless suspended
    pub fn translate(&self, event: &EventType) -> Option<TriggerEvent> {
        if self.is_suspended() {
            return None;
        }
        self.table.read().translate(event)
    }
}

/// Global input hook feeding trigger events to the controller
pub struct InputHook {
    control: HookControl,
    sender: mpsc::SyncSender<TriggerEvent>,
}

impl InputHook {
    /// Create a hook that reports triggers on `sender`
    pub fn new(control: HookControl, sender: mpsc::SyncSender<TriggerEvent>) -> Self {
        Self { control, sender }
    }

    /// Start the hook thread
    ///
    /// `rdev::listen` only returns on failure. The error is recorded on the
    /// `HookControl` and the sender dropped, which the controller observes as
    /// the trigger channel disconnecting.
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || {
            let Self { control, sender } = self;
            info!("Installing global keyboard and mouse hook");

            let listener = control.clone();
            let result = rdev::listen(move |event| {
                let Some(trigger) = listener.translate(&event.event_type) else {
                    return;
                };
                // Never block the OS hook callback
                match sender.try_send(trigger) {
                    Ok(()) => {}
                    Err(mpsc::TrySendError::Full(dropped)) => {
                        warn!("Trigger queue full, dropping {:?}", dropped);
                    }
                    Err(mpsc::TrySendError::Disconnected(_)) => {
                        debug!("Trigger receiver gone, ignoring {:?}", trigger);
                    }
                }
            });

            if let Err(e) = result {
                let error = HapticError::InputHookError(StringError::new(format!("{e:?}")));
                error!("Global input hook stopped: {}", error);
                control.report_failure(error);
            }
        })
    }
}
