//! GUI controller
//!
//! Connects the Slint main window to the `AppController`. Window callbacks
//! call into the controller; controller state reaches the window through the
//! `AppState` channel, drained by a timer on the GUI thread.

use crate::MainWindow;
use anyhow::{Context, Result};
use hapticbind::controller::{AppController, AppState, RebindOutcome};
use hapticbind::input::{Binding, BindingKind, MouseButton};
use parking_lot::Mutex;
use slint::{ComponentHandle, Timer, TimerMode};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often pending state updates are applied to the window
const STATE_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Owns the main window and wires it to the application controller
pub struct GuiController {
    window: MainWindow,
    controller: Arc<Mutex<AppController>>,
    state_receiver: mpsc::Receiver<AppState>,
}

impl GuiController {
    /// Create the main window
    pub fn new(
        controller: Arc<Mutex<AppController>>,
        state_receiver: mpsc::Receiver<AppState>,
    ) -> Result<Self> {
        let window = MainWindow::new().context("Failed to create main window")?;
        Ok(Self {
            window,
            controller,
            state_receiver,
        })
    }

    /// Show the window and run the event loop until Quit or window close
    pub fn run(self) -> Result<()> {
        let Self {
            window,
            controller,
            state_receiver,
        } = self;

        Self::wire_main_callbacks(&window, &controller);
        Self::wire_rebind_callbacks(&window, &controller);
        Self::wire_intensity_callbacks(&window, &controller);

        let state_timer = Timer::default();
        let weak = window.as_weak();
        state_timer.start(TimerMode::Repeated, STATE_POLL_INTERVAL, move || {
            // Only the newest snapshot matters
            if let Some(state) = state_receiver.try_iter().last()
                && let Some(window) = weak.upgrade()
            {
                apply_state(&window, &state);
            }
        });

        info!("Main window shown");
        window.run().context("Slint event loop failed")?;
        state_timer.stop();
        info!("Main window closed");
        Ok(())
    }

    fn wire_main_callbacks(window: &MainWindow, controller: &Arc<Mutex<AppController>>) {
        let c = Arc::clone(controller);
        window.on_connect_clicked(move || c.lock().connect());

        let c = Arc::clone(controller);
        window.on_vibrate_pressed(move || c.lock().start_vibration());

        let c = Arc::clone(controller);
        window.on_vibrate_released(move || c.lock().stop_vibration());

        window.on_quit_clicked(|| {
            info!("Quit requested");
            if let Err(e) = slint::quit_event_loop() {
                warn!("Failed to quit event loop: {}", e);
            }
        });
    }

    fn wire_rebind_callbacks(window: &MainWindow, controller: &Arc<Mutex<AppController>>) {
        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_rebind_requested(move |index| {
            let (Some(kind), Some(window)) = (kind_from_index(index), weak.upgrade()) else {
                return;
            };
            c.lock().begin_rebind(kind);
            window.set_rebind_message("".into());
            window.set_message("".into());
            window.set_rebind_kind(index);
        });

        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_rebind_key(move |index, text| {
            let (Some(kind), Some(window)) = (kind_from_index(index), weak.upgrade()) else {
                return;
            };
            let outcome = c.lock().rebind_key_text(kind, &text);
            show_outcome(&window, kind, &outcome);
        });

        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_rebind_mouse(move |index, name| {
            let (Some(kind), Some(window)) = (kind_from_index(index), weak.upgrade()) else {
                return;
            };
            let outcome = match MouseButton::from_name(&name) {
                Some(button) => c.lock().rebind(kind, Binding::Mouse(button)),
                None => RebindOutcome::Invalid,
            };
            show_outcome(&window, kind, &outcome);
        });

        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_rebind_cancelled(move || {
            c.lock().cancel_rebind();
            if let Some(window) = weak.upgrade() {
                window.set_rebind_kind(-1);
            }
        });
    }

    fn wire_intensity_callbacks(window: &MainWindow, controller: &Arc<Mutex<AppController>>) {
        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_intensity_requested(move || {
            if let Some(window) = weak.upgrade() {
                window.set_slider_value(to_slider(c.lock().vibration().intensity()));
                window.set_intensity_open(true);
            }
        });

        let c = Arc::clone(controller);
        let weak = window.as_weak();
        window.on_intensity_accepted(move |value| {
            c.lock().set_intensity(f64::from(value));
            if let Some(window) = weak.upgrade() {
                window.set_intensity_open(false);
            }
        });
    }
}

fn kind_from_index(index: i32) -> Option<BindingKind> {
    let kind = usize::try_from(index)
        .ok()
        .and_then(|i| BindingKind::ALL.get(i).copied());
    if kind.is_none() {
        debug!("Ignoring rebind callback for unknown kind {}", index);
    }
    kind
}

/// Close the prompt or show the outcome inside it
fn show_outcome(window: &MainWindow, kind: BindingKind, outcome: &RebindOutcome) {
    match outcome {
        RebindOutcome::Cancelled => window.set_rebind_kind(-1),
        RebindOutcome::Rebound(_) => {
            window.set_rebind_kind(-1);
            window.set_message(outcome.summary(kind).into());
        }
        _ => window.set_rebind_message(outcome.summary(kind).into()),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "Intensity is in [0, 1] with two decimals, well within f32 precision"
)]
fn to_slider(intensity: f64) -> f32 {
    intensity as f32
}

fn apply_state(window: &MainWindow, state: &AppState) {
    window.set_status(state.status.as_str().into());
    window.set_notice(state.notice.as_str().into());
    window.set_connect_enabled(state.connect_enabled);
    window.set_vibrate_enabled(state.vibrate_enabled);
    window.set_vibrating(state.vibrating);
    window.set_vibration_binding(state.vibration_binding.as_str().into());
    window.set_increase_binding(state.increase_binding.as_str().into());
    window.set_decrease_binding(state.decrease_binding.as_str().into());
}
