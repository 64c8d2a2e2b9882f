//! Vibration trigger state
//!
//! Tracks whether the vibration trigger is held and the intensity to use.
//! Every method returns the intensity that must be sent to the device, or
//! `None` when nothing needs to be sent.

/// Step used by the increase and decrease triggers
pub const INTENSITY_STEP: f64 = 0.1;

/// Hold-to-vibrate state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibrationState {
    vibrating: bool,
    intensity: f64,
}

impl Default for VibrationState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl VibrationState {
    /// Create an idle state with the given stored intensity
    pub fn new(intensity: f64) -> Self {
        Self {
            vibrating: false,
            intensity: clamp_intensity(intensity),
        }
    }

    /// Whether the trigger is currently held
    pub fn is_vibrating(&self) -> bool {
        self.vibrating
    }

    /// Stored intensity (0.0-1.0)
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Trigger pressed
    ///
    /// Starts vibrating at the stored intensity when a device is connected.
    /// Key auto-repeat delivers repeated presses; those are no-ops.
    pub fn press(&mut self, connected: bool) -> Option<f64> {
        if !connected || self.vibrating {
            return None;
        }
        self.vibrating = true;
        Some(self.intensity)
    }

    /// Trigger released
    pub fn release(&mut self) -> Option<f64> {
        if !self.vibrating {
            return None;
        }
        self.vibrating = false;
        Some(0.0)
    }

    /// Raise the intensity by one step
    pub fn increase(&mut self) -> Option<f64> {
        self.step(INTENSITY_STEP)
    }

    /// Lower the intensity by one step
    pub fn decrease(&mut self) -> Option<f64> {
        self.step(-INTENSITY_STEP)
    }

    fn step(&mut self, delta: f64) -> Option<f64> {
        self.intensity = clamp_intensity(round_to(self.intensity + delta, 10.0));
        self.resend()
    }

    /// Set the intensity from the slider (0.01 resolution)
    ///
    /// Non-finite values are ignored.
    pub fn set_intensity(&mut self, intensity: f64) -> Option<f64> {
        if !intensity.is_finite() {
            return None;
        }
        self.intensity = clamp_intensity(round_to(intensity, 100.0));
        self.resend()
    }

    /// Forget the held trigger (device went away)
    pub fn reset(&mut self) {
        self.vibrating = false;
    }

    fn resend(&self) -> Option<f64> {
        self.vibrating.then_some(self.intensity)
    }
}

fn clamp_intensity(intensity: f64) -> f64 {
    if intensity.is_finite() {
        // Adding 0.0 turns -0.0 from rounding into 0.0
        intensity.clamp(0.0, 1.0) + 0.0
    } else {
        1.0
    }
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

/// Format an intensity for the status line
///
/// Always at least one decimal and at most two: `1.0`, `0.7`, `0.55`.
pub fn format_intensity(intensity: f64) -> String {
    let mut text = format!("{:.2}", round_to(intensity, 100.0));
    if text.ends_with('0') {
        text.pop();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_intensity;
    use proptest::prelude::*;

    #[test]
    fn test_press_requires_connection() {
        let mut state = VibrationState::new(0.6);
        assert_eq!(state.press(false), None);
        assert!(!state.is_vibrating());
    }

    #[test]
    fn test_press_and_release() {
        let mut state = VibrationState::new(0.6);
        assert_eq!(state.press(true), Some(0.6));
        assert!(state.is_vibrating());
        assert_eq!(state.release(), Some(0.0));
        assert!(!state.is_vibrating());
    }

    #[test]
    fn test_auto_repeat_press_is_noop() {
        let mut state = VibrationState::new(0.6);
        state.press(true);
        assert_eq!(state.press(true), None);
        assert_eq!(state.press(true), None);
    }

    #[test]
    fn test_release_without_press_is_noop() {
        let mut state = VibrationState::default();
        assert_eq!(state.release(), None);
    }

    #[test]
    fn test_increase_clamps_at_max() {
        let mut state = VibrationState::new(0.95);
        assert_eq!(state.increase(), None);
        assert_intensity(state.intensity(), 1.0);
        state.increase();
        assert_intensity(state.intensity(), 1.0);
    }

    #[test]
    fn test_decrease_clamps_at_zero() {
        let mut state = VibrationState::new(0.1);
        state.decrease();
        assert_intensity(state.intensity(), 0.0);
        state.decrease();
        assert_intensity(state.intensity(), 0.0);
    }

    #[test]
    fn test_decrease_below_one_step_is_positive_zero() {
        let mut state = VibrationState::new(1.0);
        state.set_intensity(0.07);
        state.press(true);

        // 0.07 - 0.1 rounds to -0.0
        let sent = state.decrease().unwrap();
        assert!(sent.is_sign_positive());
        assert!(state.intensity().is_sign_positive());
        assert_eq!(format_intensity(state.intensity()), "0.0");
    }

    #[test]
    fn test_step_rounds_to_one_decimal() {
        let mut state = VibrationState::new(0.7);
        state.increase();
        // 0.7 + 0.1 is 0.7999999999999999 before rounding
        assert_intensity(state.intensity(), 0.8);
    }

    #[test]
    fn test_changes_resent_while_vibrating() {
        let mut state = VibrationState::new(0.5);
        state.press(true);
        assert_eq!(state.increase(), Some(0.6));
        assert_eq!(state.decrease(), Some(0.5));
        assert_eq!(state.set_intensity(0.25), Some(0.25));
    }

    #[test]
    fn test_set_intensity_clamps_and_rounds() {
        let mut state = VibrationState::default();
        state.set_intensity(1.7);
        assert_intensity(state.intensity(), 1.0);
        state.set_intensity(-0.2);
        assert_intensity(state.intensity(), 0.0);
        state.set_intensity(0.333);
        assert_intensity(state.intensity(), 0.33);
    }

    #[test]
    fn test_set_intensity_ignores_nan() {
        let mut state = VibrationState::new(0.4);
        assert_eq!(state.set_intensity(f64::NAN), None);
        assert_intensity(state.intensity(), 0.4);
    }

    #[test]
    fn test_reset_clears_vibrating() {
        let mut state = VibrationState::new(0.4);
        state.press(true);
        state.reset();
        assert!(!state.is_vibrating());
        assert_eq!(state.release(), None);
    }

    #[test]
    fn test_format_intensity() {
        assert_eq!(format_intensity(1.0), "1.0");
        assert_eq!(format_intensity(0.7), "0.7");
        assert_eq!(format_intensity(0.55), "0.55");
        assert_eq!(format_intensity(0.0), "0.0");
        assert_eq!(format_intensity(0.30000000000000004), "0.3");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Press,
        Release,
        Increase,
        Decrease,
        Set(f64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Press),
            Just(Op::Release),
            Just(Op::Increase),
            Just(Op::Decrease),
            (-2.0f64..3.0).prop_map(Op::Set),
        ]
    }

    proptest! {
        #[test]
        fn prop_intensity_stays_in_range(start in -1.0f64..2.0, ops in prop::collection::vec(op(), 0..50)) {
            let mut state = VibrationState::new(start);
            for op in ops {
                let sent = match op {
                    Op::Press => state.press(true),
                    Op::Release => state.release(),
                    Op::Increase => state.increase(),
                    Op::Decrease => state.decrease(),
                    Op::Set(value) => state.set_intensity(value),
                };
                prop_assert!((0.0..=1.0).contains(&state.intensity()));
                if let Some(sent) = sent {
                    prop_assert!((0.0..=1.0).contains(&sent));
                }
            }
        }

        #[test]
        fn prop_release_always_sends_zero_after_press(start in 0.0f64..=1.0) {
            let mut state = VibrationState::new(start);
            prop_assert!(state.press(true).is_some());
            prop_assert_eq!(state.release(), Some(0.0));
        }

        #[test]
        fn prop_format_has_one_or_two_decimals(value in 0.0f64..=1.0) {
            let text = format_intensity(value);
            let decimals = text.split('.').nth(1).map_or(0, str::len);
            prop_assert!(decimals == 1 || decimals == 2, "{}", text);
        }
    }
}
