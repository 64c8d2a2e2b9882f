//! Configuration data models
//!
//! Settings are stored as a flat JSON object so that a `keybindings.json`
//! written by earlier releases keeps loading unchanged.

use crate::input::{Binding, BindingKind, parse_binding};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default address of the Intiface WebSocket server
pub const DEFAULT_SERVER_ADDRESS: &str = "ws://127.0.0.1:12345";

/// Persisted user settings
///
/// Every field falls back to its default individually, so a file that only
/// contains some of the keys still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Key or mouse button that vibrates while held
    pub vibration_key: String,
    /// Key that raises the intensity by one step
    pub intensity_increase_key: String,
    /// Key that lowers the intensity by one step
    pub intensity_decrease_key: String,
    /// Vibration intensity (0.0-1.0)
    pub vibration_intensity: f64,
    /// Intiface server WebSocket address
    pub server_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vibration_key: "space".to_string(),
            intensity_increase_key: "+".to_string(),
            intensity_decrease_key: "-".to_string(),
            vibration_intensity: 1.0,
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
        }
    }
}

impl Settings {
    /// Get the stored binding name for `kind`
    pub fn binding_name(&self, kind: BindingKind) -> &str {
        match kind {
            BindingKind::Vibration => &self.vibration_key,
            BindingKind::IntensityIncrease => &self.intensity_increase_key,
            BindingKind::IntensityDecrease => &self.intensity_decrease_key,
        }
    }

    /// Store `binding` as the binding for `kind`
    pub fn set_binding(&mut self, kind: BindingKind, binding: &Binding) {
        let name = binding.to_string();
        match kind {
            BindingKind::Vibration => self.vibration_key = name,
            BindingKind::IntensityIncrease => self.intensity_increase_key = name,
            BindingKind::IntensityDecrease => self.intensity_decrease_key = name,
        }
    }

    /// Parse the binding for `kind`, falling back to the default on bad input
    pub fn binding(&self, kind: BindingKind) -> Binding {
        let name = self.binding_name(kind);
        match parse_binding(name) {
            Ok(binding) if kind.accepts(&binding) => binding,
            _ => {
                let fallback = Self::default();
                warn!(
                    "Invalid {} binding {:?} in settings, using default {:?}",
                    kind.label(),
                    name,
                    fallback.binding_name(kind)
                );
                // Defaults are always valid names
                parse_binding(fallback.binding_name(kind)).unwrap_or(Binding::default())
            }
        }
    }

    /// Normalize values loaded from disk
    ///
    /// Clamps the intensity into `[0.0, 1.0]` (non-finite values reset to the
    /// default), replaces unparseable bindings with defaults and rewrites the
    /// remaining ones in canonical form. Bindings that share a key or button
    /// with each other are all reset to the defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.vibration_intensity.is_finite() {
            self.vibration_intensity = self.vibration_intensity.clamp(0.0, 1.0) + 0.0;
        } else {
            warn!(
                "Non-finite vibration intensity in settings, using {}",
                Self::default().vibration_intensity
            );
            self.vibration_intensity = Self::default().vibration_intensity;
        }

        let bindings = BindingKind::ALL.map(|kind| self.binding(kind));
        let overlapping = bindings
            .iter()
            .enumerate()
            .any(|(i, binding)| bindings[..i].iter().any(|earlier| earlier.overlaps(binding)));
        if overlapping {
            warn!("Settings bind one key to several triggers, restoring default bindings");
            let defaults = Self::default();
            self.vibration_key = defaults.vibration_key;
            self.intensity_increase_key = defaults.intensity_increase_key;
            self.intensity_decrease_key = defaults.intensity_decrease_key;
        } else {
            for (kind, binding) in BindingKind::ALL.into_iter().zip(&bindings) {
                self.set_binding(kind, binding);
            }
        }

        if self.server_address.trim().is_empty() {
            self.server_address = DEFAULT_SERVER_ADDRESS.to_string();
        }

        self
    }
}
