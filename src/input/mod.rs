//! Input trigger module
//!
//! Turns global keyboard and mouse activity into vibration triggers.
//!
//! # Architecture
//!
//! - `Binding`: a key name or mouse button, persisted as a string
//! - `BindingTable`: the vibration, increase and decrease bindings
//! - `HookControl`: shared handle used to rebind or suspend the hook
//! - `InputHook`: background thread running the OS-level hook
//!
//! # Event Flow
//!
//! ```text
//! OS hook → rdev::Event → BindingTable::translate → TriggerEvent → AppController
//! ```
//!
//! Only the vibration trigger may be bound to a mouse button; the intensity
//! triggers are keyboard-only.

pub mod bindings;
pub mod hook;

pub use bindings::{
    Binding, BindingKind, MouseButton, UiKey, hook_keys, key_name_from_ui_text, parse_binding,
};
pub use hook::{BindingTable, HookControl, InputHook, TriggerEvent};
