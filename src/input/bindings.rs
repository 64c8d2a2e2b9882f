//! Trigger bindings and key names
//!
//! Bindings are persisted as plain strings (`"space"`, `"left shift"`, `"+"`,
//! `"left"` for the left mouse button). This module parses those names,
//! maps them to the hook's key codes and translates GUI key-event text into
//! the same names when the user rebinds a trigger.

use crate::error::{HapticError, Result};
use rdev::Key;
use std::fmt;

/// Mouse buttons that can trigger vibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Wheel button
    Middle,
    /// Secondary button
    Right,
}

impl MouseButton {
    /// Persisted name (`left`, `middle`, `right`)
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        }
    }

    /// Parse a persisted mouse-button name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "middle" => Some(Self::Middle),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Matching hook button
    pub fn hook_button(self) -> rdev::Button {
        match self {
            Self::Left => rdev::Button::Left,
            Self::Middle => rdev::Button::Middle,
            Self::Right => rdev::Button::Right,
        }
    }
}

/// A keyboard key or mouse button bound to a trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Canonical key name
    Key(String),
    /// Mouse button
    Mouse(MouseButton),
}

impl Default for Binding {
    fn default() -> Self {
        Self::Key("space".to_string())
    }
}

impl Binding {
    /// Human-readable label for the GUI
    pub fn label(&self) -> String {
        match self {
            Self::Key(name) => name.clone(),
            Self::Mouse(MouseButton::Left) => "Left Mouse".to_string(),
            Self::Mouse(MouseButton::Middle) => "Middle Mouse".to_string(),
            Self::Mouse(MouseButton::Right) => "Right Mouse".to_string(),
        }
    }

    /// Whether this binding is a mouse button
    pub fn is_mouse(&self) -> bool {
        matches!(self, Self::Mouse(_))
    }

    /// Whether both bindings react to at least one common key or button
    ///
    /// `+` listens on the `=` key as well, so it overlaps `=`.
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mouse(a), Self::Mouse(b)) => a == b,
            (Self::Key(a), Self::Key(b)) => match (hook_keys(a), hook_keys(b)) {
                (Some(a), Some(b)) => a.iter().any(|key| b.contains(key)),
                _ => a == b,
            },
            _ => false,
        }
    }
}

impl fmt::Display for Binding {
    /// Persisted form, accepted back by [`parse_binding`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(name) => f.write_str(name),
            Self::Mouse(button) => f.write_str(button.name()),
        }
    }
}

/// Which trigger a binding drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Vibrate while held
    Vibration,
    /// Raise intensity one step
    IntensityIncrease,
    /// Lower intensity one step
    IntensityDecrease,
}

impl BindingKind {
    /// All kinds in display order
    pub const ALL: [Self; 3] = [
        Self::Vibration,
        Self::IntensityIncrease,
        Self::IntensityDecrease,
    ];

    /// Short lowercase label used in messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Vibration => "vibration",
            Self::IntensityIncrease => "intensity increase",
            Self::IntensityDecrease => "intensity decrease",
        }
    }

    /// Whether `binding` may be used for this kind
    ///
    /// Mouse buttons can only drive the vibration trigger.
    pub fn accepts(self, binding: &Binding) -> bool {
        !binding.is_mouse() || self == Self::Vibration
    }
}

/// Parse a persisted binding name
///
/// Accepts canonical names, a few common aliases (`return`, `plus`, `ctrl`,
/// ...) and the mouse-button names `left`, `middle` and `right`. Matching is
/// case-insensitive; the returned key name is canonical.
pub fn parse_binding(name: &str) -> Result<Binding> {
    let normalized = name.trim().to_lowercase();
    if let Some(button) = MouseButton::from_name(&normalized) {
        return Ok(Binding::Mouse(button));
    }

    let canonical = canonical_key_name(&normalized);
    if hook_keys(canonical).is_some() {
        Ok(Binding::Key(canonical.to_string()))
    } else {
        Err(HapticError::InvalidKey(name.to_string()))
    }
}

/// Map aliases onto canonical key names
fn canonical_key_name(name: &str) -> &str {
    match name {
        "return" => "enter",
        "spacebar" | " " => "space",
        "plus" => "+",
        "minus" => "-",
        "equal" | "equals" => "=",
        "esc" | "escape" => "escape",
        "shift" | "shift_l" => "left shift",
        "shift_r" => "right shift",
        "ctrl" | "control" | "control_l" => "left ctrl",
        "control_r" => "right ctrl",
        "alt" | "alt_l" => "left alt",
        "alt_r" | "alt gr" | "altgr" => "right alt",
        "up" => "up arrow",
        "down" => "down arrow",
        "pageup" | "prior" => "page up",
        "pagedown" | "next" => "page down",
        "capslock" => "caps lock",
        "del" => "delete",
        "ins" => "insert",
        other => other,
    }
}

/// Hook key codes matched by a canonical key name
///
/// `+` and `-` also match their keypad counterparts. Returns `None` for
/// names that cannot be bound (including `escape`, which cancels rebinding).
pub fn hook_keys(name: &str) -> Option<&'static [Key]> {
    let keys: &'static [Key] = match name {
        "a" => &[Key::KeyA],
        "b" => &[Key::KeyB],
        "c" => &[Key::KeyC],
        "d" => &[Key::KeyD],
        "e" => &[Key::KeyE],
        "f" => &[Key::KeyF],
        "g" => &[Key::KeyG],
        "h" => &[Key::KeyH],
        "i" => &[Key::KeyI],
        "j" => &[Key::KeyJ],
        "k" => &[Key::KeyK],
        "l" => &[Key::KeyL],
        "m" => &[Key::KeyM],
        "n" => &[Key::KeyN],
        "o" => &[Key::KeyO],
        "p" => &[Key::KeyP],
        "q" => &[Key::KeyQ],
        "r" => &[Key::KeyR],
        "s" => &[Key::KeyS],
        "t" => &[Key::KeyT],
        "u" => &[Key::KeyU],
        "v" => &[Key::KeyV],
        "w" => &[Key::KeyW],
        "x" => &[Key::KeyX],
        "y" => &[Key::KeyY],
        "z" => &[Key::KeyZ],
        "0" => &[Key::Num0, Key::Kp0],
        "1" => &[Key::Num1, Key::Kp1],
        "2" => &[Key::Num2, Key::Kp2],
        "3" => &[Key::Num3, Key::Kp3],
        "4" => &[Key::Num4, Key::Kp4],
        "5" => &[Key::Num5, Key::Kp5],
        "6" => &[Key::Num6, Key::Kp6],
        "7" => &[Key::Num7, Key::Kp7],
        "8" => &[Key::Num8, Key::Kp8],
        "9" => &[Key::Num9, Key::Kp9],
        "f1" => &[Key::F1],
        "f2" => &[Key::F2],
        "f3" => &[Key::F3],
        "f4" => &[Key::F4],
        "f5" => &[Key::F5],
        "f6" => &[Key::F6],
        "f7" => &[Key::F7],
        "f8" => &[Key::F8],
        "f9" => &[Key::F9],
        "f10" => &[Key::F10],
        "f11" => &[Key::F11],
        "f12" => &[Key::F12],
        "space" => &[Key::Space],
        "enter" => &[Key::Return, Key::KpReturn],
        "tab" => &[Key::Tab],
        "backspace" => &[Key::Backspace],
        "delete" => &[Key::Delete],
        "insert" => &[Key::Insert],
        "home" => &[Key::Home],
        "end" => &[Key::End],
        "page up" => &[Key::PageUp],
        "page down" => &[Key::PageDown],
        "up arrow" => &[Key::UpArrow],
        "down arrow" => &[Key::DownArrow],
        "left arrow" => &[Key::LeftArrow],
        "right arrow" => &[Key::RightArrow],
        "left shift" => &[Key::ShiftLeft],
        "right shift" => &[Key::ShiftRight],
        "left ctrl" => &[Key::ControlLeft],
        "right ctrl" => &[Key::ControlRight],
        "left alt" => &[Key::Alt],
        "right alt" => &[Key::AltGr],
        "caps lock" => &[Key::CapsLock],
        "+" => &[Key::Equal, Key::KpPlus],
        "-" => &[Key::Minus, Key::KpMinus],
        "=" => &[Key::Equal],
        "," => &[Key::Comma],
        "." => &[Key::Dot],
        "/" => &[Key::Slash, Key::KpDivide],
        ";" => &[Key::SemiColon],
        "'" => &[Key::Quote],
        "[" => &[Key::LeftBracket],
        "]" => &[Key::RightBracket],
        "\\" => &[Key::BackSlash],
        "`" => &[Key::BackQuote],
        _ => return None,
    };
    Some(keys)
}

/// Result of translating a GUI key event while rebinding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiKey {
    /// Escape: close the prompt without changes
    Cancel,
    /// A bindable key, by canonical name
    Named(String),
    /// A key with no binding equivalent (raw text kept for the message)
    Unknown(String),
}

/// Translate the text of a GUI key event into a key name
///
/// The window toolkit reports special keys as private-use codepoints
/// (shift is `U+0010`, F1 is `U+F704`, ...) and printable keys as the
/// typed character. Letters are folded to lowercase so `Shift+A` binds `a`.
pub fn key_name_from_ui_text(text: &str) -> UiKey {
    let mut chars = text.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return UiKey::Unknown(text.to_string());
    };

    let name = match c {
        '\u{1b}' => return UiKey::Cancel,
        '\u{8}' => "backspace",
        '\u{9}' => "tab",
        '\u{a}' | '\u{d}' => "enter",
        '\u{7f}' => "delete",
        '\u{10}' => "left shift",
        '\u{11}' => "left ctrl",
        '\u{12}' => "left alt",
        '\u{13}' => "right alt",
        '\u{14}' => "caps lock",
        '\u{15}' => "right shift",
        '\u{16}' => "right ctrl",
        ' ' => "space",
        '\u{F700}' => "up arrow",
        '\u{F701}' => "down arrow",
        '\u{F702}' => "left arrow",
        '\u{F703}' => "right arrow",
        '\u{F704}'..='\u{F70F}' => {
            let index = u32::from(c) - 0xF704 + 1;
            return UiKey::Named(format!("f{index}"));
        }
        '\u{F727}' => "insert",
        '\u{F729}' => "home",
        '\u{F72B}' => "end",
        '\u{F72C}' => "page up",
        '\u{F72D}' => "page down",
        printable => {
            let lowered = printable.to_lowercase().to_string();
            return if hook_keys(&lowered).is_some() {
                UiKey::Named(lowered)
            } else {
                UiKey::Unknown(text.to_string())
            };
        }
    };
    UiKey::Named(name.to_string())
}
