//! GUI module
//!
//! Provides the Slint-based main window: trigger buttons, rebind and
//! intensity prompts, and state synchronization with the application
//! controller.

pub mod gui_controller;

pub use gui_controller::GuiController;
