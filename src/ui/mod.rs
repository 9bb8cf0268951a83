// UI module - operator-facing layer
//
// This module contains:
// - DetectionController: wires operator actions to media, state and the backend
// - console: the interactive terminal front end
// - render: plain-text views of results, history and the dashboard

pub mod console;
pub mod controller;
pub mod render;

pub use console::{Command, run_console};
pub use controller::DetectionController;
