// PPE Console - operator console for PPE entry checks
//
// This is the library crate containing media acquisition, the detection
// submission pipeline and the display models. The binary crate (main.rs)
// provides the terminal entry point.

pub mod config;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod models;
pub mod presenter;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use media::MediaSourceManager;
pub use metrics::Metrics;
pub use models::{ConsoleConfig, ConsoleState, DetectionResult, MediaBlob, SubmissionState};
pub use state::{StateChange, StateManager};
pub use ui::DetectionController;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
