//! Data models for the PPE operator console.
//!
//! - [`ConsoleState`]: cloneable snapshot of what the Detection page shows
//! - [`SubmissionState`]: the submission state machine with pure transition functions
//! - [`MediaBlob`] / [`SelectionSummary`]: the active media and its display summary
//! - [`DetectionResult`], [`DetectionRecord`], [`DashboardStats`]: backend payloads
//! - [`ConsoleConfig`]: settings loaded from `console.yaml`
//!
//! # Architecture Note
//!
//! Only data lives here. Exclusively owned resources (the camera stream and the
//! preview file) belong to [`crate::media::MediaSourceManager`], and state
//! mutation goes through [`crate::state::StateManager`].

pub mod app_state;
pub mod config;
pub mod detection;
pub mod media;

pub use app_state::{ConsoleState, SubmissionState, TransitionError};
pub use config::{
    ApiSettings, CameraBackend, CameraSettings, ConsoleConfig, HistorySettings, LoggingSettings,
    PreviewSettings,
};
pub use detection::{DashboardStats, DetectionRecord, DetectionResult};
pub use media::{MediaBlob, SelectionKind, SelectionSummary, mime_from_extension};
