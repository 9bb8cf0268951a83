//! Media acquisition for the Detection page.
//!
//! This module owns every scarce resource the console touches:
//! - the camera stream ([`camera`], with the nokhwa backend in `native`)
//! - still capture from the live stream ([`capture`])
//! - the preview file for the active blob ([`preview`])
//!
//! [`MediaSourceManager`] is the single owner tying them together.

pub mod camera;
pub mod capture;
#[cfg(feature = "camera-nokhwa")]
mod native;
pub mod preview;
pub mod source;

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

pub use camera::{CameraDevice, CameraError, TestPatternCamera, VideoStream, camera_for};
pub use capture::{CaptureError, capture_file_name, encode_jpeg};
pub use preview::PreviewHandle;
pub use source::{MediaSourceManager, load_media_file};

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{0} is empty")]
    EmptyPayload(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preview path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
