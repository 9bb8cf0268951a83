//! Still capture: live frame to JPEG blob.

use super::MediaError;
use crate::models::MediaBlob;
use chrono::{DateTime, Utc};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera is not running")]
    NoSession,

    #[error("Camera has not delivered a frame yet")]
    FrameNotReady,

    #[error("Image encoding failed: {0}")]
    Encoding(String),

    #[error("Failed to prepare captured image: {0}")]
    Media(#[from] MediaError),
}

/// Deterministic name for a capture taken at `at`
pub fn capture_file_name(at: DateTime<Utc>) -> String {
    format!("capture-{}.jpg", at.timestamp_millis())
}

/// Encode `frame` at its native size as a JPEG blob
pub fn encode_jpeg(frame: &RgbImage, quality: u8, at: DateTime<Utc>) -> Result<MediaBlob, CaptureError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(CaptureError::Encoding("frame has no pixels".to_string()));
    }

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(frame)
        .map_err(|e| CaptureError::Encoding(e.to_string()))?;

    if buf.is_empty() {
        return Err(CaptureError::Encoding("encoder produced no data".to_string()));
    }

    tracing::debug!(
        "Encoded {}x{} frame to {} bytes of JPEG",
        frame.width(),
        frame.height(),
        buf.len()
    );

    Ok(MediaBlob::new(buf, "image/jpeg", capture_file_name(at)))
}
