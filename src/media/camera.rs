//! Camera devices and the exclusively owned camera session.

use crate::metrics::Metrics;
use crate::models::{CameraBackend, CameraSettings};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Device-access failures. None of these stop the console; the user is told and
/// the current selection stays as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Camera backend '{0}' is not available in this build")]
    BackendNotCompiled(&'static str),

    /// Another action changed the selection while the device was being opened
    #[error("Camera request was superseded by a later action")]
    Superseded,
}

/// A running video stream.
///
/// Implementations must be safe to `stop()` more than once.
pub trait VideoStream: Send {
    /// Most recent decoded frame, or `None` if no frame has arrived yet
    fn latest_frame(&mut self) -> Option<RgbImage>;

    /// Native frame size as delivered by the device
    fn resolution(&self) -> (u32, u32);

    /// Stop every underlying track
    fn stop(&mut self);
}

/// Something that can hand out exclusive access to a capture device
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError>;

    fn name(&self) -> String;
}

/// Ownership of an open stream.
///
/// Created only by [`MediaSourceManager::install_camera`](super::MediaSourceManager::install_camera).
/// Dropping the session stops the stream, so every path that ends a session
/// (stop, file selection, capture, reset, teardown) releases the device.
pub(crate) struct CameraSession {
    stream: Box<dyn VideoStream>,
    metrics: Arc<Metrics>,
    opened_at: Instant,
}

impl CameraSession {
    pub(crate) fn new(stream: Box<dyn VideoStream>, metrics: Arc<Metrics>) -> Self {
        metrics.record_camera_acquired();
        let (width, height) = stream.resolution();
        tracing::info!("Camera session opened at {}x{}", width, height);

        Self {
            stream,
            metrics,
            opened_at: Instant::now(),
        }
    }

    pub(crate) fn latest_frame(&mut self) -> Option<RgbImage> {
        self.stream.latest_frame()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stream.stop();
        self.metrics.record_camera_released();
        tracing::info!(
            "Camera session closed after {:.1}s",
            self.opened_at.elapsed().as_secs_f32()
        );
    }
}

/// Synthetic camera producing a moving gradient at a fixed size
#[derive(Debug, Clone)]
pub struct TestPatternCamera {
    width: u32,
    height: u32,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait]
impl CameraDevice for TestPatternCamera {
    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
        Ok(Box::new(TestPatternStream {
            width: self.width,
            height: self.height,
            tick: 0,
            stopped: false,
        }))
    }

    fn name(&self) -> String {
        format!("test-pattern {}x{}", self.width, self.height)
    }
}

struct TestPatternStream {
    width: u32,
    height: u32,
    tick: u32,
    stopped: bool,
}

impl VideoStream for TestPatternStream {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        if self.stopped {
            return None;
        }

        self.tick = self.tick.wrapping_add(1);
        let tick = self.tick;
        let (w, h) = (self.width.max(1), self.height.max(1));

        Some(RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                (x * 255 / w) as u8,
                (y * 255 / h) as u8,
                (tick.wrapping_mul(7) % 256) as u8,
            ])
        }))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Stand-in used when the configured backend was not compiled in
#[derive(Debug, Clone)]
#[cfg_attr(feature = "camera-nokhwa", allow(dead_code))]
pub struct UnsupportedCamera {
    backend: &'static str,
}

#[async_trait]
impl CameraDevice for UnsupportedCamera {
    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
        Err(CameraError::BackendNotCompiled(self.backend))
    }

    fn name(&self) -> String {
        format!("{} (unavailable)", self.backend)
    }
}

/// Build the camera device selected in the configuration
pub fn camera_for(settings: &CameraSettings) -> Arc<dyn CameraDevice> {
    match settings.backend {
        CameraBackend::TestPattern => {
            Arc::new(TestPatternCamera::new(settings.width, settings.height))
        }
        #[cfg(feature = "camera-nokhwa")]
        CameraBackend::Native => Arc::new(super::native::NativeCamera::new(
            settings.device_index,
            settings.width,
            settings.height,
        )),
        #[cfg(not(feature = "camera-nokhwa"))]
        CameraBackend::Native => Arc::new(UnsupportedCamera { backend: "native" }),
    }
}
