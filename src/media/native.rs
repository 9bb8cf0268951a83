//! Native capture device through nokhwa.
//!
//! nokhwa cameras are driven from a dedicated thread that keeps the most recent
//! decoded RGB frame. The stream handle only shares that slot and a stop flag,
//! so it stays `Send` regardless of the platform backend.

use super::camera::{CameraDevice, CameraError, VideoStream};
use async_trait::async_trait;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::{Camera, NokhwaError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

const REQUESTED_FPS: u32 = 30;

#[derive(Debug, Clone)]
pub struct NativeCamera {
    index: u32,
    width: u32,
    height: u32,
}

impl NativeCamera {
    pub fn new(index: u32, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
        }
    }
}

#[async_trait]
impl CameraDevice for NativeCamera {
    async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();

        let index = self.index;
        let requested = Resolution::new(self.width, self.height);
        let thread_latest = Arc::clone(&latest);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("ppe-camera".to_string())
            .spawn(move || capture_loop(index, requested, thread_latest, thread_stop, ready_tx))
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;

        let resolution = ready_rx
            .await
            .map_err(|_| CameraError::Unavailable("camera thread exited".to_string()))??;

        Ok(Box::new(NativeStream {
            latest,
            stop,
            handle: Some(handle),
            resolution,
        }))
    }

    fn name(&self) -> String {
        format!("camera #{}", self.index)
    }
}

struct NativeStream {
    latest: Arc<Mutex<Option<RgbImage>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    resolution: (u32, u32),
}

impl VideoStream for NativeStream {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Signals the capture thread and returns at once. The thread may sit in
    /// `camera.frame()` until the device answers, so it is never joined here.
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            reap_capture_thread(handle);
        }
    }
}

/// Join the capture thread off the caller's thread, or detach it outside a runtime
fn reap_capture_thread(handle: JoinHandle<()>) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(move || {
                if handle.join().is_err() {
                    tracing::error!("Camera thread panicked while stopping");
                }
            });
        }
        Err(_) => {
            tracing::debug!("No runtime to reap the camera thread; detaching it");
            drop(handle);
        }
    }
}

fn classify(err: &NokhwaError) -> CameraError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CameraError::PermissionDenied(message)
    } else {
        CameraError::Unavailable(message)
    }
}

fn capture_loop(
    index: u32,
    requested: Resolution,
    latest: Arc<Mutex<Option<RgbImage>>>,
    stop: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<(u32, u32), CameraError>>,
) {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
        requested,
        FrameFormat::MJPEG,
        REQUESTED_FPS,
    )));

    let mut camera = match Camera::new(CameraIndex::Index(index), format) {
        Ok(camera) => camera,
        Err(err) => {
            tracing::error!("Failed to open camera #{}: {}", index, err);
            let _ = ready_tx.send(Err(classify(&err)));
            return;
        }
    };

    if let Err(err) = camera.open_stream() {
        tracing::error!("Failed to start camera stream: {}", err);
        let _ = ready_tx.send(Err(classify(&err)));
        return;
    }

    let resolution = camera.resolution();
    tracing::info!(
        "Camera #{} streaming at {}x{} ({:?})",
        index,
        resolution.width(),
        resolution.height(),
        camera.camera_format().format()
    );
    let _ = ready_tx.send(Ok((resolution.width(), resolution.height())));

    while !stop.load(Ordering::Relaxed) {
        match camera.frame().and_then(|frame| frame.decode_image::<RgbFormat>()) {
            Ok(frame) => {
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(frame);
                }
            }
            Err(err) => {
                tracing::warn!("Camera frame read failed: {}", err);
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    if let Err(err) = camera.stop_stream() {
        tracing::error!("Failed to stop camera stream cleanly: {}", err);
    }
    tracing::debug!("Camera #{} capture thread finished", index);
}
