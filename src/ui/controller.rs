// Detection Controller - Bridges operator actions with state and media
//
// This module contains the DetectionController which coordinates between:
// - MediaSourceManager (camera session, preview file, active blob)
// - StateManager (console state and change events)
// - SubmissionController (remote detection call)
// - DetectionApi (history and dashboard queries)
//
// Every front end (the terminal console, tests) drives the Detection page
// through this type only.

use crate::media::{
    CameraDevice, CameraError, CaptureError, MediaError, MediaSourceManager, camera_for,
    load_media_file,
};
use crate::metrics::Metrics;
use crate::models::{ConsoleConfig, MediaBlob, SelectionSummary};
use crate::presenter::{DashboardView, HistoryView};
use crate::services::{
    ApiError, DetectionApi, HttpDetectionApi, SubmissionController, SubmissionError,
    SubmissionOutcome,
};
use crate::state::StateManager;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, Mutex};

/// Default directory for preview files when none is configured
pub fn default_preview_dir() -> Utf8PathBuf {
    let base = Utf8PathBuf::try_from(std::env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("."));
    base.join("ppe-console-previews")
}

/// Coordinator for every operator action on the Detection page
///
/// Cheap to clone; clones share the same media manager and state.
///
/// The media mutex is never held across an `.await`: camera acquisition and
/// the detection request both run unlocked, so a reset issued while either is
/// pending goes through immediately.
///
/// # Example
/// ```ignore
/// let metrics = Arc::new(Metrics::new());
/// let controller = DetectionController::from_config(&config, metrics)?;
///
/// controller.select_path("gate-3/worker.jpg".into()).await?;
/// let outcome = controller.submit().await?;
/// ```
#[derive(Clone)]
pub struct DetectionController {
    state_manager: Arc<StateManager>,
    media: Arc<Mutex<MediaSourceManager>>,
    camera: Arc<dyn CameraDevice>,
    submission: SubmissionController,
    api: Arc<dyn DetectionApi>,
    history_page_size: u32,
}

impl DetectionController {
    pub fn new(
        state_manager: Arc<StateManager>,
        media: MediaSourceManager,
        camera: Arc<dyn CameraDevice>,
        api: Arc<dyn DetectionApi>,
        history_page_size: u32,
    ) -> Self {
        let submission = SubmissionController::new((*state_manager).clone(), Arc::clone(&api));

        tracing::info!("Detection controller initialized (camera: {})", camera.name());

        Self {
            state_manager,
            media: Arc::new(Mutex::new(media)),
            camera,
            submission,
            api,
            history_page_size: history_page_size.max(1),
        }
    }

    /// Build the controller, HTTP client and camera backend from configuration
    pub fn from_config(config: &ConsoleConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let api = HttpDetectionApi::new(&config.api).context("Failed to create detection API client")?;

        let preview_dir = if config.preview.dir.trim().is_empty() {
            default_preview_dir()
        } else {
            Utf8PathBuf::from(config.preview.dir.trim())
        };
        tracing::debug!("Preview files go to {}", preview_dir);

        let state_manager = Arc::new(StateManager::with_metrics(Arc::clone(&metrics)));
        let media = MediaSourceManager::new(preview_dir, config.camera.jpeg_quality, metrics);

        Ok(Self::new(
            state_manager,
            media,
            camera_for(&config.camera),
            Arc::new(api),
            config.history.page_size,
        ))
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state_manager
    }

    pub fn camera_name(&self) -> String {
        self.camera.name()
    }

    /// Current preview file, if a blob is selected
    pub fn preview_path(&self) -> Option<Utf8PathBuf> {
        self.media.lock().unwrap().preview_path().map(Utf8Path::to_path_buf)
    }

    /// Path the current selection was loaded from
    pub fn source_path(&self) -> Option<Utf8PathBuf> {
        self.media.lock().unwrap().source_path().map(Utf8Path::to_path_buf)
    }

    // ===== Media selection =====

    /// Load a file from disk and make it the active selection
    pub async fn select_path(&self, path: &Utf8Path) -> Result<SelectionSummary, MediaError> {
        let blob = match load_media_file(path).await {
            Ok(blob) => blob,
            Err(e) => {
                self.state_manager.notify(format!("Failed to load file: {}", e));
                return Err(e);
            }
        };

        self.apply_selection(blob, Some(path.to_path_buf()))
    }

    /// Make an in-memory blob the active selection
    pub fn select_blob(&self, blob: MediaBlob) -> Result<SelectionSummary, MediaError> {
        self.apply_selection(blob, None)
    }

    fn apply_selection(
        &self,
        blob: MediaBlob,
        source: Option<Utf8PathBuf>,
    ) -> Result<SelectionSummary, MediaError> {
        let mut media = self.media.lock().unwrap();
        match media.select_file(blob, source) {
            Ok(summary) => {
                self.state_manager.media_selected(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                // The old selection may already be gone
                let remaining = media.summary();
                drop(media);
                if self.state_manager.read(|s| s.selection != remaining) {
                    self.state_manager.media_released(remaining);
                }
                self.state_manager.notify(format!("Failed to load media: {}", e));
                Err(e)
            }
        }
    }

    // ===== Camera =====

    /// Acquire the camera. On failure the current selection is left alone.
    ///
    /// If another action changes the selection while the device is opening,
    /// the new stream is released and [`CameraError::Superseded`] is returned.
    pub async fn start_camera(&self) -> Result<SelectionSummary, CameraError> {
        if self.media.lock().unwrap().is_camera_live() {
            tracing::debug!("Camera already live");
            return Ok(SelectionSummary::camera_live());
        }

        // Actions completed while the device opens win over this request
        let requested_at = self.state_manager.read(|s| s.generation);

        tracing::info!("Requesting {}", self.camera.name());
        let stream = match self.camera.open().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Camera acquisition failed: {}", e);
                self.state_manager.notify(format!("Failed to access camera: {}", e));
                return Err(e);
            }
        };

        let mut media = self.media.lock().unwrap();
        if self.state_manager.read(|s| s.generation) != requested_at {
            drop(media);
            let mut stream = stream;
            stream.stop();
            tracing::info!("Camera opened after a newer action; released it");
            return Err(CameraError::Superseded);
        }

        let summary = media.install_camera(stream);
        self.state_manager.camera_started();
        Ok(summary)
    }

    /// Release the camera if it is live. Safe to call at any time.
    pub fn stop_camera(&self) -> bool {
        let mut media = self.media.lock().unwrap();
        let stopped = media.stop_camera();
        let summary = media.summary();
        drop(media);

        if stopped {
            self.state_manager.media_released(summary);
        }
        stopped
    }

    /// Turn the current camera frame into the active selection
    pub fn capture_photo(&self) -> Result<SelectionSummary, CaptureError> {
        let mut media = self.media.lock().unwrap();
        match media.capture_photo() {
            Ok(summary) => {
                drop(media);
                self.state_manager.media_selected(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                let camera_lost = !media.is_camera_live();
                let remaining = media.summary();
                drop(media);

                if camera_lost && self.state_manager.read(|s| s.is_camera_live()) {
                    self.state_manager.media_released(remaining);
                }
                self.state_manager.notify(format!("Failed to capture image: {}", e));
                Err(e)
            }
        }
    }

    // ===== Submission =====

    /// Send the active blob for detection
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmissionError> {
        // Blob and generation are taken under the same lock
        let prepared = {
            let media = self.media.lock().unwrap();
            self.submission.prepare(media.active_blob())
        };

        match prepared {
            Ok(ticket) => Ok(self.submission.send(ticket).await),
            Err(e) => {
                self.state_manager.notify(e.to_string());
                Err(e)
            }
        }
    }

    /// Drop everything and return to `Idle`
    pub fn reset(&self) {
        self.media.lock().unwrap().reset();
        self.state_manager.reset();
        tracing::info!("Detection page reset");
    }

    // ===== History & dashboard =====

    /// One page of past detections, newest first as the backend orders them
    pub async fn history(&self, page: u32) -> Result<HistoryView, ApiError> {
        let skip = page.saturating_mul(self.history_page_size);
        let records = self.api.list_detections(skip, self.history_page_size).await?;
        Ok(HistoryView::from_records(&records))
    }

    pub async fn dashboard(&self) -> Result<DashboardView, ApiError> {
        let stats = self.api.dashboard_stats().await?;
        Ok(DashboardView::from_stats(&stats))
    }

    /// Release the camera and preview; used when the console exits
    pub fn shutdown(&self) {
        self.media.lock().unwrap().shutdown();
        tracing::info!("Detection controller shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{TestPatternCamera, VideoStream};
    use crate::models::{DashboardStats, SelectionKind, SubmissionState};
    use crate::services::api::MockDetectionApi;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct DeniedCamera;

    #[async_trait]
    impl CameraDevice for DeniedCamera {
        async fn open(&self) -> Result<Box<dyn VideoStream>, CameraError> {
            Err(CameraError::PermissionDenied("user dismissed the prompt".to_string()))
        }

        fn name(&self) -> String {
            "denied".to_string()
        }
    }

    fn controller_with(
        camera: Arc<dyn CameraDevice>,
        api: MockDetectionApi,
    ) -> (DetectionController, Arc<Metrics>, TempDir) {
        let dir = TempDir::new().unwrap();
        let preview_dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let metrics = Arc::new(Metrics::new());
        let state = Arc::new(StateManager::with_metrics(metrics.clone()));
        let media = MediaSourceManager::new(preview_dir, 90, metrics.clone());

        (
            DetectionController::new(state, media, camera, Arc::new(api), 50),
            metrics,
            dir,
        )
    }

    fn jpeg() -> MediaBlob {
        MediaBlob::new(vec![0xFF, 0xD8, 0xFF, 0xD9], "image/jpeg", "worker.jpg")
    }

    #[tokio::test]
    async fn test_camera_denied_leaves_selection() {
        let (controller, metrics, _dir) = controller_with(Arc::new(DeniedCamera), MockDetectionApi::new());
        controller.select_blob(jpeg()).unwrap();

        let err = controller.start_camera().await.unwrap_err();

        assert!(matches!(err, CameraError::PermissionDenied(_)));
        let state = controller.state().snapshot();
        assert_eq!(state.submission, SubmissionState::Ready);
        assert_eq!(state.selection.kind, SelectionKind::CapturedOrUploaded);
        assert!(state.notice.unwrap().contains("Failed to access camera"));
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[tokio::test]
    async fn test_start_camera_twice_holds_one_stream() {
        let (controller, metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(32, 24)), MockDetectionApi::new());

        controller.start_camera().await.unwrap();
        controller.start_camera().await.unwrap();

        assert_eq!(metrics.open_camera_streams(), 1);
        assert!(controller.stop_camera());
        assert!(!controller.stop_camera());
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[tokio::test]
    async fn test_capture_flow_updates_state() {
        let (controller, metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(64, 48)), MockDetectionApi::new());

        controller.start_camera().await.unwrap();
        assert!(controller.state().snapshot().is_camera_live());

        let summary = controller.capture_photo().unwrap();

        assert!(summary.file_name.unwrap().starts_with("capture-"));
        let state = controller.state().snapshot();
        assert_eq!(state.submission, SubmissionState::Ready);
        assert!(!state.is_camera_live());
        assert_eq!(metrics.open_camera_streams(), 0);
        assert_eq!(metrics.live_previews(), 1);
    }

    #[tokio::test]
    async fn test_capture_without_camera_notifies() {
        let (controller, _metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), MockDetectionApi::new());

        assert!(matches!(controller.capture_photo(), Err(CaptureError::NoSession)));
        assert!(controller.state().snapshot().notice.is_some());
    }

    #[tokio::test]
    async fn test_select_missing_path_notifies() {
        let (controller, _metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), MockDetectionApi::new());

        let result = controller.select_path(Utf8Path::new("/nonexistent/gate.jpg")).await;

        assert!(result.is_err());
        let state = controller.state().snapshot();
        assert_eq!(state.submission, SubmissionState::Idle);
        assert!(state.notice.unwrap().starts_with("Failed to load file"));
    }

    #[tokio::test]
    async fn test_submit_while_camera_live_requires_capture() {
        let mut api = MockDetectionApi::new();
        api.expect_submit_media().times(0);
        let (controller, _metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), api);

        controller.start_camera().await.unwrap();

        assert_eq!(
            controller.submit().await,
            Err(SubmissionError::CaptureRequired)
        );
    }

    #[tokio::test]
    async fn test_reset_clears_preview_and_source() {
        let (controller, metrics, dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), MockDetectionApi::new());
        let path = Utf8PathBuf::try_from(dir.path().join("upload.jpg")).unwrap();
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        controller.select_path(&path).await.unwrap();
        assert_eq!(controller.source_path(), Some(path.clone()));

        controller.reset();

        assert!(controller.preview_path().is_none());
        assert!(controller.source_path().is_none());
        assert_eq!(controller.state().snapshot().submission, SubmissionState::Idle);
        assert_eq!(metrics.live_previews(), 0);

        // Same file can be picked again
        controller.select_path(&path).await.unwrap();
        assert!(controller.state().snapshot().can_submit());
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let mut api = MockDetectionApi::new();
        api.expect_list_detections()
            .withf(|skip, limit| *skip == 100 && *limit == 50)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        let (controller, _metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), api);

        let view = controller.history(2).await.unwrap();
        assert_eq!(view.total, 0);
    }

    #[tokio::test]
    async fn test_dashboard_view() {
        let mut api = MockDetectionApi::new();
        api.expect_dashboard_stats().returning(|| {
            Ok(DashboardStats {
                total_detections: 10,
                total_accepted: 7,
                total_denied: 3,
                recent_detections: Vec::new(),
            })
        });
        let (controller, _metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), api);

        let view = controller.dashboard().await.unwrap();
        assert_eq!(view.acceptance_rate, 70);
    }

    #[tokio::test]
    async fn test_shutdown_releases_resources() {
        let (controller, metrics, _dir) =
            controller_with(Arc::new(TestPatternCamera::new(8, 8)), MockDetectionApi::new());
        controller.select_blob(jpeg()).unwrap();
        controller.start_camera().await.unwrap();

        controller.shutdown();

        assert_eq!(metrics.open_camera_streams(), 0);
        assert_eq!(metrics.live_previews(), 0);
    }
}
