use super::MediaError;
use super::camera::{CameraSession, VideoStream};
use super::capture::{CaptureError, encode_jpeg};
use super::preview::PreviewHandle;
use crate::metrics::Metrics;
use crate::models::{MediaBlob, SelectionKind, SelectionSummary, mime_from_extension};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::sync::Arc;

/// Sole owner of the camera session, the active blob and its preview file.
///
/// At most one of {live camera, preview} exists at any time. Every operation
/// that replaces one of them releases the old resource first, and dropping the
/// manager runs [`shutdown`](Self::shutdown), so a teardown that skips the
/// explicit call still stops the camera and deletes the preview.
///
/// No method hands out the stream or the preview handle itself; callers get a
/// [`SelectionSummary`] or a borrowed blob.
pub struct MediaSourceManager {
    preview_dir: Utf8PathBuf,
    jpeg_quality: u8,
    metrics: Arc<Metrics>,

    blob: Option<MediaBlob>,
    preview: Option<PreviewHandle>,
    camera: Option<CameraSession>,

    /// Path the current file was picked from; cleared on reset so it can be picked again
    source_path: Option<Utf8PathBuf>,
}

impl MediaSourceManager {
    pub fn new(preview_dir: impl Into<Utf8PathBuf>, jpeg_quality: u8, metrics: Arc<Metrics>) -> Self {
        Self {
            preview_dir: preview_dir.into(),
            jpeg_quality,
            metrics,
            blob: None,
            preview: None,
            camera: None,
            source_path: None,
        }
    }

    /// Make `blob` the active selection.
    ///
    /// Stops the camera if it is live and replaces the previous preview. Any MIME
    /// type is accepted; only an empty payload is rejected.
    pub fn select_file(
        &mut self,
        blob: MediaBlob,
        source_path: Option<Utf8PathBuf>,
    ) -> Result<SelectionSummary, MediaError> {
        if blob.is_empty() {
            return Err(MediaError::EmptyPayload(blob.file_name));
        }

        if !blob.mime.starts_with("image/") && !blob.is_video() {
            tracing::warn!(
                "{} has MIME type '{}', it will be treated as an image",
                blob.file_name,
                blob.mime
            );
        }

        self.stop_camera();
        self.release_preview();
        self.blob = None;
        self.source_path = None;

        let preview = PreviewHandle::create(&self.preview_dir, &blob, Arc::clone(&self.metrics))?;

        tracing::info!(
            "Selected {} ({}, {} bytes)",
            blob.file_name,
            blob.mime,
            blob.len()
        );

        self.preview = Some(preview);
        self.blob = Some(blob);
        self.source_path = source_path;
        Ok(self.summary())
    }

    /// Read `path` from disk and select it, remembering where it came from
    pub async fn select_path(&mut self, path: &Utf8Path) -> Result<SelectionSummary, MediaError> {
        let blob = load_media_file(path).await?;
        self.select_file(blob, Some(path.to_path_buf()))
    }

    /// Take ownership of a freshly opened stream.
    ///
    /// Any previous session, blob and preview are released first.
    pub fn install_camera(&mut self, stream: Box<dyn VideoStream>) -> SelectionSummary {
        self.stop_camera();
        self.release_preview();
        self.blob = None;
        self.source_path = None;

        self.camera = Some(CameraSession::new(stream, Arc::clone(&self.metrics)));
        self.summary()
    }

    /// Stop the camera if it is running. Returns whether a session was stopped.
    pub fn stop_camera(&mut self) -> bool {
        // CameraSession::drop stops the tracks
        self.camera.take().is_some()
    }

    /// Grab the current frame, encode it and make it the active selection.
    ///
    /// On success this converges on [`select_file`](Self::select_file), which also
    /// stops the camera. If no frame is ready or encoding fails the camera stays live.
    pub fn capture_photo(&mut self) -> Result<SelectionSummary, CaptureError> {
        let session = self.camera.as_mut().ok_or(CaptureError::NoSession)?;
        let frame = session.latest_frame().ok_or(CaptureError::FrameNotReady)?;

        let blob = encode_jpeg(&frame, self.jpeg_quality, Utc::now())?;
        tracing::info!(
            "Captured {}x{} frame as {}",
            frame.width(),
            frame.height(),
            blob.file_name
        );

        Ok(self.select_file(blob, None)?)
    }

    /// Release everything: camera, preview, blob and the remembered source path
    pub fn reset(&mut self) {
        let stopped = self.stop_camera();
        let had_preview = self.preview.is_some();
        self.release_preview();
        self.blob = None;
        self.source_path = None;

        tracing::debug!(
            "Media reset (camera stopped: {}, preview released: {})",
            stopped,
            had_preview
        );
    }

    /// Teardown of the owning view
    pub fn shutdown(&mut self) {
        if self.camera.is_some() || self.preview.is_some() {
            tracing::info!("Releasing media resources on shutdown");
        }
        self.reset();
    }

    pub fn active_blob(&self) -> Option<&MediaBlob> {
        self.blob.as_ref()
    }

    pub fn is_camera_live(&self) -> bool {
        self.camera.is_some()
    }

    pub fn preview_path(&self) -> Option<&Utf8Path> {
        self.preview.as_ref().map(PreviewHandle::path)
    }

    pub fn source_path(&self) -> Option<&Utf8Path> {
        self.source_path.as_deref()
    }

    pub fn summary(&self) -> SelectionSummary {
        if self.camera.is_some() {
            return SelectionSummary::camera_live();
        }

        match &self.blob {
            Some(blob) => SelectionSummary {
                kind: SelectionKind::CapturedOrUploaded,
                file_name: Some(blob.file_name.clone()),
                mime: Some(blob.mime.clone()),
                size_bytes: blob.len(),
                preview_path: self.preview_path().map(Utf8Path::to_path_buf),
            },
            None => SelectionSummary::default(),
        }
    }

    fn release_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            if let Err(e) = preview.release() {
                tracing::warn!("Failed to delete preview file: {}", e);
            }
        }
    }
}

impl Drop for MediaSourceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read a media file from disk, guessing its MIME type from the extension
pub async fn load_media_file(path: &Utf8Path) -> Result<MediaBlob, MediaError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| MediaError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let mime = mime_from_extension(path.extension().unwrap_or_default());
    let file_name = path.file_name().unwrap_or("upload.jpg").to_string();

    Ok(MediaBlob::new(bytes, mime, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::camera::{CameraDevice, TestPatternCamera};
    use tempfile::TempDir;

    fn manager() -> (MediaSourceManager, Arc<Metrics>, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let metrics = Arc::new(Metrics::new());
        (MediaSourceManager::new(path, 90, metrics.clone()), metrics, dir)
    }

    fn jpeg_blob() -> MediaBlob {
        MediaBlob::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], "image/jpeg", "worker.jpg")
    }

    #[test]
    fn test_select_file_creates_preview() {
        let (mut media, metrics, _dir) = manager();

        let summary = media.select_file(jpeg_blob(), None).unwrap();

        assert_eq!(summary.kind, SelectionKind::CapturedOrUploaded);
        assert_eq!(summary.file_name.as_deref(), Some("worker.jpg"));
        assert!(summary.preview_path.unwrap().exists());
        assert_eq!(metrics.live_previews(), 1);
    }

    #[test]
    fn test_select_rejects_empty_payload() {
        let (mut media, _metrics, _dir) = manager();
        let err = media
            .select_file(MediaBlob::new(Vec::new(), "image/jpeg", "empty.jpg"), None)
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyPayload(_)));
        assert!(media.active_blob().is_none());
    }

    #[test]
    fn test_unknown_mime_is_accepted() {
        let (mut media, _metrics, _dir) = manager();
        let blob = MediaBlob::new(vec![1, 2], "application/octet-stream", "scan.bin");
        let summary = media.select_file(blob, None).unwrap();
        assert!(!summary.is_video());
    }

    #[test]
    fn test_reselect_replaces_preview() {
        let (mut media, metrics, _dir) = manager();

        let first = media.select_file(jpeg_blob(), None).unwrap().preview_path.unwrap();
        let second = media
            .select_file(MediaBlob::new(vec![5; 10], "video/mp4", "clip.mp4"), None)
            .unwrap()
            .preview_path
            .unwrap();

        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(metrics.live_previews(), 1);
    }

    #[tokio::test]
    async fn test_select_file_stops_camera() {
        let (mut media, metrics, _dir) = manager();
        let stream = TestPatternCamera::new(16, 16).open().await.unwrap();
        media.install_camera(stream);
        assert!(media.is_camera_live());

        media.select_file(jpeg_blob(), None).unwrap();

        assert!(!media.is_camera_live());
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[tokio::test]
    async fn test_install_camera_retires_previous_selection() {
        let (mut media, metrics, _dir) = manager();
        let preview = media.select_file(jpeg_blob(), None).unwrap().preview_path.unwrap();

        let stream = TestPatternCamera::new(16, 16).open().await.unwrap();
        let summary = media.install_camera(stream);

        assert_eq!(summary.kind, SelectionKind::CameraLive);
        assert!(!preview.exists());
        assert!(media.active_blob().is_none());
        assert_eq!(metrics.live_previews(), 0);
    }

    #[tokio::test]
    async fn test_capture_photo_releases_camera() {
        let (mut media, metrics, _dir) = manager();
        let stream = TestPatternCamera::new(64, 48).open().await.unwrap();
        media.install_camera(stream);

        let summary = media.capture_photo().unwrap();

        assert_eq!(summary.kind, SelectionKind::CapturedOrUploaded);
        assert_eq!(summary.mime.as_deref(), Some("image/jpeg"));
        assert!(!media.is_camera_live());
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[tokio::test]
    async fn test_capture_encoding_failure_keeps_camera() {
        let (mut media, metrics, _dir) = manager();
        let stream = TestPatternCamera::new(0, 0).open().await.unwrap();
        media.install_camera(stream);

        let err = media.capture_photo().unwrap_err();

        assert!(matches!(err, CaptureError::Encoding(_)));
        assert!(media.is_camera_live());
        assert_eq!(metrics.open_camera_streams(), 1);
    }

    #[test]
    fn test_capture_without_camera() {
        let (mut media, _metrics, _dir) = manager();
        assert!(matches!(media.capture_photo(), Err(CaptureError::NoSession)));
    }

    #[tokio::test]
    async fn test_reset_releases_everything() {
        let (mut media, metrics, _dir) = manager();
        media
            .select_file(jpeg_blob(), Some(Utf8PathBuf::from("/media/worker.jpg")))
            .unwrap();
        assert!(media.source_path().is_some());

        media.reset();

        assert_eq!(media.summary(), SelectionSummary::default());
        assert!(media.source_path().is_none());
        assert_eq!(metrics.live_previews(), 0);
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_camera_and_preview() {
        let (mut media, metrics, _dir) = manager();
        media.select_file(jpeg_blob(), None).unwrap();
        let stream = TestPatternCamera::new(8, 8).open().await.unwrap();
        media.install_camera(stream);

        drop(media);

        assert_eq!(metrics.open_camera_streams(), 0);
        assert_eq!(metrics.live_previews(), 0);
    }

    #[tokio::test]
    async fn test_load_media_file_guesses_mime() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("gate.MP4")).unwrap();
        std::fs::write(&path, [0u8; 32]).unwrap();

        let blob = load_media_file(&path).await.unwrap();

        assert_eq!(blob.mime, "video/mp4");
        assert_eq!(blob.file_name, "gate.MP4");
        assert_eq!(blob.len(), 32);
    }

    #[tokio::test]
    async fn test_select_path_remembers_source() {
        let (mut media, _metrics, dir) = manager();
        let path = Utf8PathBuf::try_from(dir.path().join("upload.png")).unwrap();
        std::fs::write(&path, [7u8; 12]).unwrap();

        let summary = media.select_path(&path).await.unwrap();

        assert_eq!(summary.mime.as_deref(), Some("image/png"));
        assert_eq!(media.source_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_media_file(Utf8Path::new("/nonexistent/worker.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Read { .. }));
    }
}
