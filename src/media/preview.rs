//! Preview files for the active media.
//!
//! A [`PreviewHandle`] is the native stand-in for a browser object URL: a file
//! holding the blob's bytes that a viewer can open. Exactly one is live at a
//! time, owned by the [`MediaSourceManager`](super::MediaSourceManager). It is
//! deleted by [`PreviewHandle::release`] or, on any other exit path, by `Drop`.

use super::MediaError;
use crate::metrics::Metrics;
use crate::models::MediaBlob;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub struct PreviewHandle {
    file: Option<NamedTempFile>,
    path: Utf8PathBuf,
    metrics: Arc<Metrics>,
}

impl PreviewHandle {
    /// Write `blob` to a fresh preview file under `dir`
    pub fn create(dir: &Utf8Path, blob: &MediaBlob, metrics: Arc<Metrics>) -> Result<Self, MediaError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }

        let suffix = format!(".{}", blob.extension());
        let mut file = tempfile::Builder::new()
            .prefix("preview-")
            .suffix(&suffix)
            .tempfile_in(dir)?;

        file.write_all(&blob.bytes)?;
        file.flush()?;

        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf())
            .map_err(MediaError::NonUtf8Path)?;

        metrics.record_preview_created();
        tracing::debug!("Created preview {} ({} bytes)", path, blob.len());

        Ok(Self {
            file: Some(file),
            path,
            metrics,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Delete the preview file now and report any I/O error
    pub fn release(mut self) -> Result<(), MediaError> {
        match self.file.take() {
            Some(file) => {
                self.metrics.record_preview_released();
                tracing::debug!("Released preview {}", self.path);
                file.close()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            self.metrics.record_preview_released();
            if let Err(e) = file.close() {
                tracing::warn!("Failed to delete preview {}: {}", self.path, e);
            }
        }
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_create_writes_blob() {
        let (_guard, dir) = temp_dir();
        let metrics = Arc::new(Metrics::new());
        let blob = MediaBlob::new(vec![1, 2, 3], "image/png", "gate.png");

        let handle = PreviewHandle::create(&dir, &blob, metrics.clone()).unwrap();

        assert!(handle.path().as_str().ends_with(".png"));
        assert_eq!(std::fs::read(handle.path()).unwrap(), vec![1, 2, 3]);
        assert_eq!(metrics.live_previews(), 1);
    }

    #[test]
    fn test_release_deletes_file() {
        let (_guard, dir) = temp_dir();
        let metrics = Arc::new(Metrics::new());
        let blob = MediaBlob::new(vec![9; 16], "image/jpeg", "a.jpg");

        let handle = PreviewHandle::create(&dir, &blob, metrics.clone()).unwrap();
        let path = handle.path().to_path_buf();
        handle.release().unwrap();

        assert!(!path.exists());
        assert_eq!(metrics.live_previews(), 0);
    }

    #[test]
    fn test_drop_deletes_file() {
        let (_guard, dir) = temp_dir();
        let metrics = Arc::new(Metrics::new());
        let blob = MediaBlob::new(vec![9; 16], "video/mp4", "clip.mp4");

        let path = {
            let handle = PreviewHandle::create(&dir, &blob, metrics.clone()).unwrap();
            handle.path().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(metrics.live_previews(), 0);
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let (_guard, dir) = temp_dir();
        let nested = dir.join("previews").join("gate-3");
        let blob = MediaBlob::new(vec![1], "image/jpeg", "a.jpg");

        let handle = PreviewHandle::create(&nested, &blob, Arc::new(Metrics::new())).unwrap();
        assert!(handle.path().starts_with(&nested));
    }
}
