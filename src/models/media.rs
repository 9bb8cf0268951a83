use camino::Utf8PathBuf;

/// Binary payload selected for analysis, together with its MIME type and file name.
///
/// The MIME type is advisory. Anything that does not start with `video/` is
/// treated as an image.
#[derive(Clone, PartialEq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            file_name: file_name.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime.starts_with("video/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension used for preview files, derived from the name and then the MIME type
    pub fn extension(&self) -> &str {
        if let Some((_, ext)) = self.file_name.rsplit_once('.') {
            if !ext.is_empty() && ext.len() <= 5 {
                return ext;
            }
        }

        match self.mime.as_str() {
            "image/png" => "png",
            "video/mp4" => "mp4",
            "video/avi" | "video/x-msvideo" => "avi",
            m if m.starts_with("video/") => "mp4",
            _ => "jpg",
        }
    }
}

// Skip the payload bytes in debug output
impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBlob")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Guess a MIME type from a file extension.
///
/// Unknown extensions fall back to `application/octet-stream`, which downstream
/// code treats as an image.
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/avi",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Which input currently owns the Detection page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    None,
    CameraLive,
    CapturedOrUploaded,
}

/// Display-only description of the active selection.
///
/// This never carries the camera stream or the preview file itself; those stay
/// inside [`crate::media::MediaSourceManager`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSummary {
    pub kind: SelectionKind,
    pub file_name: Option<String>,
    pub mime: Option<String>,
    pub size_bytes: usize,
    pub preview_path: Option<Utf8PathBuf>,
}

impl SelectionSummary {
    pub fn camera_live() -> Self {
        Self {
            kind: SelectionKind::CameraLive,
            ..Self::default()
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime.as_deref().is_some_and(|m| m.starts_with("video/"))
    }

    /// True when a blob is present and could be submitted
    pub fn has_media(&self) -> bool {
        self.kind == SelectionKind::CapturedOrUploaded
    }
}
