use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Console configuration from `console.yaml`
///
/// Every section and field has a default so partial files (and env-only
/// configuration) deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiSettings,
    pub camera: CameraSettings,
    pub preview: PreviewSettings,
    pub history: HistorySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL the `/detect`, `/detections` and `/dashboard` paths are joined to
    pub base_url: String,

    /// Bearer credential issued by the login flow. Empty means no header.
    pub token: String,

    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// Which camera implementation backs "Use Camera"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackend {
    /// Default capture device through nokhwa (feature `camera-nokhwa`)
    Native,

    /// Synthetic frames, for kiosks without a camera and for demos
    TestPattern,
}

// Builds without nokhwa fall back to the synthetic camera so `camera start` works
impl Default for CameraBackend {
    fn default() -> Self {
        if cfg!(feature = "camera-nokhwa") {
            CameraBackend::Native
        } else {
            CameraBackend::TestPattern
        }
    }
}

impl std::str::FromStr for CameraBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(CameraBackend::Native),
            "test-pattern" | "test_pattern" | "testpattern" => Ok(CameraBackend::TestPattern),
            other => Err(format!("unknown camera backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub backend: CameraBackend,
    pub device_index: u32,

    /// Requested frame size. Captures always use the size the device delivers.
    pub width: u32,
    pub height: u32,

    /// JPEG quality for captured frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            backend: CameraBackend::default(),
            device_index: 0,
            width: 1280,
            height: 720,
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Directory holding preview files. Empty means the system temp dir.
    pub dir: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self { dir: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub page_size: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "ppe-console".to_string(),
            debug: false,
            console: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_jpeg_quality() -> u8 {
    90
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_config_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.api.token().is_none());
        assert_eq!(config.camera.jpeg_quality, 90);
        assert_eq!(config.history.page_size, 50);
    }

    #[test]
    fn test_default_backend_matches_build() {
        let expected = if cfg!(feature = "camera-nokhwa") {
            CameraBackend::Native
        } else {
            CameraBackend::TestPattern
        };
        assert_eq!(CameraSettings::default().backend, expected);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "api:\n  token: \"  abc123 \"\ncamera:\n  backend: test-pattern\n";
        let config: ConsoleConfig = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.api.token(), Some("abc123"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.camera.backend, CameraBackend::TestPattern);
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.logging.prefix, "ppe-console");
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let settings = ApiSettings {
            timeout_secs: 0,
            ..ApiSettings::default()
        };
        assert_eq!(settings.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_camera_backend_from_str() {
        assert_eq!("native".parse::<CameraBackend>(), Ok(CameraBackend::Native));
        assert_eq!(
            "Test-Pattern".parse::<CameraBackend>(),
            Ok(CameraBackend::TestPattern)
        );
        assert!("webcam".parse::<CameraBackend>().is_err());
    }
}
