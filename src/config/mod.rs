use crate::models::ConsoleConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;

/// Prefix for environment overrides, e.g. `PPE_CONSOLE__API__BASE_URL`
pub const ENV_PREFIX: &str = "PPE_CONSOLE";

/// Configuration manager for loading and saving the console YAML file.
///
/// Manages `console.yaml` inside the configuration directory. Two loading modes:
/// - [`load_console_config`](Self::load_console_config): the file alone (defaults if missing)
/// - [`load_layered`](Self::load_layered): defaults, then the file, then `PPE_CONSOLE__*` env vars
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    console_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            console_config_path: config_dir.join("console.yaml"),
            config_dir,
        })
    }

    /// Load `console.yaml`, or defaults if the file doesn't exist
    pub fn load_console_config(&self) -> Result<ConsoleConfig> {
        if !self.console_config_path.exists() {
            tracing::warn!(
                "Console config not found at {}, using defaults",
                self.console_config_path
            );
            return Ok(ConsoleConfig::default());
        }

        let file_contents = fs::read_to_string(&self.console_config_path).with_context(|| {
            format!("Failed to read console config: {}", self.console_config_path)
        })?;

        let config: ConsoleConfig = serde_yaml_ng::from_str(&file_contents).with_context(|| {
            format!("Failed to parse console config: {}", self.console_config_path)
        })?;

        tracing::info!("Loaded console config from {}", self.console_config_path);
        Ok(config)
    }

    /// Save the console configuration to `console.yaml`
    pub fn save_console_config(&self, config: &ConsoleConfig) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(config)
            .context("Failed to serialize console config to YAML")?;

        fs::write(&self.console_config_path, yaml_string).with_context(|| {
            format!("Failed to write console config: {}", self.console_config_path)
        })?;

        tracing::info!("Saved console config to {}", self.console_config_path);
        Ok(())
    }

    /// Load configuration from every layer.
    ///
    /// Precedence (lowest first): built-in defaults, `console.yaml`, environment.
    /// Environment keys use `__` between sections, e.g.
    /// `PPE_CONSOLE__CAMERA__BACKEND=test-pattern`.
    ///
    /// # Arguments
    /// * `env_overrides` - Explicit environment map; `None` reads the process environment
    pub fn load_layered(
        &self,
        env_overrides: Option<HashMap<String, String>>,
    ) -> Result<ConsoleConfig> {
        let defaults = config::Config::try_from(&ConsoleConfig::default())
            .context("Failed to build default configuration layer")?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(self.console_config_path.as_std_path())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_overrides),
            )
            .build()
            .with_context(|| {
                format!("Failed to load layered config from {}", self.config_dir)
            })?;

        let config: ConsoleConfig = settings
            .try_deserialize()
            .context("Failed to deserialize layered console config")?;

        tracing::debug!(
            "Layered config resolved: api={}, camera={:?}",
            config.api.base_url,
            config.camera.backend
        );
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the path of `console.yaml`.
    pub fn console_config_path(&self) -> &Utf8Path {
        &self.console_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CameraBackend;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.console_config_path().as_str().ends_with("console.yaml"));
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let config = manager.load_console_config().unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_load_save_console_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = ConsoleConfig::default();
        config.api.base_url = "http://gate-3.local/api".to_string();
        config.camera.backend = CameraBackend::TestPattern;
        manager.save_console_config(&config).unwrap();

        let loaded = manager.load_console_config().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_layered_env_overrides_file() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = ConsoleConfig::default();
        config.api.base_url = "http://from-file/api".to_string();
        config.history.page_size = 20;
        manager.save_console_config(&config).unwrap();

        let mut env = HashMap::new();
        env.insert(
            "PPE_CONSOLE__API__BASE_URL".to_string(),
            "http://from-env/api".to_string(),
        );

        let loaded = manager.load_layered(Some(env)).unwrap();
        assert_eq!(loaded.api.base_url, "http://from-env/api");
        assert_eq!(loaded.history.page_size, 20);
    }
}
