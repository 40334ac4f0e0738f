//! Application configuration: config directory handling and settings file.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the settings file inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Application settings. Constructed from the config file when one exists,
/// otherwise defaults; injected into the stores rather than read as globals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL the metacatalog and datastore files are served under.
    pub base_url: String,
    /// Download timeout in seconds for catalog and datastore files.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            // Development proxy default; point at a real deployment via the
            // config file or --base-url.
            base_url: "http://localhost:3000/data".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to the settings file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Load settings from the config file, falling back to defaults when the
    /// file does not exist.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_file();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Write the default settings file, for users to edit.
    pub fn write_default_config(&self) -> Result<PathBuf> {
        self.ensure_config_dir()?;
        let path = self.config_file();
        let contents = toml::to_string_pretty(&AppConfig::default())?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
