//! Configuration management for pkgpress

pub mod schema;

pub use schema::Config;

use crate::error::{PkgpressError, PkgpressResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of a project-local configuration
pub const LOCAL_CONFIG_NAME: &str = "pkgpress.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pkgpress")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pkgpress")
    }

    /// Find `pkgpress.toml` in `start` or any of its ancestors
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load the local config when one was found, the managed one otherwise
    pub async fn load_effective(&self, local: Option<&Path>) -> PkgpressResult<Config> {
        match local {
            Some(path) => self.load_from_file(path).await,
            None => self.load().await,
        }
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub async fn load(&self) -> PkgpressResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    ///
    /// Relative paths inside the file are taken relative to its directory.
    pub async fn load_from_file(&self, path: &Path) -> PkgpressResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PkgpressError::io(format!("reading config from {}", path.display()), e))?;

        let mut config: Config =
            toml::from_str(&content).map_err(|e| PkgpressError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_relative_paths(&base);

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
