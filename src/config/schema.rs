//! Configuration schema for pkgpress
//!
//! Configuration is stored at `~/.config/pkgpress/config.toml`, or in a
//! project-local `pkgpress.toml`.

use crate::orchestration::LockScope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Filesystem locations
    pub paths: PathsConfig,

    /// Build coordination settings
    pub compression: CompressionConfig,

    /// External transform program
    pub transform: TransformConfig,

    /// Package definitions by build key
    pub packages: BTreeMap<String, PackageConfig>,
}

impl Config {
    /// Anchor relative paths at `base` (the directory holding the config file)
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        anchor(&mut self.paths.runtime_dir);
        anchor(&mut self.paths.source_root);
        anchor(&mut self.paths.publish_dir);
        if let Some(ref mut web_root) = self.paths.web_root {
            anchor(web_root);
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Lock table, metadata table and intermediate build files
    pub runtime_dir: PathBuf,

    /// Base directory for package source entries
    pub source_root: PathBuf,

    /// Where built artifacts are published
    pub publish_dir: PathBuf,

    /// URL prefix under which `publish_dir` is served
    pub publish_url: String,

    /// Document root for packages with a `base_url` (defaults to `source_root`)
    pub web_root: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let runtime_dir = super::ConfigManager::state_dir();
        Self {
            publish_dir: runtime_dir.join("assets"),
            runtime_dir,
            source_root: PathBuf::from("."),
            publish_url: "/assets".to_string(),
            web_root: None,
        }
    }
}

/// Build coordination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Build packages at all (false = always serve sources)
    pub enabled: bool,

    /// Only concatenate, skip the external transform
    pub combine_only: bool,

    /// Wait for a running build instead of serving sources meanwhile
    pub block_during_compression: bool,

    /// Seconds after which an unreleased build lock is considered stale
    pub lock_timeout_secs: u64,

    /// Pause between lock attempts while waiting
    pub retry_interval_ms: u64,

    /// Give up waiting after this many seconds (0 = wait indefinitely)
    pub max_wait_secs: u64,

    /// One lock for all builds, or one per build key
    pub lock_scope: LockScope,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            combine_only: false,
            block_during_compression: true,
            lock_timeout_secs: 15,
            retry_interval_ms: 1000,
            max_wait_secs: 0,
            lock_scope: LockScope::Global,
        }
    }
}

/// External transform program
///
/// `args` may contain `{input}`, `{output}` and `{class}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Program to run
    pub program: String,

    /// Argument template
    pub args: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: [
                "-jar",
                "yuicompressor-2.4.7.jar",
                "--type",
                "{class}",
                "-o",
                "{output}",
                "{input}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// One package definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Script sources in order; `http…` and `//…` entries pass through unbuilt
    pub js: Vec<String>,

    /// Stylesheet sources in order
    pub css: Vec<String>,

    /// Packages whose sources are included first
    pub depends: Vec<String>,

    /// CSS media the stylesheet applies to
    pub media: Option<String>,

    /// Publish the stylesheet under this web path instead of `publish_dir`
    pub base_url: Option<String>,
}
