//! Publishing built artifacts where they can be served

use crate::error::{PkgpressError, PkgpressResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// A file copied to its serving location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Published file
    pub path: PathBuf,
    /// Locator under which the file is served
    pub url: String,
}

/// Copies artifacts into the publish directory or beside a web path
#[derive(Debug, Clone)]
pub struct Publisher {
    publish_dir: PathBuf,
    publish_url: String,
    web_root: PathBuf,
}

impl Publisher {
    /// Create a publisher
    pub fn new(
        publish_dir: impl Into<PathBuf>,
        publish_url: impl Into<String>,
        web_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            publish_dir: publish_dir.into(),
            publish_url: publish_url.into(),
            web_root: web_root.into(),
        }
    }

    /// Where `file_name` would be published and its URL
    ///
    /// With a `base_url` the file goes to `<web_root>/<base_url>/` so that
    /// relative references inside a stylesheet keep resolving.
    pub fn target(&self, file_name: &str, base_url: Option<&str>) -> Published {
        match base_url.map(|b| b.trim_matches('/')) {
            Some(base) => {
                let url = if base.is_empty() {
                    format!("/{}", file_name)
                } else {
                    format!("/{}/{}", base, file_name)
                };
                Published {
                    path: self.web_root.join(base).join(file_name),
                    url,
                }
            }
            None => Published {
                path: self.publish_dir.join(file_name),
                url: format!("{}/{}", self.publish_url.trim_end_matches('/'), file_name),
            },
        }
    }

    /// Move `artifact` to its published location
    ///
    /// The file is copied next to the target and renamed into place, so a
    /// reader never sees a partially written artifact. The source is removed
    /// afterwards.
    pub async fn publish(&self, artifact: &Path, base_url: Option<&str>) -> PkgpressResult<Published> {
        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PkgpressError::Internal(format!("artifact {} has no file name", artifact.display()))
            })?;
        let published = self.target(file_name, base_url);

        if let Some(parent) = published.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PkgpressError::io(format!("creating publish directory {}", parent.display()), e)
            })?;
        }

        let staging = published
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::copy(artifact, &staging).await.map_err(|e| {
            PkgpressError::io(format!("publishing {}", published.path.display()), e)
        })?;
        if let Err(e) = fs::rename(&staging, &published.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(PkgpressError::io(
                format!("publishing {}", published.path.display()),
                e,
            ));
        }

        if let Err(e) = fs::remove_file(artifact).await {
            warn!("Failed to remove {}: {}", artifact.display(), e);
        }

        debug!("Published {} as {}", published.path.display(), published.url);
        Ok(published)
    }

    /// Remove a previously published file, ignoring files already gone
    pub async fn unpublish(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Unpublished {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to unpublish {}: {}", path.display(), e),
        }
    }
}
