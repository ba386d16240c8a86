//! File-backed state storage shared between processes

use crate::error::{PkgpressError, PkgpressResult};
use crate::state::backend::{StateBackend, StateGuard};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// A table persisted as one file, guarded by an advisory lock on a companion file
///
/// The guard file (`<table>.lock`) is never deleted: removing it while
/// another process waits on it would let two processes hold "the" guard on
/// different inodes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    guard_path: PathBuf,
}

/// Open guard file holding an exclusive `flock`
struct FileGuard {
    _file: File,
    path: PathBuf,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock
        debug!("Released table guard {}", self.path.display());
    }
}

impl FileBackend {
    /// Create a backend for the table at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut guard_name = path.as_os_str().to_owned();
        guard_name.push(".lock");
        Self {
            guard_path: PathBuf::from(guard_name),
            path,
        }
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the companion guard file
    pub fn guard_path(&self) -> &Path {
        &self.guard_path
    }

    async fn ensure_parent(&self) -> PkgpressResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PkgpressError::io(format!("creating state directory {}", parent.display()), e)
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateBackend for FileBackend {
    async fn lock(&self) -> PkgpressResult<StateGuard> {
        self.ensure_parent().await?;

        let guard_path = self.guard_path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&guard_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| PkgpressError::Internal(format!("guard lock task failed: {}", e)))?
        .map_err(|e| {
            PkgpressError::io(
                format!("locking table guard {}", self.guard_path.display()),
                e,
            )
        })?;

        debug!("Acquired table guard {}", self.guard_path.display());
        Ok(StateGuard::new(FileGuard {
            _file: file,
            path: self.guard_path.clone(),
        }))
    }

    async fn read_all(&self) -> PkgpressResult<Vec<u8>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PkgpressError::io(
                format!("reading table {}", self.path.display()),
                e,
            )),
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> PkgpressResult<()> {
        self.ensure_parent().await?;

        // Write-then-rename so readers never see a torn table
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, bytes).await.map_err(|e| {
            PkgpressError::io(format!("writing table {}", tmp_path.display()), e)
        })?;

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PkgpressError::io(
                format!("replacing table {}", self.path.display()),
                e,
            ));
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
