//! Concatenation of source files into one temporary input

use crate::error::{PkgpressError, PkgpressResult};
use crate::store::ArtifactClass;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// What to append after each combined fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorPolicy {
    /// A line break only
    Newline,
    /// A statement terminator and a line break, so a fragment missing its
    /// trailing `;` cannot merge with the next one
    Statement,
}

impl SeparatorPolicy {
    /// Policy suited to an artifact class
    pub fn for_class(class: ArtifactClass) -> Self {
        if class.needs_statement_separator() {
            Self::Statement
        } else {
            Self::Newline
        }
    }

    fn bytes(&self) -> &'static [u8] {
        match self {
            Self::Newline => b"\n",
            Self::Statement => b";\n",
        }
    }
}

/// A combined temporary file, deleted when dropped
#[derive(Debug)]
pub struct CombinedFile {
    path: PathBuf,
    digest: String,
}

impl CombinedFile {
    /// Location of the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex SHA-256 of the combined bytes
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl Drop for CombinedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed combined file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove combined file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Append `files` in order into a new temporary file in `temp_dir`
///
/// `label` only shows up in the temporary file name.
pub async fn combine(
    files: &[PathBuf],
    policy: SeparatorPolicy,
    temp_dir: &Path,
    label: &str,
) -> PkgpressResult<CombinedFile> {
    fs::create_dir_all(temp_dir).await.map_err(|e| PkgpressError::CombineWrite {
        path: temp_dir.to_path_buf(),
        source: e,
    })?;

    let path = temp_dir.join(format!(
        "combined_{}_{}.tmp",
        sanitize(label),
        Uuid::new_v4().simple()
    ));
    let write_error = |e| PkgpressError::CombineWrite {
        path: path.clone(),
        source: e,
    };

    let mut out = File::create(&path).await.map_err(write_error)?;
    // From here on the file is removed on every exit path
    let mut combined = CombinedFile {
        path: path.clone(),
        digest: String::new(),
    };

    let mut hasher = Sha256::new();
    for file in files {
        let bytes = fs::read(file).await.map_err(|e| PkgpressError::SourceRead {
            path: file.clone(),
            source: e,
        })?;

        for chunk in [bytes.as_slice(), policy.bytes()] {
            out.write_all(chunk).await.map_err(write_error)?;
            hasher.update(chunk);
        }
    }
    out.flush().await.map_err(write_error)?;
    out.sync_all().await.map_err(write_error)?;

    debug!("Combined {} files into {}", files.len(), path.display());
    combined.digest = hex::encode(hasher.finalize());
    Ok(combined)
}

/// Reduce a key to characters safe in file names
pub(crate) fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn statement_policy_terminates_fragments() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.js", "var a = 1");
        let b = write(&dir, "b.js", "var b = 2");

        let combined = combine(&[a, b], SeparatorPolicy::Statement, dir.path(), "app")
            .await
            .unwrap();

        let content = std::fs::read_to_string(combined.path()).unwrap();
        assert_eq!(content, "var a = 1;\nvar b = 2;\n");
    }

    #[tokio::test]
    async fn newline_policy_for_stylesheets() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.css", "a{}");
        let b = write(&dir, "b.css", "b{}");

        let policy = SeparatorPolicy::for_class(ArtifactClass::Css);
        let combined = combine(&[a, b], policy, dir.path(), "app").await.unwrap();

        assert_eq!(std::fs::read_to_string(combined.path()).unwrap(), "a{}\nb{}\n");
    }

    #[tokio::test]
    async fn digest_follows_content() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.js", "one");
        let b = write(&dir, "b.js", "two");

        let first = combine(&[a.clone(), b.clone()], SeparatorPolicy::Statement, dir.path(), "k")
            .await
            .unwrap();
        let again = combine(&[a.clone(), b.clone()], SeparatorPolicy::Statement, dir.path(), "k")
            .await
            .unwrap();
        let swapped = combine(&[b, a], SeparatorPolicy::Statement, dir.path(), "k")
            .await
            .unwrap();

        assert_ne!(first.path(), again.path());
        assert_eq!(first.digest(), again.digest());
        assert_ne!(first.digest(), swapped.digest());
    }

    #[tokio::test]
    async fn temp_file_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.js", "x");

        let combined = combine(&[a], SeparatorPolicy::Newline, dir.path(), "app")
            .await
            .unwrap();
        let path = combined.path().to_path_buf();
        assert!(path.exists());

        drop(combined);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_source_names_file_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("tmp");
        let a = write(&dir, "a.js", "x");
        let missing = dir.path().join("missing.js");

        let err = combine(&[a, missing.clone()], SeparatorPolicy::Statement, &temp, "app")
            .await
            .unwrap_err();

        assert!(matches!(err, PkgpressError::SourceRead { ref path, .. } if *path == missing));
        assert_eq!(std::fs::read_dir(&temp).unwrap().count(), 0);
    }

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize("admin/app v2"), "admin_app_v2");
        assert_eq!(sanitize("core-ui_1.0"), "core-ui_1.0");
    }
}
