//! Error types for pkgpress
//!
//! All modules use `PkgpressResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgpress operations
pub type PkgpressResult<T> = Result<T, PkgpressError>;

/// All errors that can occur in pkgpress
#[derive(Error, Debug)]
pub enum PkgpressError {
    // Lock errors
    #[error("Lock unavailable for {key}: {reason}")]
    LockUnavailable { key: String, reason: String },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    // Build errors
    #[error("Could not read source file {path}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not combine sources into {path}")]
    CombineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build of {key} failed. Command was: {command}\n{output}")]
    BuildFailure {
        key: String,
        command: String,
        output: String,
    },

    // Package errors
    #[error("Invalid build key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Package not configured: {0}")]
    PackageNotFound(String),

    #[error("No build data for package '{0}'")]
    NoBuildData(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unreadable table at {location}")]
    TableCorrupt {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PkgpressError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a lock unavailable error
    pub fn lock_unavailable(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LockUnavailable {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a build failure error
    pub fn build_failure(
        key: impl Into<String>,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::BuildFailure {
            key: key.into(),
            command: command.into(),
            output: output.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BuildFailure { .. } => {
                Some("Check the [transform] section, or set compression.combine_only = true")
            }
            Self::LockUnavailable { .. } => {
                Some("Another process is building. Retry, or raise compression.max_wait_secs")
            }
            Self::PackageNotFound(_) => Some("Define the package under [packages.<name>]"),
            Self::NoBuildData(_) => Some("Run: pkgpress build <name>"),
            Self::TableCorrupt { .. } => {
                Some("Remove the file once no pkgpress process is running")
            }
            _ => None,
        }
    }
}
