//! Storage backend interface for persisted tables

use crate::error::{PkgpressError, PkgpressResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Exclusive access to a backend, released on drop
pub struct StateGuard {
    _held: Box<dyn Send + Sync>,
}

impl StateGuard {
    /// Wrap whatever keeps the underlying lock alive
    pub fn new<T: Send + Sync + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for StateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateGuard").finish_non_exhaustive()
    }
}

/// Durable storage for one serialized table
///
/// Callers take [`StateBackend::lock`] around every read-modify-write; plain
/// reads may also take it to avoid observing a write in progress.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Block until this process holds the backend's exclusive guard
    async fn lock(&self) -> PkgpressResult<StateGuard>;

    /// Read the whole document (empty when nothing was ever written)
    async fn read_all(&self) -> PkgpressResult<Vec<u8>>;

    /// Replace the whole document
    async fn write_all(&self, bytes: &[u8]) -> PkgpressResult<()>;

    /// Human-readable location for diagnostics
    fn location(&self) -> String;
}

/// Read and decode a table, treating an empty or unreadable document as empty
pub async fn read_table<T>(backend: &dyn StateBackend) -> PkgpressResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = backend.read_all().await?;
    if bytes.is_empty() {
        return Ok(T::default());
    }

    match serde_json::from_slice(&bytes) {
        Ok(table) => Ok(table),
        Err(e) => {
            warn!(
                "Discarding unreadable table at {}: {}",
                backend.location(),
                e
            );
            Ok(T::default())
        }
    }
}

/// Read and decode a table, rejecting a document that does not parse
///
/// For tables whose loss would be unsafe to paper over, such as the lock
/// table: treating it as empty would hand out locks that are still held.
pub async fn read_table_strict<T>(backend: &dyn StateBackend) -> PkgpressResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = backend.read_all().await?;
    if bytes.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes).map_err(|source| PkgpressError::TableCorrupt {
        location: backend.location(),
        source,
    })
}

/// Encode and persist a table
pub async fn write_table<T: Serialize>(backend: &dyn StateBackend, table: &T) -> PkgpressResult<()> {
    let bytes = serde_json::to_vec_pretty(table)?;
    backend.write_all(&bytes).await
}
