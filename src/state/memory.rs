//! In-process state storage

use crate::error::PkgpressResult;
use crate::state::backend::{StateBackend, StateGuard};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Table kept in memory; clones share the same document and guard
///
/// Stands in for shared durable storage when several independent lock
/// managers or metadata stores run inside one test process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    guard: Arc<tokio::sync::Mutex<()>>,
    bytes: Mutex<Vec<u8>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `write_all` calls made through any clone
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn lock(&self) -> PkgpressResult<StateGuard> {
        let guard = self.inner.guard.clone().lock_owned().await;
        Ok(StateGuard::new(guard))
    }

    async fn read_all(&self) -> PkgpressResult<Vec<u8>> {
        Ok(self
            .inner
            .bytes
            .lock()
            .map(|bytes| bytes.clone())
            .unwrap_or_default())
    }

    async fn write_all(&self, bytes: &[u8]) -> PkgpressResult<()> {
        if let Ok(mut stored) = self.inner.bytes.lock() {
            *stored = bytes.to_vec();
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
