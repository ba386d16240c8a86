//! Lock acquisition and release for one execution context

use crate::clock::Clock;
use crate::error::{PkgpressError, PkgpressResult};
use crate::lock::table::{LockEntry, LockTable};
use crate::state::{read_table_strict, write_table, StateBackend};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Proof that the issuing [`LockManager`] holds a lock
///
/// Returned by [`LockManager::acquire`] and consumed by
/// [`LockManager::release`], so a lock can only be released once.
#[derive(Debug)]
#[must_use = "a held lock must be released"]
pub struct LockToken {
    key: String,
    entry: LockEntry,
}

impl LockToken {
    /// Key of the held lock
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Table entry written when the lock was taken
    pub fn entry(&self) -> &LockEntry {
        &self.entry
    }
}

/// Acquires and releases named locks in a shared lock table
///
/// Each manager is one execution context: it remembers which keys it took so
/// that releasing anything else is rejected as a
/// [`PkgpressError::PreconditionViolation`].
pub struct LockManager {
    backend: Arc<dyn StateBackend>,
    clock: Arc<dyn Clock>,
    held: Mutex<Vec<(String, LockEntry)>>,
}

impl LockManager {
    /// Create a manager over a lock table backend
    pub fn new(backend: Arc<dyn StateBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            held: Mutex::new(Vec::new()),
        }
    }

    /// Try once to take `key` for `timeout_secs` (0 = until released)
    ///
    /// Returns `Ok(None)` when a live entry held by anyone (this context
    /// included) exists. Failure to obtain the table guard or to persist the
    /// claim is reported as [`PkgpressError::LockUnavailable`].
    pub async fn acquire(&self, key: &str, timeout_secs: u64) -> PkgpressResult<Option<LockToken>> {
        let _guard = self
            .backend
            .lock()
            .await
            .map_err(|e| PkgpressError::lock_unavailable(key, e.to_string()))?;

        let mut table: LockTable = read_table_strict(self.backend.as_ref()).await?;
        let now = self.clock.now();

        let Some(entry) = table.try_claim(key, timeout_secs, now) else {
            debug!("Lock {} is held by another context", key);
            return Ok(None);
        };

        write_table(self.backend.as_ref(), &table)
            .await
            .map_err(|e| PkgpressError::lock_unavailable(key, e.to_string()))?;

        self.held_mut()?.push((key.to_string(), entry));
        debug!("Acquired lock {} (timeout {}s)", key, timeout_secs);

        Ok(Some(LockToken {
            key: key.to_string(),
            entry,
        }))
    }

    /// Release a lock taken by this manager
    ///
    /// Returns whether the table entry was removed. `false` means the lock
    /// went stale and was meanwhile taken over by another context, whose
    /// entry is left untouched.
    pub async fn release(&self, token: LockToken) -> PkgpressResult<bool> {
        self.release_entry(&token.key, token.entry).await
    }

    /// Release a lock by key, rejecting keys this manager does not hold
    pub async fn release_key(&self, key: &str) -> PkgpressResult<bool> {
        let entry = self
            .held_mut()?
            .iter()
            .rev()
            .find(|(held, _)| held == key)
            .map(|(_, entry)| *entry)
            .ok_or_else(|| {
                PkgpressError::PreconditionViolation(format!(
                    "release of lock '{}' which this context never acquired",
                    key
                ))
            })?;

        self.release_entry(key, entry).await
    }

    /// Release the most recently acquired lock still held
    pub async fn release_last(&self) -> PkgpressResult<bool> {
        let (key, entry) = self.held_mut()?.last().cloned().ok_or_else(|| {
            PkgpressError::PreconditionViolation(
                "no lock held that could be released".to_string(),
            )
        })?;

        self.release_entry(&key, entry).await
    }

    /// Keys currently held by this manager, oldest first
    pub fn held_keys(&self) -> Vec<String> {
        self.held
            .lock()
            .map(|held| held.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    /// Current table entry for `key` if it is live
    pub async fn holder(&self, key: &str) -> PkgpressResult<Option<LockEntry>> {
        let _guard = self.backend.lock().await?;
        let table: LockTable = read_table_strict(self.backend.as_ref()).await?;
        let now = self.clock.now();
        Ok(table.get(key).filter(|e| e.is_held_at(now)).copied())
    }

    async fn release_entry(&self, key: &str, entry: LockEntry) -> PkgpressResult<bool> {
        self.ensure_held(key, &entry)?;

        let _guard = self
            .backend
            .lock()
            .await
            .map_err(|e| PkgpressError::lock_unavailable(key, e.to_string()))?;

        // Another task sharing this manager may have released it while we waited
        self.ensure_held(key, &entry)?;

        let mut table: LockTable = read_table_strict(self.backend.as_ref()).await?;
        let removed = table.remove_if(key, &entry);

        if removed {
            write_table(self.backend.as_ref(), &table)
                .await
                .map_err(|e| PkgpressError::lock_unavailable(key, e.to_string()))?;
            debug!("Released lock {}", key);
        } else {
            warn!("Lock {} expired before release and was taken over", key);
        }

        let mut held = self.held_mut()?;
        if let Some(position) = held
            .iter()
            .rposition(|(held_key, held_entry)| held_key == key && *held_entry == entry)
        {
            held.remove(position);
        }
        Ok(removed)
    }

    fn ensure_held(&self, key: &str, entry: &LockEntry) -> PkgpressResult<()> {
        let held = self
            .held_mut()?
            .iter()
            .any(|(held_key, held_entry)| held_key == key && held_entry == entry);
        if held {
            Ok(())
        } else {
            Err(PkgpressError::PreconditionViolation(format!(
                "lock '{}' is not held by this context",
                key
            )))
        }
    }

    fn held_mut(&self) -> PkgpressResult<std::sync::MutexGuard<'_, Vec<(String, LockEntry)>>> {
        self.held
            .lock()
            .map_err(|_| PkgpressError::Internal("held lock list poisoned".to_string()))
    }
}
