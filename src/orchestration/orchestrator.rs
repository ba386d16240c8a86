//! The single-flight build controller

use crate::builder::ArtifactBuilder;
use crate::clock::Clock;
use crate::error::{PkgpressError, PkgpressResult};
use crate::lock::{LockManager, LockToken};
use crate::orchestration::{BuildOutcome, LockScope, OrchestratorSettings, UnbuiltReason, WaitPolicy};
use crate::package::{validate_key, ResolvedPackage, RESERVED_LOCK_KEY};
use crate::state::StateBackend;
use crate::store::{MetadataStore, PackageBuild};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds each package at most once across all contexts sharing its tables
///
/// Under [`WaitPolicy::Block`] a caller whose builds keep failing in other
/// contexts waits as long as the lock keeps being taken; set
/// [`OrchestratorSettings::max_wait`] to bound it.
pub struct Orchestrator {
    locks: LockManager,
    store: MetadataStore,
    builder: ArtifactBuilder,
    clock: Arc<dyn Clock>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator over a lock table and a metadata table
    pub fn new(
        lock_backend: Arc<dyn StateBackend>,
        metadata_backend: Arc<dyn StateBackend>,
        builder: ArtifactBuilder,
        clock: Arc<dyn Clock>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            locks: LockManager::new(lock_backend, clock.clone()),
            store: MetadataStore::new(metadata_backend),
            builder,
            clock,
            settings,
        }
    }

    /// Settings in effect
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Return the build for `package`, building it if nobody has yet
    pub async fn ensure_built(&self, package: &ResolvedPackage) -> PkgpressResult<BuildOutcome> {
        let key = package.key.as_str();
        validate_key(key)?;

        if !self.settings.enabled {
            return Ok(BuildOutcome::Unbuilt(UnbuiltReason::Disabled));
        }

        if let Some(build) = self.store.lookup(key).await? {
            return Ok(BuildOutcome::Cached(build));
        }

        if !package.has_local_files() {
            return Ok(BuildOutcome::Unbuilt(UnbuiltReason::NothingToBuild));
        }

        let Some(token) = self.wait_for_lock(key, self.settings.wait).await? else {
            debug!("Serving sources for {} while it is built elsewhere", key);
            return Ok(BuildOutcome::Unbuilt(UnbuiltReason::LockBusy));
        };

        let result = self.build_locked(package).await;
        self.finish(token, result).await
    }

    /// Build `package` now, replacing any stored build
    ///
    /// Always waits for the lock and ignores `enabled`.
    pub async fn rebuild(&self, package: &ResolvedPackage) -> PkgpressResult<BuildOutcome> {
        let key = package.key.as_str();
        validate_key(key)?;

        let token = self
            .wait_for_lock(key, WaitPolicy::Block)
            .await?
            .ok_or_else(|| PkgpressError::lock_unavailable(key, "lock not acquired"))?;

        let result = self.rebuild_locked(package).await;
        self.finish(token, result).await
    }

    /// Stored build for `key`, without building
    pub async fn lookup(&self, key: &str) -> PkgpressResult<Option<PackageBuild>> {
        self.store.lookup_fresh(key).await
    }

    /// Remove one stored build, or all of them, with their files
    pub async fn evict(&self, key: Option<&str>) -> PkgpressResult<bool> {
        self.store.evict(key).await
    }

    /// Keys with a stored build
    pub async fn list_keys(&self) -> PkgpressResult<Vec<String>> {
        self.store.list_keys().await
    }

    async fn build_locked(&self, package: &ResolvedPackage) -> PkgpressResult<BuildOutcome> {
        let key = package.key.as_str();

        // Another context may have finished while we waited for the lock
        if let Some(build) = self.store.lookup_fresh(key).await? {
            debug!("{} was built while waiting for the lock", key);
            return Ok(BuildOutcome::Cached(build));
        }

        match self.builder.build_package(package).await? {
            Some(build) => {
                self.store.store(key, build.clone()).await?;
                info!("Built {}", key);
                Ok(BuildOutcome::Built(build))
            }
            None => Ok(BuildOutcome::Unbuilt(UnbuiltReason::NothingToBuild)),
        }
    }

    async fn rebuild_locked(&self, package: &ResolvedPackage) -> PkgpressResult<BuildOutcome> {
        let key = package.key.as_str();
        let previous = self.store.lookup_fresh(key).await?;

        let Some(build) = self.builder.build_package(package).await? else {
            self.store.evict(Some(key)).await?;
            return Ok(BuildOutcome::Unbuilt(UnbuiltReason::NothingToBuild));
        };

        self.store.store(key, build.clone()).await?;

        if let Some(previous) = previous {
            let current: Vec<&Path> = build.artifact_paths().collect();
            for old in previous.artifact_paths().filter(|p| !current.contains(p)) {
                self.builder.publisher().unpublish(old).await;
            }
        }

        info!("Rebuilt {}", key);
        Ok(BuildOutcome::Built(build))
    }

    /// Release `token`, then report `result`
    async fn finish(
        &self,
        token: LockToken,
        result: PkgpressResult<BuildOutcome>,
    ) -> PkgpressResult<BuildOutcome> {
        let released = self.locks.release(token).await;
        let outcome = result?;
        if !released? {
            warn!("Build lock expired during the build; raise compression.lock_timeout_secs");
        }
        Ok(outcome)
    }

    fn lock_key<'a>(&self, key: &'a str) -> &'a str {
        match self.settings.lock_scope {
            LockScope::Global => RESERVED_LOCK_KEY,
            LockScope::Key => key,
        }
    }

    /// Take the build lock for `key` according to `policy`
    ///
    /// Returns `None` only under [`WaitPolicy::Fallback`].
    async fn wait_for_lock(&self, key: &str, policy: WaitPolicy) -> PkgpressResult<Option<LockToken>> {
        let lock_key = self.lock_key(key);
        let started = self.clock.now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self
                .locks
                .acquire(lock_key, self.settings.lock_timeout_secs)
                .await
            {
                Ok(Some(token)) => return Ok(Some(token)),
                Ok(None) => {}
                Err(e) if e.is_retryable() => debug!("{}", e),
                Err(e) => return Err(e),
            }

            if policy == WaitPolicy::Fallback {
                return Ok(None);
            }

            if let Some(max_wait) = self.settings.max_wait {
                let waited = (self.clock.now() - started).to_std().unwrap_or_default();
                if waited >= max_wait {
                    return Err(PkgpressError::lock_unavailable(
                        lock_key,
                        format!("still held after {} attempts", attempts),
                    ));
                }
            }

            if attempts == 1 {
                info!("Waiting for build lock {} to build {}", lock_key, key);
            }
            self.clock.sleep(self.settings.retry_interval).await;
        }
    }
}
