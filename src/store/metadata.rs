//! Metadata store with lazy loading and self-healing lookups

use crate::error::PkgpressResult;
use crate::state::{read_table, write_table, StateBackend};
use crate::store::descriptor::PackageBuild;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type MetadataTable = BTreeMap<String, PackageBuild>;

/// Key to build-record table shared through a [`StateBackend`]
///
/// The table is loaded on first use and cached for this context. Mutations
/// re-read the durable table under the backend guard, apply the change and
/// persist before returning, so updates from other contexts are never
/// overwritten and this context always observes its own writes.
pub struct MetadataStore {
    backend: Arc<dyn StateBackend>,
    table: Mutex<Option<MetadataTable>>,
}

impl MetadataStore {
    /// Create a store over a metadata table backend
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            table: Mutex::new(None),
        }
    }

    /// Look up the build record for `key` using the cached table
    ///
    /// A record referencing a missing artifact file is evicted and reported
    /// as a miss.
    pub async fn lookup(&self, key: &str) -> PkgpressResult<Option<PackageBuild>> {
        self.lookup_with(key, false).await
    }

    /// Like [`MetadataStore::lookup`], but reloads the table first to pick up
    /// other contexts' writes
    pub async fn lookup_fresh(&self, key: &str) -> PkgpressResult<Option<PackageBuild>> {
        self.lookup_with(key, true).await
    }

    /// Drop the cached table so the next lookup reads durable storage
    pub async fn reload(&self) -> PkgpressResult<()> {
        let table = read_table(self.backend.as_ref()).await?;
        *self.table.lock().await = Some(table);
        Ok(())
    }

    /// Record `build` as the result for `key`, replacing any previous record
    pub async fn store(&self, key: &str, build: PackageBuild) -> PkgpressResult<()> {
        self.modify(|table| {
            table.insert(key.to_string(), build);
            ((), true)
        })
        .await?;
        debug!("Stored build metadata for {}", key);
        Ok(())
    }

    /// Remove `key` (or every key when `None`) together with its artifact files
    ///
    /// Returns whether anything was removed. Evicting an unknown key touches
    /// neither the table nor the filesystem.
    pub async fn evict(&self, key: Option<&str>) -> PkgpressResult<bool> {
        let current: MetadataTable = read_table(self.backend.as_ref()).await?;
        let present = match key {
            Some(key) => current.contains_key(key),
            None => !current.is_empty(),
        };
        if !present {
            *self.table.lock().await = Some(current);
            return Ok(false);
        }

        let removed = self
            .modify(|table| {
                let removed: Vec<(String, PackageBuild)> = match key {
                    Some(key) => table.remove_entry(key).into_iter().collect(),
                    None => std::mem::take(table).into_iter().collect(),
                };
                let changed = !removed.is_empty();
                (removed, changed)
            })
            .await?;

        for (name, build) in &removed {
            for path in build.artifact_paths() {
                remove_artifact(path).await;
            }
            info!("Evicted {}", name);
        }

        Ok(!removed.is_empty())
    }

    /// All keys in the durable table
    pub async fn list_keys(&self) -> PkgpressResult<Vec<String>> {
        self.reload().await?;
        let table = self.table.lock().await;
        Ok(table
            .as_ref()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn lookup_with(&self, key: &str, force_reload: bool) -> PkgpressResult<Option<PackageBuild>> {
        let build = {
            let mut cached = self.table.lock().await;
            if cached.is_none() || force_reload {
                *cached = Some(read_table(self.backend.as_ref()).await?);
            }
            cached.as_ref().and_then(|table| table.get(key)).cloned()
        };

        let Some(build) = build else {
            return Ok(None);
        };

        let missing = build.missing_artifacts();
        let Some(first_missing) = missing.first() else {
            return Ok(Some(build));
        };

        info!(
            "Evicting {}: artifact {} no longer exists",
            key,
            first_missing.display()
        );

        self.modify(|table| {
            // Another context may have rebuilt the key meanwhile
            let stale = table
                .get(key)
                .is_some_and(|b| !b.missing_artifacts().is_empty());
            if stale {
                table.remove(key);
            }
            ((), stale)
        })
        .await?;

        Ok(None)
    }

    async fn modify<F, R>(&self, f: F) -> PkgpressResult<R>
    where
        F: FnOnce(&mut MetadataTable) -> (R, bool) + Send,
        R: Send,
    {
        let _guard = self.backend.lock().await?;
        let mut table: MetadataTable = read_table(self.backend.as_ref()).await?;

        let (result, changed) = f(&mut table);
        if changed {
            write_table(self.backend.as_ref(), &table).await?;
        }

        *self.table.lock().await = Some(table);
        Ok(result)
    }
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed artifact {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove artifact {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FileBackend, MemoryBackend};
    use crate::store::descriptor::{ArtifactClass, ArtifactDescriptor};
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn build_with(dir: &TempDir, name: &str) -> (PackageBuild, PathBuf) {
        let path = dir.path().join(format!("js_pkg_{}.js", name));
        std::fs::write(&path, "var a=1;").unwrap();

        let mut build = PackageBuild::new();
        build.insert(
            ArtifactClass::Js,
            ArtifactDescriptor {
                artifact_path: path.clone(),
                source_files: vec![PathBuf::from("/web/js/a.js")],
                published_urls: vec![format!("/assets/js_pkg_{}.js", name)],
                sub_keys: BTreeSet::new(),
                group: None,
                built_at: Utc::now(),
            },
        );
        (build, path)
    }

    fn store_over(backend: &MemoryBackend) -> MetadataStore {
        MetadataStore::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn lookup_miss_then_hit() {
        let dir = TempDir::new().unwrap();
        let store = store_over(&MemoryBackend::new());
        assert!(store.lookup("app").await.unwrap().is_none());

        let (build, _) = build_with(&dir, "app");
        store.store("app", build.clone()).await.unwrap();

        assert_eq!(store.lookup("app").await.unwrap(), Some(build));
    }

    #[tokio::test]
    async fn missing_artifact_self_heals() {
        let dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let store = store_over(&backend);

        let (build, path) = build_with(&dir, "app");
        store.store("app", build).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(store.lookup("app").await.unwrap().is_none());
        // Evicted from durable storage, not only from this context
        assert!(store_over(&backend).list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_context_needs_reload() {
        let dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let writer = store_over(&backend);
        let reader = store_over(&backend);

        assert!(reader.lookup("app").await.unwrap().is_none());

        let (build, _) = build_with(&dir, "app");
        writer.store("app", build.clone()).await.unwrap();

        assert!(reader.lookup("app").await.unwrap().is_none());
        assert_eq!(reader.lookup_fresh("app").await.unwrap(), Some(build));
    }

    #[tokio::test]
    async fn store_keeps_other_contexts_entries() {
        let dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let first = store_over(&backend);
        let second = store_over(&backend);

        // Both contexts loaded the empty table
        assert!(first.lookup("a").await.unwrap().is_none());
        assert!(second.lookup("b").await.unwrap().is_none());

        first.store("a", build_with(&dir, "a").0).await.unwrap();
        second.store("b", build_with(&dir, "b").0).await.unwrap();

        assert_eq!(first.list_keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn evict_absent_key_is_noop() {
        let dir = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let store = store_over(&backend);
        store.store("app", build_with(&dir, "app").0).await.unwrap();
        let writes = backend.write_count();

        assert!(!store.evict(Some("other")).await.unwrap());
        assert_eq!(backend.write_count(), writes);
    }

    #[tokio::test]
    async fn evict_absent_key_leaves_filesystem_alone() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        let store = MetadataStore::new(Arc::new(FileBackend::new(state.join("packages.json"))));

        assert!(!store.evict(Some("app")).await.unwrap());
        assert!(!store.evict(None).await.unwrap());
        assert!(!state.exists());
    }

    #[tokio::test]
    async fn evict_key_removes_files() {
        let dir = TempDir::new().unwrap();
        let store = store_over(&MemoryBackend::new());
        let (app, app_path) = build_with(&dir, "app");
        let (admin, admin_path) = build_with(&dir, "admin");
        store.store("app", app).await.unwrap();
        store.store("admin", admin).await.unwrap();

        assert!(store.evict(Some("app")).await.unwrap());

        assert!(!app_path.exists());
        assert!(admin_path.exists());
        assert!(store.lookup("app").await.unwrap().is_none());
        assert!(store.lookup("admin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn evict_all() {
        let dir = TempDir::new().unwrap();
        let store = store_over(&MemoryBackend::new());
        let (app, app_path) = build_with(&dir, "app");
        let (admin, admin_path) = build_with(&dir, "admin");
        store.store("app", app).await.unwrap();
        store.store("admin", admin).await.unwrap();

        assert!(store.evict(None).await.unwrap());

        assert!(!app_path.exists());
        assert!(!admin_path.exists());
        assert!(store.lookup("app").await.unwrap().is_none());
        assert!(store.lookup("admin").await.unwrap().is_none());
        assert!(!store.evict(None).await.unwrap());
    }

    #[tokio::test]
    async fn evict_tolerates_already_deleted_files() {
        let dir = TempDir::new().unwrap();
        let store = store_over(&MemoryBackend::new());
        let (app, app_path) = build_with(&dir, "app");
        store.store("app", app).await.unwrap();
        std::fs::remove_file(&app_path).unwrap();

        assert!(store.evict(Some("app")).await.unwrap());
    }

    #[tokio::test]
    async fn file_backed_store_persists() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("state").join("packages.json");
        let (build, _) = build_with(&dir, "app");

        MetadataStore::new(Arc::new(FileBackend::new(&table)))
            .store("app", build.clone())
            .await
            .unwrap();

        let reopened = MetadataStore::new(Arc::new(FileBackend::new(&table)));
        assert_eq!(reopened.lookup("app").await.unwrap(), Some(build));
    }
}
