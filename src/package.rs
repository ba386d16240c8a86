//! Package resolution: from configured names to ordered source files
//!
//! A package lists script and stylesheet entries and may depend on other
//! packages. Resolution walks dependencies first, so a package's files always
//! follow those of the packages it builds on, and each file appears once.

use crate::config::schema::PackageConfig;
use crate::error::{PkgpressError, PkgpressResult};
use crate::store::ArtifactClass;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Lock key reserved for serializing all builds; never a valid build key
pub const RESERVED_LOCK_KEY: &str = "_pkgpress";

/// Reject keys that cannot name a package
pub fn validate_key(key: &str) -> PkgpressResult<()> {
    let reason = if key.trim().is_empty() {
        "key is empty"
    } else if key == RESERVED_LOCK_KEY {
        "key is reserved for the global build lock"
    } else {
        return Ok(());
    };

    Err(PkgpressError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

/// Whether a source entry is an external locator rather than a local file
pub fn is_remote(entry: &str) -> bool {
    entry
        .get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"))
        || entry.starts_with("//")
}

/// Sources of one artifact class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassSources {
    /// Local files to combine, in order
    pub files: Vec<PathBuf>,
    /// External locators served as-is
    pub remote_urls: Vec<String>,
}

impl ClassSources {
    /// Add a configured entry; web paths are taken relative to `source_root`
    fn push_entry(&mut self, entry: &str, source_root: &Path) {
        if is_remote(entry) {
            if !self.remote_urls.iter().any(|u| u == entry) {
                self.remote_urls.push(entry.to_string());
            }
        } else {
            self.push_file(source_root.join(entry.trim_start_matches('/')));
        }
    }

    fn push_file(&mut self, file: PathBuf) {
        if !self.files.contains(&file) {
            self.files.push(file);
        }
    }

    /// Whether there is nothing to serve at all
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.remote_urls.is_empty()
    }
}

/// A package flattened into per-class sources
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPackage {
    /// Build key
    pub key: String,
    /// Sources by artifact class
    pub sources: BTreeMap<ArtifactClass, ClassSources>,
    /// Dependency packages folded into this one
    pub sub_keys: BTreeSet<String>,
    /// CSS media tag
    pub media: Option<String>,
    /// Web path to publish the stylesheet under
    pub base_url: Option<String>,
}

impl ResolvedPackage {
    /// Create a package with no sources
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sources: BTreeMap::new(),
            sub_keys: BTreeSet::new(),
            media: None,
            base_url: None,
        }
    }

    /// Append local files for `class`
    pub fn with_files<I>(mut self, class: ArtifactClass, files: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        let sources = self.sources.entry(class).or_default();
        for file in files {
            sources.push_file(file.into());
        }
        self
    }

    /// Append external locators for `class`
    pub fn with_remote_urls<I>(mut self, class: ArtifactClass, urls: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let sources = self.sources.entry(class).or_default();
        sources.remote_urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Sources for `class`
    pub fn sources(&self, class: ArtifactClass) -> Option<&ClassSources> {
        self.sources.get(&class)
    }

    /// Whether any class has local files to build
    pub fn has_local_files(&self) -> bool {
        self.sources.values().any(|s| !s.files.is_empty())
    }

    /// Resolve `key` and its dependencies from the configured packages
    pub fn resolve(
        key: &str,
        packages: &BTreeMap<String, PackageConfig>,
        source_root: &Path,
    ) -> PkgpressResult<Self> {
        validate_key(key)?;
        let root = packages
            .get(key)
            .ok_or_else(|| PkgpressError::PackageNotFound(key.to_string()))?;

        let mut resolved = Self::new(key);
        resolved.media = root.media.clone();
        resolved.base_url = root.base_url.clone();

        let mut visiting = Vec::new();
        let mut done = BTreeSet::new();
        visit(
            key,
            packages,
            source_root,
            &mut visiting,
            &mut done,
            &mut resolved,
        )?;

        done.remove(key);
        resolved.sub_keys = done;
        Ok(resolved)
    }
}

fn visit(
    key: &str,
    packages: &BTreeMap<String, PackageConfig>,
    source_root: &Path,
    visiting: &mut Vec<String>,
    done: &mut BTreeSet<String>,
    resolved: &mut ResolvedPackage,
) -> PkgpressResult<()> {
    if done.contains(key) {
        return Ok(());
    }
    if visiting.iter().any(|k| k == key) {
        return Err(PkgpressError::InvalidKey {
            key: key.to_string(),
            reason: format!("dependency cycle: {} -> {}", visiting.join(" -> "), key),
        });
    }

    let package = packages
        .get(key)
        .ok_or_else(|| PkgpressError::PackageNotFound(key.to_string()))?;

    visiting.push(key.to_string());
    for dependency in &package.depends {
        visit(dependency, packages, source_root, visiting, done, resolved)?;
    }
    visiting.pop();

    for (class, entries) in [
        (ArtifactClass::Js, &package.js),
        (ArtifactClass::Css, &package.css),
    ] {
        if entries.is_empty() {
            continue;
        }
        let sources = resolved.sources.entry(class).or_default();
        for entry in entries {
            sources.push_entry(entry, source_root);
        }
    }

    done.insert(key.to_string());
    Ok(())
}
