//! Artifact builder
//!
//! Combines a package's sources per artifact class, runs the configured
//! transform and publishes the result. Output names are derived from the
//! class, the key and a hash of the combined input:
//!
//! ```text
//! js_pkg_app_3f2a9c0d81b4e677.js
//! ```
//!
//! so building identical inputs twice yields the same path.

mod combine;
mod publish;
mod transform;

pub use combine::{combine, CombinedFile, SeparatorPolicy};
pub use publish::{Published, Publisher};
pub use transform::{
    create_transform, ArtifactTransform, ExternalTransform, TransformFailure, VerbatimTransform,
};

use crate::config::Config;
use crate::error::{PkgpressError, PkgpressResult};
use crate::package::ResolvedPackage;
use crate::store::{ArtifactClass, ArtifactDescriptor, PackageBuild};
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Hex digits of the content hash used in artifact names
const HASH_LEN: usize = 16;

/// Builds and publishes package artifacts
pub struct ArtifactBuilder {
    work_dir: PathBuf,
    transform: Box<dyn ArtifactTransform>,
    publisher: Publisher,
}

impl ArtifactBuilder {
    /// Create a builder writing intermediate files to `work_dir`
    pub fn new(
        work_dir: impl Into<PathBuf>,
        transform: Box<dyn ArtifactTransform>,
        publisher: Publisher,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            transform,
            publisher,
        }
    }

    /// Create a builder from configuration
    pub fn from_config(config: &Config) -> Self {
        let paths = &config.paths;
        let web_root = paths
            .web_root
            .clone()
            .unwrap_or_else(|| paths.source_root.clone());
        Self::new(
            &paths.runtime_dir,
            create_transform(config),
            Publisher::new(&paths.publish_dir, &paths.publish_url, web_root),
        )
    }

    /// Directory holding intermediate files
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Publisher used for finished artifacts
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Combine `files` and transform them into one artifact of `class`
    ///
    /// The combined temporary file is removed on every exit path. An artifact
    /// already present under the computed name is reused as is.
    pub async fn build(
        &self,
        key: &str,
        class: ArtifactClass,
        files: &[PathBuf],
    ) -> PkgpressResult<PathBuf> {
        let label = format!("{}_{}", class, key);
        let combined = combine(
            files,
            SeparatorPolicy::for_class(class),
            &self.work_dir,
            &label,
        )
        .await?;

        let output = self.work_dir.join(artifact_name(key, class, combined.digest()));
        if output.is_file() {
            debug!("Reusing existing artifact {}", output.display());
            return Ok(output);
        }

        let partial = output.with_extension(format!("{}.part", Uuid::new_v4().simple()));
        info!(
            "Building {} {} from {} files ({} transform)",
            class,
            key,
            files.len(),
            self.transform.name()
        );

        if let Err(failure) = self.transform.apply(combined.path(), class, &partial).await {
            let _ = fs::remove_file(&partial).await;
            return Err(PkgpressError::build_failure(
                key,
                failure.command,
                failure.output,
            ));
        }

        fs::rename(&partial, &output).await.map_err(|e| {
            PkgpressError::io(format!("moving artifact into {}", output.display()), e)
        })?;

        Ok(output)
    }

    /// Build and publish every class of `package` that has local files
    ///
    /// Returns `None` when nothing was built. On failure, files this call
    /// newly published are removed again; files that were already in place,
    /// such as those of an unchanged previous build, are left alone.
    pub async fn build_package(&self, package: &ResolvedPackage) -> PkgpressResult<Option<PackageBuild>> {
        let mut build = PackageBuild::new();
        let mut created = Vec::new();

        for &class in ArtifactClass::all() {
            let Some(sources) = package.sources(class) else {
                continue;
            };
            if sources.files.is_empty() {
                continue;
            }

            match self.build_class(package, class, &sources.files).await {
                Ok((artifact, fresh)) => {
                    if fresh {
                        created.push(artifact.path.clone());
                    }
                    let mut published_urls = sources.remote_urls.clone();
                    published_urls.push(artifact.url);

                    build.insert(
                        class,
                        ArtifactDescriptor {
                            artifact_path: artifact.path,
                            source_files: sources.files.clone(),
                            published_urls,
                            sub_keys: match class {
                                ArtifactClass::Js => package.sub_keys.clone(),
                                ArtifactClass::Css => BTreeSet::new(),
                            },
                            group: match class {
                                ArtifactClass::Js => None,
                                ArtifactClass::Css => package.media.clone(),
                            },
                            built_at: Utc::now(),
                        },
                    );
                }
                Err(e) => {
                    for path in &created {
                        self.publisher.unpublish(path).await;
                    }
                    return Err(e);
                }
            }
        }

        Ok((!build.is_empty()).then_some(build))
    }

    async fn build_class(
        &self,
        package: &ResolvedPackage,
        class: ArtifactClass,
        files: &[PathBuf],
    ) -> PkgpressResult<(Published, bool)> {
        let artifact = self.build(&package.key, class, files).await?;
        let base_url = match class {
            ArtifactClass::Css => package.base_url.as_deref(),
            ArtifactClass::Js => None,
        };
        let existed = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.publisher.target(name, base_url).path.is_file());
        let published = self.publisher.publish(&artifact, base_url).await?;
        Ok((published, !existed))
    }
}

/// `{class}_pkg_{key}_{hash}.{ext}`
fn artifact_name(key: &str, class: ArtifactClass, digest: &str) -> String {
    let hash = digest.get(..HASH_LEN).unwrap_or(digest);
    format!(
        "{}_pkg_{}_{}.{}",
        class,
        combine::sanitize(key),
        hash,
        class.extension()
    )
}
