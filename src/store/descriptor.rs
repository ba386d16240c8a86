//! Artifact descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of artifact built from a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactClass {
    /// JavaScript bundle
    Js,
    /// Stylesheet bundle
    Css,
}

impl ArtifactClass {
    /// File extension of built artifacts
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }

    /// Whether concatenated fragments need a statement terminator between them
    pub fn needs_statement_separator(&self) -> bool {
        matches!(self, Self::Js)
    }

    /// All classes in build order
    pub fn all() -> &'static [Self] {
        &[Self::Js, Self::Css]
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Metadata for one built artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Location of the built file
    pub artifact_path: PathBuf,
    /// Input files in concatenation order
    pub source_files: Vec<PathBuf>,
    /// Locators to serve, remote pass-through entries first
    pub published_urls: Vec<String>,
    /// Other build keys whose sources this artifact already contains
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sub_keys: BTreeSet<String>,
    /// Variant tag such as a CSS media query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// When the artifact was built
    pub built_at: DateTime<Utc>,
}

impl ArtifactDescriptor {
    /// Whether the artifact file is still on disk
    pub fn artifact_exists(&self) -> bool {
        self.artifact_path.is_file()
    }
}

/// All artifacts built for one key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageBuild {
    artifacts: BTreeMap<ArtifactClass, ArtifactDescriptor>,
}

impl PackageBuild {
    /// Create an empty build record
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the descriptor for `class`
    pub fn insert(&mut self, class: ArtifactClass, descriptor: ArtifactDescriptor) {
        self.artifacts.insert(class, descriptor);
    }

    /// Descriptor for `class`
    pub fn get(&self, class: ArtifactClass) -> Option<&ArtifactDescriptor> {
        self.artifacts.get(&class)
    }

    /// Descriptors in class order
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactClass, &ArtifactDescriptor)> {
        self.artifacts.iter().map(|(class, d)| (*class, d))
    }

    /// Whether no artifact was recorded
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Paths of every recorded artifact
    pub fn artifact_paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.values().map(|d| d.artifact_path.as_path())
    }

    /// Artifact paths that no longer exist on disk
    pub fn missing_artifacts(&self) -> Vec<&Path> {
        self.artifacts
            .values()
            .filter(|d| !d.artifact_exists())
            .map(|d| d.artifact_path.as_path())
            .collect()
    }
}
