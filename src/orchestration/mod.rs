//! Single-flight build orchestration
//!
//! Ties the lock manager, the metadata store and the artifact builder
//! together. Per call, a key moves through:
//!
//! ```text
//! Unbuilt -> Locking -> Won  -> Building -> Built | Failed
//!                    -> Lost -> (block: retry Locking | fallback: Unbuilt)
//! ```
//!
//! After winning the lock the metadata is checked again, so a caller that
//! waited for another context's build returns that build instead of
//! repeating it.

mod factory;
mod orchestrator;

pub use factory::{create_orchestrator, LOCK_TABLE_FILE, METADATA_TABLE_FILE};
pub use orchestrator::Orchestrator;

use crate::config::schema::CompressionConfig;
use crate::store::PackageBuild;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which lock a build takes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    /// One reserved lock serializes every build
    #[default]
    Global,
    /// One lock per build key
    Key,
}

/// What a caller does when another context holds the build lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Sleep and retry until the lock is won
    Block,
    /// Give up at once and serve unbuilt sources
    Fallback,
}

/// Tunables derived from `[compression]`
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Whether packages are built at all
    pub enabled: bool,
    /// Behaviour on a lost lock
    pub wait: WaitPolicy,
    /// Lock granularity
    pub lock_scope: LockScope,
    /// Staleness timeout written with every lock entry
    pub lock_timeout_secs: u64,
    /// Pause between attempts under [`WaitPolicy::Block`]
    pub retry_interval: Duration,
    /// Upper bound on blocking; `None` waits as long as it takes
    pub max_wait: Option<Duration>,
}

impl From<&CompressionConfig> for OrchestratorSettings {
    fn from(config: &CompressionConfig) -> Self {
        Self {
            enabled: config.enabled,
            wait: if config.block_during_compression {
                WaitPolicy::Block
            } else {
                WaitPolicy::Fallback
            },
            lock_scope: config.lock_scope,
            lock_timeout_secs: config.lock_timeout_secs,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
            max_wait: (config.max_wait_secs > 0)
                .then(|| Duration::from_secs(config.max_wait_secs)),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&CompressionConfig::default())
    }
}

/// Why no build was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbuiltReason {
    /// Compression is switched off
    Disabled,
    /// Another context is building and the policy is fallback
    LockBusy,
    /// The package has no local files to combine
    NothingToBuild,
}

impl fmt::Display for UnbuiltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disabled => "compression disabled",
            Self::LockBusy => "build in progress elsewhere",
            Self::NothingToBuild => "no local sources",
        };
        f.write_str(text)
    }
}

/// Result of [`Orchestrator::ensure_built`]
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// Served from the metadata store
    Cached(PackageBuild),
    /// Built by this call
    Built(PackageBuild),
    /// Use the unbuilt sources instead
    Unbuilt(UnbuiltReason),
}

impl BuildOutcome {
    /// The build record, if there is one
    pub fn build(&self) -> Option<&PackageBuild> {
        match self {
            Self::Cached(build) | Self::Built(build) => Some(build),
            Self::Unbuilt(_) => None,
        }
    }
}
