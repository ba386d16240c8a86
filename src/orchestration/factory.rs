//! Orchestrator factory
//!
//! Wires file-backed tables in the runtime directory to the configured
//! builder and the system clock.

use crate::builder::ArtifactBuilder;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::orchestration::{Orchestrator, OrchestratorSettings};
use crate::state::FileBackend;
use std::sync::Arc;

/// Lock table file in the runtime directory
pub const LOCK_TABLE_FILE: &str = "pkgpress_mutex.json";

/// Metadata table file in the runtime directory
pub const METADATA_TABLE_FILE: &str = "packages.json";

/// Create an orchestrator sharing its tables with every other process that
/// uses the same runtime directory
pub fn create_orchestrator(config: &Config) -> Orchestrator {
    let runtime_dir = &config.paths.runtime_dir;
    Orchestrator::new(
        Arc::new(FileBackend::new(runtime_dir.join(LOCK_TABLE_FILE))),
        Arc::new(FileBackend::new(runtime_dir.join(METADATA_TABLE_FILE))),
        ArtifactBuilder::from_config(config),
        Arc::new(SystemClock),
        OrchestratorSettings::from(&config.compression),
    )
}
