//! pkgpress - single-flight build cache for asset packages
//!
//! Combines and compresses groups of source files at most once across all
//! processes sharing a runtime directory, serves cached builds instantly and
//! rebuilds when a cached artifact disappears from disk.

pub mod builder;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod orchestration;
pub mod package;
pub mod state;
pub mod store;
pub mod ui;

pub use error::{PkgpressError, PkgpressResult};
