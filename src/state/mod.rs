//! Shared state storage
//!
//! Both persisted tables (the lock table and the metadata table) are plain
//! repositories over a [`StateBackend`]: read-all/write-all of one serialized
//! document, serialized between processes by the backend's own exclusive
//! guard. Only a holder of that guard may write the document.
//!
//! | Backend | Guard | Scope |
//! |---------|-------|-------|
//! | [`FileBackend`] | `flock` on a companion `.lock` file | all processes on the host |
//! | [`MemoryBackend`] | async mutex | clones within one process |

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{read_table, read_table_strict, write_table, StateBackend, StateGuard};
pub use file::FileBackend;
pub use memory::MemoryBackend;
