//! Named, timeout-bounded mutual exclusion across processes
//!
//! A logical lock is an entry in a shared lock table. The table itself is
//! serialized by its backend's exclusive guard, which is only held for the
//! short read-compare-write critical section of `acquire`/`release`.
//!
//! # Staleness
//!
//! | `timeout_secs` | Held while |
//! |----------------|------------|
//! | `0` | until released |
//! | `T > 0` | `now < acquired_at + T` |
//!
//! A stale entry is treated as absent, so a process that crashed while
//! holding a lock blocks others for at most `T` seconds.

pub mod manager;
pub mod table;

pub use manager::{LockManager, LockToken};
pub use table::{LockEntry, LockTable};
