//! CLI command implementations

pub mod build;
pub mod info;
pub mod list;
pub mod reset;

pub use build::execute as build;
pub use info::execute as info;
pub use list::execute as list;
pub use reset::execute as reset;
