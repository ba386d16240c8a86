//! Terminal output for the command-line interface
//!
//! Spinners, prompts and styled steps via `cliclack` and `indicatif`, falling
//! back to plain lines when stdout is not a terminal or a CI system is
//! detected.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, section, step_info, step_ok,
};
pub use progress::{PackageProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, PkgpressTheme};
