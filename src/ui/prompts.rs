//! Confirmation prompts with a non-interactive fallback

use super::context::UiContext;
use crate::error::{PkgpressError, PkgpressResult};

/// Ask a yes/no question
///
/// Auto-yes answers yes; without a terminal the `default` is returned.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PkgpressResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| PkgpressError::User(format!("Prompt task failed: {}", e)))?;

    answer.map_err(|e| PkgpressError::User(format!("Prompt failed: {}", e)))
}
