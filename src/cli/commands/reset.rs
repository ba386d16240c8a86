//! Reset command - evict cached builds and their files

use crate::cli::args::ResetArgs;
use crate::config::Config;
use crate::error::PkgpressResult;
use crate::orchestration::create_orchestrator;
use crate::ui::{self, UiContext};

/// Execute the reset command
pub async fn execute(args: ResetArgs, config: &Config) -> PkgpressResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let orchestrator = create_orchestrator(config);

    if args.key.is_none() && !ui::confirm(&ctx, "Remove all built packages?", true).await? {
        ui::step_info(&ctx, "Cancelled");
        return Ok(());
    }

    if !orchestrator.evict(args.key.as_deref()).await? {
        println!("Nothing to do.");
        return Ok(());
    }

    match args.key {
        Some(key) => ui::step_ok(&ctx, &format!("Removed build of {}", key)),
        None => ui::step_ok(&ctx, "Removed all builds"),
    }
    Ok(())
}
