//! Build command - force-build one or all packages

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::{PkgpressError, PkgpressResult};
use crate::orchestration::{create_orchestrator, BuildOutcome, Orchestrator};
use crate::package::ResolvedPackage;
use crate::ui::{self, PackageProgress, TaskSpinner, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> PkgpressResult<()> {
    let ctx = UiContext::detect();
    let orchestrator = create_orchestrator(config);

    match args.key {
        Some(key) => build_one(&ctx, &orchestrator, config, &key).await,
        None => build_all(&ctx, &orchestrator, config).await,
    }
}

async fn build_one(
    ctx: &UiContext,
    orchestrator: &Orchestrator,
    config: &Config,
    key: &str,
) -> PkgpressResult<()> {
    let package = resolve(config, key)?;

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Building {}...", key));

    match orchestrator.rebuild(&package).await {
        Ok(outcome) => {
            let (message, built) = describe(key, &outcome);
            if built {
                spinner.stop(&message);
            } else {
                spinner.stop_warn(&message);
            }
            Ok(())
        }
        Err(e) => {
            spinner.stop_error(&format!("Build of {} failed", key));
            Err(e)
        }
    }
}

async fn build_all(ctx: &UiContext, orchestrator: &Orchestrator, config: &Config) -> PkgpressResult<()> {
    if config.packages.is_empty() {
        return Err(PkgpressError::User(
            "No packages configured. Define them under [packages.<name>]".to_string(),
        ));
    }

    ui::intro(ctx, "Building packages");
    let mut progress = PackageProgress::new(ctx, config.packages.len());
    let mut built_count = 0;

    for key in config.packages.keys() {
        progress.start(key);
        let result = match resolve(config, key) {
            Ok(package) => orchestrator.rebuild(&package).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                let (message, built) = describe(key, &outcome);
                if built {
                    built_count += 1;
                }
                progress.finish_one(&message, built);
            }
            Err(e) => {
                progress.finish();
                return Err(e);
            }
        }
    }
    progress.finish();

    let total = config.packages.len();
    if built_count == total {
        ui::outro_success(ctx, &format!("Built {} package(s)", built_count));
    } else {
        ui::outro_warn(
            ctx,
            &format!("Built {} of {} package(s)", built_count, total),
        );
    }
    Ok(())
}

fn resolve(config: &Config, key: &str) -> PkgpressResult<ResolvedPackage> {
    ResolvedPackage::resolve(key, &config.packages, &config.paths.source_root)
}

/// One-line summary of an outcome and whether it produced a build
fn describe(key: &str, outcome: &BuildOutcome) -> (String, bool) {
    match outcome {
        BuildOutcome::Built(build) | BuildOutcome::Cached(build) => {
            let files: Vec<String> = build
                .artifact_paths()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            (format!("Built {} ({})", key, files.join(", ")), true)
        }
        BuildOutcome::Unbuilt(reason) => (format!("{} not built: {}", key, reason), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::UnbuiltReason;
    use crate::store::PackageBuild;

    #[test]
    fn describe_unbuilt() {
        let (message, built) = describe(
            "cdn",
            &BuildOutcome::Unbuilt(UnbuiltReason::NothingToBuild),
        );
        assert!(!built);
        assert_eq!(message, "cdn not built: no local sources");
    }

    #[test]
    fn describe_built() {
        let (message, built) = describe("app", &BuildOutcome::Built(PackageBuild::new()));
        assert!(built);
        assert!(message.starts_with("Built app"));
    }
}
