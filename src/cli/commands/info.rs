//! Info command - show cached build details

use crate::cli::args::{DetailFormat, InfoArgs};
use crate::config::Config;
use crate::error::{PkgpressError, PkgpressResult};
use crate::orchestration::{create_orchestrator, Orchestrator};
use crate::store::PackageBuild;
use crate::ui::{self, UiContext};
use std::collections::BTreeMap;

/// Execute the info command
pub async fn execute(args: InfoArgs, config: &Config) -> PkgpressResult<()> {
    let orchestrator = create_orchestrator(config);

    let builds = match args.key {
        Some(key) => {
            let build = orchestrator
                .lookup(&key)
                .await?
                .ok_or(PkgpressError::NoBuildData(key.clone()))?;
            BTreeMap::from([(key, build)])
        }
        None => load_all(&orchestrator).await?,
    };

    match args.format {
        DetailFormat::Json => print_json(&builds)?,
        DetailFormat::Table => print_table(&builds),
    }
    Ok(())
}

/// Every stored build; keys whose artifacts vanished meanwhile are skipped
async fn load_all(orchestrator: &Orchestrator) -> PkgpressResult<BTreeMap<String, PackageBuild>> {
    let mut builds = BTreeMap::new();
    for key in orchestrator.list_keys().await? {
        if let Some(build) = orchestrator.lookup(&key).await? {
            builds.insert(key, build);
        }
    }
    Ok(builds)
}

fn print_json(builds: &BTreeMap<String, PackageBuild>) -> PkgpressResult<()> {
    let json = serde_json::to_string_pretty(builds)?;
    println!("{}", json);
    Ok(())
}

fn print_table(builds: &BTreeMap<String, PackageBuild>) {
    let ctx = UiContext::detect();

    if builds.is_empty() {
        ui::step_info(&ctx, "No built packages");
        return;
    }

    let keys: Vec<&str> = builds.keys().map(String::as_str).collect();
    ui::intro(&ctx, &format!("Built packages: {}", keys.join(", ")));

    for (key, build) in builds {
        for (class, descriptor) in build.iter() {
            ui::section(&ctx, &format!("{} ({})", key, class));
            ui::key_value(&ctx, "file", &descriptor.artifact_path.display().to_string());
            ui::key_value(&ctx, "urls", &descriptor.published_urls.join(", "));
            ui::key_value(
                &ctx,
                "built",
                &descriptor.built_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            if !descriptor.sub_keys.is_empty() {
                let sub_keys: Vec<&str> = descriptor.sub_keys.iter().map(String::as_str).collect();
                ui::key_value(&ctx, "includes", &sub_keys.join(", "));
            }
            if let Some(ref group) = descriptor.group {
                ui::key_value(&ctx, "media", group);
            }
            ui::key_value(&ctx, "sources", &descriptor.source_files.len().to_string());
            for source in &descriptor.source_files {
                println!("    {}", source.display());
            }
        }
    }
}
