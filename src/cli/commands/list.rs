//! List command - show packages with a cached build

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::PkgpressResult;
use crate::orchestration::create_orchestrator;
use crate::store::{ArtifactClass, PackageBuild};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One row of the listing
#[derive(Debug, Serialize)]
struct BuiltPackage {
    key: String,
    classes: Vec<ArtifactClass>,
    built_at: Option<String>,
}

impl BuiltPackage {
    fn new(key: String, build: &PackageBuild) -> Self {
        Self {
            key,
            classes: build.iter().map(|(class, _)| class).collect(),
            built_at: build
                .iter()
                .map(|(_, d)| d.built_at)
                .max()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
        }
    }
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> PkgpressResult<()> {
    let orchestrator = create_orchestrator(config);

    let mut packages = Vec::new();
    for key in orchestrator.list_keys().await? {
        if let Some(build) = orchestrator.lookup(&key).await? {
            packages.push(BuiltPackage::new(key, &build));
        }
    }

    if packages.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No built packages"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&packages),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&packages)?),
        OutputFormat::Plain => {
            for package in &packages {
                println!("{}", package.key);
            }
        }
    }

    Ok(())
}

fn print_table(packages: &[BuiltPackage]) {
    println!(
        "{:<24} {:<10} {:<16}",
        style("PACKAGE").bold(),
        style("CLASSES").bold(),
        style("BUILT").bold()
    );
    println!("{}", "-".repeat(52));

    for package in packages {
        let classes: Vec<String> = package.classes.iter().map(|c| c.to_string()).collect();
        println!(
            "{:<24} {:<10} {:<16}",
            package.key,
            classes.join(","),
            package.built_at.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!("{} package(s)", packages.len());
}
