//! Spinners and progress bars with a plain fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner for one long-running step
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a spinner (nothing is shown until [`TaskSpinner::start`])
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Show the spinner
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Finish successfully
    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    /// Finish with a failure
    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }

    /// Finish with a warning
    pub fn stop_warn(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(format!("{} {}", style("!").yellow(), message)),
            None => println!("{} {}", style("[WARN]").yellow(), message),
        }
    }
}

/// Progress over a fixed list of packages
pub struct PackageProgress {
    bar: Option<ProgressBar>,
    total: u64,
    done: u64,
}

impl PackageProgress {
    /// Create a bar for `total` packages
    pub fn new(ctx: &UiContext, total: usize) -> Self {
        let total = total as u64;
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(total);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {bar:20.cyan/dim} {pos}/{len} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━╸─");
            bar.set_style(template);
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self {
            bar,
            total,
            done: 0,
        }
    }

    /// Announce the package being built
    pub fn start(&self, key: &str) {
        match self.bar {
            Some(ref bar) => bar.set_message(key.to_string()),
            None => println!(
                "{} [{}/{}] {}",
                style("...").dim(),
                self.done + 1,
                self.total,
                key
            ),
        }
    }

    /// Record the outcome of the current package
    pub fn finish_one(&mut self, message: &str, ok: bool) {
        self.done += 1;
        let marker = if ok {
            style("[OK]").green()
        } else {
            style("[WARN]").yellow()
        };
        match self.bar {
            Some(ref bar) => {
                bar.println(format!("  {} {}", marker, message));
                bar.inc(1);
            }
            None => println!("  {} {}", marker, message),
        }
    }

    /// Remove the bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Building app");
        spinner.stop("Built app");
        spinner.stop_warn("stopped twice is harmless");
    }

    #[test]
    fn package_progress_counts() {
        let ctx = UiContext::non_interactive();
        let mut progress = PackageProgress::new(&ctx, 2);
        progress.start("app");
        progress.finish_one("Built app", true);
        progress.start("cdn");
        progress.finish_one("cdn has no local sources", false);
        progress.finish();
        assert_eq!(progress.done, 2);
    }
}
