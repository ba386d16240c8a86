//! Artifact transforms: external program or verbatim copy
//!
//! The builder only sees the [`ArtifactTransform`] trait, so neither the
//! build logic nor its tests depend on a compressor being installed.

use crate::config::Config;
use crate::store::ArtifactClass;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines kept in a failure report
const FAILURE_TAIL_LINES: usize = 50;

/// A transform run that did not produce its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    /// Command line that was attempted
    pub command: String,
    /// Captured diagnostics
    pub output: String,
}

/// Turns a combined input file into the final artifact
#[async_trait]
pub trait ArtifactTransform: Send + Sync {
    /// Write the transformed `input` to `output`
    async fn apply(
        &self,
        input: &Path,
        class: ArtifactClass,
        output: &Path,
    ) -> Result<(), TransformFailure>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Runs a configured program with `{input}`, `{output}` and `{class}`
/// substituted into its argument template
#[derive(Debug, Clone)]
pub struct ExternalTransform {
    program: String,
    args: Vec<String>,
}

impl ExternalTransform {
    /// Create a transform for `program` with an argument template
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments with placeholders filled in
    pub fn render_args(&self, input: &Path, class: ArtifactClass, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let class = class.extension();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{class}", class)
            })
            .collect()
    }
}

#[async_trait]
impl ArtifactTransform for ExternalTransform {
    async fn apply(
        &self,
        input: &Path,
        class: ArtifactClass,
        output: &Path,
    ) -> Result<(), TransformFailure> {
        let args = self.render_args(input, class, output);
        let command = std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let failure = |output: String| TransformFailure {
            command: command.clone(),
            output,
        };

        debug!("Running transform: {}", command);
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| failure(format!("could not start {}: {}", self.program, e)))?;

        if !result.status.success() {
            let stdout = String::from_utf8_lossy(&result.stdout);
            let stderr = String::from_utf8_lossy(&result.stderr);
            let mut report = failure_tail(&stdout, &stderr);
            if report.is_empty() {
                report = format!("exited with {}", result.status);
            }
            return Err(failure(report));
        }

        if !output.is_file() {
            return Err(failure(format!(
                "exited successfully but did not create {}",
                output.display()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

/// Copies the combined input unchanged ("combine only" mode)
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimTransform;

#[async_trait]
impl ArtifactTransform for VerbatimTransform {
    async fn apply(
        &self,
        input: &Path,
        _class: ArtifactClass,
        output: &Path,
    ) -> Result<(), TransformFailure> {
        tokio::fs::copy(input, output)
            .await
            .map(|_| ())
            .map_err(|e| TransformFailure {
                command: format!("copy {} {}", input.display(), output.display()),
                output: e.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "verbatim"
    }
}

/// Create the transform selected by the configuration
pub fn create_transform(config: &Config) -> Box<dyn ArtifactTransform> {
    if config.compression.combine_only {
        Box::new(VerbatimTransform)
    } else {
        Box::new(ExternalTransform::new(
            config.transform.program.clone(),
            config.transform.args.clone(),
        ))
    }
}

/// Last lines of combined stdout and stderr
fn failure_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> ExternalTransform {
        ExternalTransform::new(
            "sh",
            vec![
                "-c".to_string(),
                script.to_string(),
                "transform".to_string(),
                "{input}".to_string(),
                "{output}".to_string(),
                "{class}".to_string(),
            ],
        )
    }

    #[test]
    fn render_args_substitutes_placeholders() {
        let transform = ExternalTransform::new(
            "java",
            ["-jar", "yui.jar", "--type", "{class}", "-o", "{output}", "{input}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        let args = transform.render_args(
            Path::new("/run/in.tmp"),
            ArtifactClass::Css,
            Path::new("/run/out.css"),
        );
        assert_eq!(
            args,
            vec!["-jar", "yui.jar", "--type", "css", "-o", "/run/out.css", "/run/in.tmp"]
        );
    }

    #[test]
    fn failure_tail_keeps_last_lines() {
        let stdout: String = (0..60).map(|i| format!("line {}\n", i)).collect();
        let tail = failure_tail(&stdout, "boom");
        assert_eq!(tail.lines().count(), FAILURE_TAIL_LINES);
        assert!(tail.ends_with("boom"));
        assert!(!tail.contains("line 10\n"));
    }

    #[tokio::test]
    async fn verbatim_copies_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tmp");
        let output = dir.path().join("out.js");
        std::fs::write(&input, "var a;").unwrap();

        VerbatimTransform
            .apply(&input, ArtifactClass::Js, &output)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "var a;");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn external_transform_runs_program() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tmp");
        let output = dir.path().join("out.js");
        std::fs::write(&input, "var a;").unwrap();

        sh("cp \"$1\" \"$2\" && echo \"/* $3 */\" >> \"$2\"")
            .apply(&input, ArtifactClass::Js, &output)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "var a;/* js */\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn external_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tmp");
        std::fs::write(&input, "x").unwrap();

        let failure = sh("echo 'syntax error' >&2; exit 3")
            .apply(&input, ArtifactClass::Js, &dir.path().join("out.js"))
            .await
            .unwrap_err();

        assert!(failure.command.starts_with("sh -c"));
        assert!(failure.output.contains("syntax error"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn external_without_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tmp");
        std::fs::write(&input, "x").unwrap();

        let failure = sh("true")
            .apply(&input, ArtifactClass::Css, &dir.path().join("out.css"))
            .await
            .unwrap_err();
        assert!(failure.output.contains("did not create"));
    }

    #[tokio::test]
    async fn missing_program_is_failure() {
        let dir = TempDir::new().unwrap();
        let transform = ExternalTransform::new("pkgpress-no-such-program", vec![]);

        let failure = transform
            .apply(
                &dir.path().join("in"),
                ArtifactClass::Js,
                &dir.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(failure.output.contains("could not start"));
    }

    #[test]
    fn factory_respects_combine_only() {
        let mut config = Config::default();
        assert_eq!(create_transform(&config).name(), "external");

        config.compression.combine_only = true;
        assert_eq!(create_transform(&config).name(), "verbatim");
    }
}
