//! Integration tests for pkgpress

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn pkgpress() -> Command {
        let mut cmd = cargo_bin_cmd!("pkgpress");
        cmd.env_remove("PKGPRESS_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        pkgpress()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("asset packages"));
    }

    #[test]
    fn version_displays() {
        pkgpress()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgpress"));
    }

    #[test]
    fn unknown_command_fails() {
        pkgpress().arg("compress").assert().failure();
    }
}

mod package_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[paths]
runtime_dir = "runtime"
source_root = "www"
publish_dir = "www/assets"
publish_url = "/assets"

[compression]
combine_only = true

[packages.jquery]
js = ["/js/jquery.js"]

[packages.app]
js = ["/js/app.js", "https://cdn.example.com/lib.js"]
css = ["/css/app.css"]
depends = ["jquery"]
media = "screen"

[packages.broken]
js = ["/js/missing.js"]
"#;

    /// A project directory with sources and a config file
    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let www = dir.path().join("www");
            fs::create_dir_all(www.join("js")).unwrap();
            fs::create_dir_all(www.join("css")).unwrap();
            fs::write(www.join("js/jquery.js"), "var $ = {}").unwrap();
            fs::write(www.join("js/app.js"), "$.app = 1").unwrap();
            fs::write(www.join("css/app.css"), "body { margin: 0 }").unwrap();
            fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
            Self { dir }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pkgpress");
            cmd.env_remove("PKGPRESS_CONFIG")
                .current_dir(self.dir.path())
                .arg("--no-local")
                .arg("--config")
                .arg(self.dir.path().join("config.toml"));
            cmd
        }

        fn published(&self) -> Vec<PathBuf> {
            let assets = self.dir.path().join("www/assets");
            if !assets.exists() {
                return Vec::new();
            }
            fs::read_dir(assets)
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect()
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    #[test]
    fn info_unknown_key_fails() {
        let project = Project::new();
        project
            .cmd()
            .args(["info", "app"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No build data for package"));
    }

    #[test]
    fn build_info_reset_cycle() {
        let project = Project::new();

        project
            .cmd()
            .args(["build", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Built app"));

        let published = project.published();
        assert_eq!(published.len(), 2);
        let js = published
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "js"))
            .unwrap();
        assert_eq!(fs::read_to_string(js).unwrap(), "var $ = {};\n$.app = 1;\n");

        project
            .cmd()
            .args(["info", "app", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("js_pkg_app_"))
            .stdout(predicate::str::contains("https://cdn.example.com/lib.js"))
            .stdout(predicate::str::contains("jquery"))
            .stdout(predicate::str::contains("screen"));

        project
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("app\n");

        project
            .cmd()
            .args(["reset", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed build of app"));
        assert!(project.published().is_empty());

        project
            .cmd()
            .args(["reset", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do."));

        project.cmd().args(["info", "app"]).assert().failure();
    }

    #[test]
    fn deleted_artifact_is_forgotten() {
        let project = Project::new();
        project.cmd().args(["build", "app"]).assert().success();

        for path in project.published() {
            fs::remove_file(path).unwrap();
        }

        project
            .cmd()
            .args(["info", "app"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No build data for package"));
    }

    #[test]
    fn build_all_then_reset_all() {
        let project = Project::new();

        // `broken` references a missing file and aborts the run
        project
            .cmd()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing.js"));

        // Packages are built in name order, so `app` made it
        project
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"app\""));

        project
            .cmd()
            .args(["reset", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed all builds"));

        project
            .cmd()
            .args(["reset", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to do."));
    }

    #[test]
    fn build_unknown_package_fails() {
        let project = Project::new();
        project
            .cmd()
            .args(["build", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Package not configured"));
    }

    #[test]
    fn reserved_key_rejected() {
        let project = Project::new();
        project
            .cmd()
            .args(["build", "_pkgpress"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reserved"));
    }

    #[test]
    fn local_config_is_discovered() {
        let project = Project::new();
        fs::copy(
            project.path().join("config.toml"),
            project.path().join("pkgpress.toml"),
        )
        .unwrap();
        let nested = project.path().join("www").join("js");

        let mut cmd = cargo_bin_cmd!("pkgpress");
        cmd.env_remove("PKGPRESS_CONFIG")
            .current_dir(&nested)
            .args(["build", "jquery"])
            .assert()
            .success();

        assert!(project.path().join("runtime").join("packages.json").is_file());
    }

    #[test]
    fn list_empty() {
        let project = Project::new();
        project
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No built packages"));
    }
}
