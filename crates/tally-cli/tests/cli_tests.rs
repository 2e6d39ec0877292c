//! End-to-end tests of the tally binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// A tally command isolated from the caller's environment and any tally.toml
fn tally_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("TALLY_DEFER_DELAY_MS")
        .env_remove("TALLY_FILTER")
        .env_remove("TALLY_OUTPUT_FORMAT")
        .env_remove("TALLY_LOG")
        .env_remove("RUST_LOG");
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_shows_all_commands() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("list"))
            .stdout(predicate::str::contains("repl"))
            .stdout(predicate::str::contains("completions"))
            .stdout(predicate::str::contains("EXAMPLES"))
            .stdout(predicate::str::contains("TALLY_DEFER_DELAY_MS"));
    }

    #[test]
    fn test_version_flag() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tally"));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir).arg("explode").assert().failure();
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// RUN
// ══════════════════════════════════════════════════════════════════════════════

mod run_command {
    use super::*;

    #[test]
    fn test_runtime_namespace_passes() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Running test #1: sync_report"))
            .stdout(predicate::str::contains("Test #1 PASSED"))
            .stdout(predicate::str::contains("PASSED: handoff_read"))
            .stdout(predicate::str::contains("Total 6/6 tests passed."));
    }

    #[test]
    fn test_demo_namespace_fails_with_exit_code() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["run", "demo"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Test #2 FAILED"))
            .stdout(predicate::str::contains("FAILED: reports_nothing"))
            .stdout(predicate::str::contains("Total 1/3 tests passed."));
    }

    #[test]
    fn test_results_follow_registration_order() {
        let dir = TempDir::new().unwrap();
        let output = tally_cmd(&dir).args(["run", "demo"]).output().unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();

        let first = stdout.find("PASSED: always_passes").unwrap();
        let second = stdout.find("FAILED: always_fails").unwrap();
        let third = stdout.find("FAILED: reports_nothing").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_filter_selects_tests() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["r", "demo", "passes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("always_passes"))
            .stdout(predicate::str::contains("always_fails").not())
            .stdout(predicate::str::contains("Total 1/1 tests passed."));
    }

    #[test]
    fn test_filter_matching_nothing_prints_empty_summary() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["run", "demo", "nothing_matches_this"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total 0/0 tests passed."));
    }

    #[test]
    fn test_unknown_namespace_is_an_error() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["run", "nowhere"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown namespace 'nowhere'"));
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        let output = tally_cmd(&dir)
            .args(["run", "demo", "--json"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["namespace"], "demo");
        assert_eq!(report["tests"], 3);
        assert_eq!(report["passed"], 1);
        assert_eq!(report["failed"], 2);
        assert_eq!(report["results"][2]["name"], "reports_nothing");
        assert_eq!(report["results"][2]["passed"], false);
    }

    #[test]
    fn test_delay_flag() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["run", "demo", "passes", "--delay", "20"])
            .assert()
            .success();
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ══════════════════════════════════════════════════════════════════════════════

mod configuration {
    use super::*;

    #[test]
    fn test_config_default_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tally.toml"),
            "[runner]\ndefault_filter = \"sync\"\n",
        )
        .unwrap();

        tally_cmd(&dir)
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Total 1/1 tests passed."));
    }

    #[test]
    fn test_flag_filter_beats_config_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tally.toml"),
            "[runner]\ndefault_filter = \"sync\"\n",
        )
        .unwrap();

        tally_cmd(&dir)
            .args(["run", "runtime", "handoff"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total 2/2 tests passed."));
    }

    #[test]
    fn test_env_output_format() {
        let dir = TempDir::new().unwrap();
        let output = tally_cmd(&dir)
            .args(["run", "demo", "passes"])
            .env("TALLY_OUTPUT_FORMAT", "json")
            .output()
            .unwrap();

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["passed"], 1);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tally.toml"), "[runner]\nbogus = 1\n").unwrap();

        tally_cmd(&dir)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to load tally.toml"));
    }

    #[test]
    fn test_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[[commands]]\nname = \"quick\"\nnamespace = \"demo\"\n",
        )
        .unwrap();

        tally_cmd(&dir)
            .arg("list")
            .arg("--config")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("quick -> demo"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// LIST AND COMPLETIONS
// ══════════════════════════════════════════════════════════════════════════════

mod other_commands {
    use super::*;

    #[test]
    fn test_list_shows_namespaces_and_commands() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("runtime (6 tests)"))
            .stdout(predicate::str::contains("demo (3 tests)"))
            .stdout(predicate::str::contains("selftest -> runtime"));
    }

    #[test]
    fn test_completions_bash() {
        let dir = TempDir::new().unwrap();
        tally_cmd(&dir)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tally"));
    }
}
