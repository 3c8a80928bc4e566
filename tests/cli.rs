//! Headless command-line behaviour of `robackup`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Isolated profiles directory per test.
struct TestContext {
    root: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp directory for tests"),
        }
    }

    fn profiles_dir(&self) -> &Path {
        self.root.path()
    }

    fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("robackup").expect("binary is built");
        cmd.arg("--profiles-dir").arg(self.profiles_dir());
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn preview_prints_quoted_command_line() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--preview", "--source", "C:\\My Data", "--dest", "E:\\Backup"])
        .args(["-o", "/MIR", "-o", "/R=3", "-o", "/copy=dat"])
        .args(["--exclude-file", "*.tmp"])
        .assert()
        .success()
        .stdout("robocopy \"C:\\My Data\" \"E:\\Backup\" /L /MIR /R:3 /COPY:DAT /XF \"*.tmp\"\n");
}

#[test]
fn preview_without_simulation() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--preview", "--source", "a", "--dest", "b", "--simulate", "false"])
        .assert()
        .success()
        .stdout("robocopy \"a\" \"b\"\n");
}

#[test]
fn list_options_groups_by_section() {
    let ctx = TestContext::new();
    ctx.cli()
        .arg("--list-options")
        .assert()
        .success()
        .stdout(predicate::str::contains("Copy:"))
        .stdout(predicate::str::contains("/MIR"))
        .stdout(predicate::str::contains("(deletes files)"));
}

#[test]
fn list_presets_names_them() {
    let ctx = TestContext::new();
    ctx.cli()
        .arg("--list-presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror"));
}

#[test]
fn profile_save_list_show_delete() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--save-profile", "nightly", "--source", "C:\\src", "--dest", "D:\\dst"])
        .args(["--preset", "incremental"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved profile 'nightly'"));
    assert!(ctx.profiles_dir().join("nightly.json").exists());

    ctx.cli()
        .arg("--list-profiles")
        .assert()
        .success()
        .stdout("nightly\n");

    ctx.cli()
        .args(["--show-profile", "nightly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sourcePath\": \"C:\\\\src\""))
        .stdout(predicate::str::contains("\"simulationMode\": true"));

    ctx.cli()
        .args(["--preview", "--profile", "nightly", "--dest", "F:\\other"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("robocopy \"C:\\src\" \"F:\\other\" /L"));

    ctx.cli()
        .args(["--delete-profile", "nightly"])
        .assert()
        .success();
    ctx.cli()
        .arg("--list-profiles")
        .assert()
        .success()
        .stdout("");
    ctx.cli()
        .args(["--delete-profile", "nightly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn invalid_profile_name_is_rejected() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--save-profile", "a/b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid profile name"));
}

#[test]
fn unknown_option_fails() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--preview", "-o", "/NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown option '/NOPE'"));
}

#[test]
fn out_of_range_option_fails() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--preview", "-o", "/MT=1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 128"));
}

#[test]
fn run_without_paths_is_refused() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--text", "--executable", "definitely-not-installed-xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Select source and destination directories."));
}

#[test]
fn missing_executable_is_reported() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--text", "--executable", "definitely-not-installed-xyz"])
        .args(["--source", "a", "--dest", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not run definitely-not-installed-xyz"));
}

/// Upper bound for runs that must not hang on a shared stderr.
const RUN_TIMEOUT: Duration = Duration::from_secs(20);

#[test]
fn missing_executable_with_logging_does_not_hang() {
    let ctx = TestContext::new();
    ctx.cli()
        .env("RUST_LOG", "info")
        .timeout(RUN_TIMEOUT)
        .args(["--text", "--executable", "definitely-not-installed-xyz"])
        .args(["--source", "a", "--dest", "b"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("spawn failed"))
        .stderr(predicate::str::contains("could not run definitely-not-installed-xyz"));
}

#[test]
fn missing_executable_in_json_mode_reports_failed_event() {
    let ctx = TestContext::new();
    ctx.cli()
        .env("RUST_LOG", "info")
        .timeout(RUN_TIMEOUT)
        .args(["--json", "--executable", "definitely-not-installed-xyz"])
        .args(["--source", "a", "--dest", "b"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"event\":\"failed\""))
        .stderr(predicate::str::contains("could not run definitely-not-installed-xyz"));
}

#[cfg(unix)]
#[test]
fn text_mode_with_info_logging_completes() {
    let ctx = TestContext::new();
    ctx.cli()
        .env("RUST_LOG", "info")
        .timeout(RUN_TIMEOUT)
        .args(["--text", "--executable", "echo", "--source", "a", "--dest", "b"])
        .assert()
        .success()
        .stdout("a b /L\n")
        .stderr(predicate::str::contains("run started"))
        .stderr(predicate::str::contains("--- Finished with code 0:"));
}

#[cfg(unix)]
#[test]
fn text_mode_streams_output_and_exit_code() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--text", "--executable", "echo", "--source", "a b", "--dest", "c"])
        .assert()
        .success()
        .stdout("a b c /L\n")
        .stderr(predicate::str::contains("> Running: echo \"a b\" \"c\" /L"))
        .stderr(predicate::str::contains("--- Finished with code 0:"));
}

#[cfg(unix)]
#[test]
fn text_mode_exits_with_child_code() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["--text", "--executable", "false", "--source", "a", "--dest", "b"])
        .assert()
        .code(1);
}

#[cfg(unix)]
#[test]
fn json_mode_emits_one_event_per_line() {
    let ctx = TestContext::new();
    let out = ctx
        .cli()
        .args(["--json", "--executable", "echo", "--source", "a", "--dest", "b"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let events: Vec<serde_json::Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(kinds.first(), Some(&"info"));
    assert!(kinds.contains(&"started"));
    assert!(kinds.contains(&"output"));
    assert_eq!(kinds.last(), Some(&"completed"));
    assert_eq!(events.last().unwrap()["data"]["code"], 0);
}
