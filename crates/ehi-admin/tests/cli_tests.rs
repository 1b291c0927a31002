//! Tests for the `ehi` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn ehi() -> Command {
    let mut cmd = Command::cargo_bin("ehi").unwrap();
    for var in [
        "EHI_CONFIG",
        "EHI_ASSETS",
        "EHI_ASSETS_URL",
        "EHI_MOUNT",
        "EHI_SEED",
        "EHI_LATENCY_MS",
        "EHI_PAGE_SIZE",
        "EHI_LOG_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_routes_lists_pages() {
    ehi()
        .arg("routes")
        .assert()
        .success()
        .stdout(predicate::str::contains("/ehi/dashboard"))
        .stdout(predicate::str::contains("dashboard.initDashboard"))
        .stdout(predicate::str::contains("(no stylesheet)"));
}

#[test]
fn test_routes_follow_mount() {
    ehi()
        .args(["--mount", "/centre", "routes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/centre/donors"))
        .stdout(predicate::str::contains("/ehi/").not());
}

#[test]
fn test_check_renders_every_route() {
    ehi()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok:"));
}

#[test]
fn test_run_script() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(script, "# donors, second page").unwrap();
    writeln!(script, "go /donors").unwrap();
    writeln!(script, "press page:2 @donors-pager").unwrap();
    writeln!(script, "view").unwrap();

    ehi()
        .arg("run")
        .arg(script.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("at /ehi/donors"))
        .stdout(predicate::str::contains("== Donor Data | Ehi Centre =="))
        .stdout(predicate::str::contains("[donors-table]"));
}

#[test]
fn test_run_script_stops_at_bad_line() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(script, "go /users").unwrap();
    writeln!(script, "launch rockets").unwrap();
    writeln!(script, "go /donors").unwrap();

    ehi()
        .arg("run")
        .arg(script.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("at /ehi/users"))
        .stdout(predicate::str::contains("at /ehi/donors").not())
        .stderr(predicate::str::contains(":2: launch rockets"));
}

#[test]
fn test_exported_assets_serve_the_dashboard() {
    let dir = TempDir::new().unwrap();
    ehi()
        .arg("export-assets")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
    assert!(dir.path().join("templates/donors.html").is_file());

    ehi()
        .arg("--assets")
        .arg(dir.path())
        .arg("check")
        .assert()
        .success();
}

#[test]
fn test_missing_assets_dir_fails() {
    let dir = TempDir::new().unwrap();
    ehi()
        .arg("--assets")
        .arg(dir.path().join("absent"))
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_fails() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "page_size = 7").unwrap();

    ehi()
        .arg("--config")
        .arg(config.path())
        .arg("routes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_size"));
}

#[test]
fn test_shell_reads_stdin() {
    ehi()
        .write_stdin("go /archive\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("== Dashboard | Ehi Centre =="))
        .stdout(predicate::str::contains("at /ehi/archive"));
}
