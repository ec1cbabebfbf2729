//! Drives the actual `uppm` binary against an isolated `$UPPM_CONFIG_DIR`
//! and a filesystem repository fixture, the way a user would from a shell.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn uppm_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("uppm").unwrap();
    cmd.env("UPPM_CONFIG_DIR", config_dir.path());
    cmd
}

fn write_package(repo_root: &std::path::Path, author: &str, name: &str, version: &str) {
    let dir = repo_root.join(author).join(name);
    fs::create_dir_all(&dir).unwrap();
    let body = format!("/*\nuppm 0.0.1\n{{\n  name: {name}\n  version: {version}\n  targetApp: studio\n  license: MIT\n}}\n*/\nprint(\"{name}\")\n");
    fs::write(dir.join(format!("{version}.csup")), body).unwrap();
}

#[test]
fn init_then_target_apps_and_repositories_round_trip() {
    let config_dir = TempDir::new().unwrap();

    uppm_cmd(&config_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    uppm_cmd(&config_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let app_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    write_package(repo_dir.path(), "acme", "widget", "1.0");
    let repo_url = repo_dir.path().to_string_lossy().to_string();

    uppm_cmd(&config_dir)
        .args(["target-apps", "add", "studio", app_dir.path().to_str().unwrap(), &repo_url])
        .assert()
        .success();

    uppm_cmd(&config_dir)
        .args(["target-apps", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("studio"));

    uppm_cmd(&config_dir)
        .args(["repositories", "add", &repo_url])
        .assert()
        .success();

    uppm_cmd(&config_dir)
        .args(["repositories", "refresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 package(s) cataloged"));

    uppm_cmd(&config_dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no packages installed"));
}

#[test]
fn resolve_prints_the_flattened_dependency_tree() {
    let config_dir = TempDir::new().unwrap();
    let app_dir = TempDir::new().unwrap();
    fs::create_dir_all(app_dir.path()).unwrap();
    let repo_dir = TempDir::new().unwrap();
    write_package(repo_dir.path(), "acme", "widget", "1.0");
    let repo_url = repo_dir.path().to_string_lossy().to_string();

    uppm_cmd(&config_dir).arg("init").assert().success();
    uppm_cmd(&config_dir)
        .args(["target-apps", "add", "studio", app_dir.path().to_str().unwrap(), &repo_url])
        .assert()
        .success();

    uppm_cmd(&config_dir)
        .args(["resolve", &format!("widget@{repo_url}"), "--unattended"])
        .assert()
        .success()
        .stdout(predicate::str::contains("widget 1.0"));
}

#[test]
fn doctor_reports_a_missing_app_folder() {
    let config_dir = TempDir::new().unwrap();
    let missing_app_dir = TempDir::new().unwrap().path().join("does-not-exist");

    uppm_cmd(&config_dir).arg("init").assert().success();
    uppm_cmd(&config_dir)
        .args(["target-apps", "add", "studio", missing_app_dir.to_str().unwrap(), "https://example.com/repo.git"])
        .assert()
        .success();

    uppm_cmd(&config_dir)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("does not exist"));
}
