#![allow(deprecated)] // TODO: move from cargo_bin to cargo_bin_cmd!

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const STACK: &str = r#"
networks:
  default:
    cidr: 10.0.0.0/24
nodes:
  web:
    image: trusty
    flavor: small
    disk: 10
    networks:
      - network: default
  db:
    image: xenial
    flavor: large
    disk: 20
    networks:
      - network: default
"#;

const CONFIG: &str = r#"
default:
  - shell:
      cmd: echo hello
"#;

fn overcast() -> Command {
    let mut cmd = Command::cargo_bin("overcast").unwrap();
    for var in [
        "OS_USERNAME",
        "OS_PASSWORD",
        "OS_AUTH_URL",
        "OS_TENANT_NAME",
        "OS_REGION_NAME",
        "OVERCAST_SUFFIX",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

/// Help lists every subcommand
#[test]
fn test_cli_help() {
    overcast()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list-refs"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn test_deploy_help() {
    overcast()
        .arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cfg"))
        .stdout(predicate::str::contains("--retry-count"))
        .stdout(predicate::str::contains("--incremental"))
        .stdout(predicate::str::contains("OVERCAST_SUFFIX"));
}

#[test]
fn test_list_refs() {
    let dir = project(&[("stack.yaml", STACK)]);
    overcast()
        .current_dir(dir.path())
        .arg("list-refs")
        .arg("stack.yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Images:\n  trusty  xenial"))
        .stdout(predicate::str::contains("Flavors:\n  large  small"));
}

#[test]
fn test_list_refs_template() {
    let dir = project(&[("stack.yaml", STACK)]);
    overcast()
        .current_dir(dir.path())
        .arg("list-refs")
        .arg("--tmpl")
        .arg("stack.yaml")
        .assert()
        .success()
        .stdout(predicate::str::contains("[images]\ntrusty = <missing value>"))
        .stdout(predicate::str::contains("[flavors]\nlarge = <missing value>"));
}

#[test]
fn test_list_refs_missing_stack() {
    let dir = project(&[]);
    overcast()
        .current_dir(dir.path())
        .arg("list-refs")
        .arg("nope.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn test_deploy_unknown_deployment() {
    let dir = project(&[(".overcast.yaml", CONFIG)]);
    overcast()
        .current_dir(dir.path())
        .arg("deploy")
        .arg("staging")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'staging' not found"))
        .stderr(predicate::str::contains("default"));
}

#[test]
fn test_deploy_without_credentials() {
    let dir = project(&[(".overcast.yaml", CONFIG)]);
    overcast()
        .current_dir(dir.path())
        .arg("deploy")
        .arg("default")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OS_USERNAME"));
}

#[test]
fn test_cleanup_empty_log() {
    let dir = project(&[("cleanup.log", "\n")]);
    overcast()
        .current_dir(dir.path())
        .arg("cleanup")
        .arg("cleanup.log")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean up"));
}

#[test]
fn test_cleanup_malformed_log() {
    let dir = project(&[("cleanup.log", "server: abc\nrouter: r-1\n")]);
    overcast()
        .current_dir(dir.path())
        .arg("cleanup")
        .arg("cleanup.log")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_cleanup_without_credentials() {
    let dir = project(&[("cleanup.log", "network: n-1\nsubnet: s-1\n")]);
    overcast()
        .current_dir(dir.path())
        .arg("cleanup")
        .arg("cleanup.log")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OS_USERNAME"));
}
