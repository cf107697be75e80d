// End-to-end tests for the passdmenu binary.
#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};

fn passdmenu() -> Command {
    let mut cmd = Command::cargo_bin("passdmenu").unwrap();
    cmd.env_remove("PASSWORD_STORE_DIR")
        .env_remove("PASSDMENU_GPG")
        .env("NO_COLOR", "1");
    cmd
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn test_generate_uses_charset_and_length() {
    passdmenu()
        .args(["generate", "--charset", "a-c", "--length", "12"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[a-c]{12}\n$").unwrap());
}

#[test]
fn test_generate_default_length() {
    passdmenu()
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[!-~]{10}\n$").unwrap());
}

#[test]
fn test_generate_rejects_reversed_range() {
    passdmenu()
        .args(["generate", "--charset", "z-a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid character set"));
}

// ============================================================================
// list
// ============================================================================

fn listed_store() -> tempfile::TempDir {
    let dir = new_store_dir();
    write_entry(dir.path().join("Bank.gpg"), "pw1\nusername:carl\n");
    write_entry(dir.path().join("Email/alice.gpg"), "pw-alice\n");
    write_entry(dir.path().join("Email/bob.gpg"), "pw-bob\n");
    dir
}

#[test]
fn test_list_text() {
    let dir = listed_store();
    passdmenu()
        .arg("list")
        .arg("--store-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Bank"))
        .stdout(predicate::str::contains("Email"))
        .stdout(predicate::str::contains("  alice"))
        .stdout(predicate::str::contains("  bob"));
}

#[test]
fn test_list_json_from_env() {
    let dir = listed_store();
    let output = passdmenu()
        .args(["list", "--output", "json"])
        .env("PASSWORD_STORE_DIR", dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let services = json["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[1]["service"], "Email");
    assert_eq!(services[1]["entries"][0]["username"], "alice");
    assert!(!String::from_utf8_lossy(&output).contains("pw-alice"));
}

#[test]
fn test_list_empty_store() {
    let dir = new_store_dir();
    passdmenu()
        .arg("list")
        .arg("--store-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No entries found"));
}

#[test]
fn test_list_missing_store() {
    let dir = tempfile::tempdir().unwrap();
    passdmenu()
        .arg("list")
        .arg("--store-dir")
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password store not found"));
}

// ============================================================================
// insert, with a stand-in gpg that passes data through unchanged
// ============================================================================

const FAKE_GPG: &str = r#"#!/bin/sh
echo "$*" >> "$0.log"
for arg in "$@"; do
  case "$arg" in
    --version) echo "gpg (GnuPG) 2.4.0"; exit 0 ;;
    --list-keys)
      echo "pub:u:255:22:BBBB2222BBBB2222:1700000000:::u:::scESC:::+:::ed25519:::0:"
      echo "fpr:::::::::1111111111111111BBBB2222BBBB2222:"
      echo "uid:u::::1700000000::HASH::Me <me@example.com>::::::::::0:"
      exit 0 ;;
    --encrypt|--decrypt) cat; exit 0 ;;
  esac
done
echo "unsupported invocation" >&2
exit 2
"#;

#[cfg(unix)]
fn install_fake_gpg(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-gpg");
    fs::write(&path, FAKE_GPG).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
#[serial]
fn test_insert_then_migrate() {
    let store = new_store_dir();
    let bin = tempfile::tempdir().unwrap();
    let gpg = install_fake_gpg(bin.path());

    passdmenu()
        .args(["--no-notify", "insert", "Bank", "carl", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .arg("--gpg")
        .arg(&gpg)
        .write_stdin("pw1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert_eq!(
        fs::read_to_string(store.path().join("Bank.gpg")).unwrap(),
        "pw1\nusername:carl\n"
    );

    passdmenu()
        .args(["--no-notify", "insert", "Bank", "dave", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .env("PASSDMENU_GPG", &gpg)
        .write_stdin("pw2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved existing entry"));

    assert!(!store.path().join("Bank.gpg").exists());
    assert_eq!(
        fs::read_to_string(store.path().join("Bank/carl.gpg")).unwrap(),
        "pw1\nusername:carl\n"
    );
    assert_eq!(
        fs::read_to_string(store.path().join("Bank/dave.gpg")).unwrap(),
        "pw2\nusername:dave\n"
    );
}

#[cfg(unix)]
fn gpg_invocations(gpg: &Path) -> Vec<String> {
    let log = fs::read_to_string(gpg.with_extension("log")).unwrap();
    log.lines().map(str::to_string).collect()
}

#[cfg(unix)]
#[test]
#[serial]
fn test_insert_encrypts_to_store_recipient_only() {
    let store = new_store_dir();
    let bin = tempfile::tempdir().unwrap();
    let gpg = install_fake_gpg(bin.path());

    passdmenu()
        .args(["--no-notify", "insert", "Bank", "carl", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .arg("--gpg")
        .arg(&gpg)
        .write_stdin("pw1\n")
        .assert()
        .success();

    let calls = gpg_invocations(&gpg);
    let encrypt = calls
        .iter()
        .find(|call| call.ends_with("--encrypt"))
        .expect("gpg was never asked to encrypt");
    let args: Vec<&str> = encrypt.split(' ').collect();
    assert!(args.contains(&"--batch"));
    assert!(args.contains(&"--no-encrypt-to"));
    assert!(args.contains(&"--trust-model"));
    assert!(args
        .windows(2)
        .any(|w| w == ["--compress-algo", "none"]));
    assert!(args
        .windows(2)
        .any(|w| w == ["--recipient", "1111111111111111BBBB2222BBBB2222"]));
    assert_eq!(args.iter().filter(|a| **a == "--recipient").count(), 1);
    assert!(!args.contains(&"pw1"));
}

#[cfg(unix)]
#[test]
#[serial]
fn test_insert_generated_password_is_printed() {
    let store = new_store_dir();
    let bin = tempfile::tempdir().unwrap();
    let gpg = install_fake_gpg(bin.path());

    let output = passdmenu()
        .args(["--no-notify", "insert", "Shop", "erin", "--generate"])
        .arg("--store-dir")
        .arg(store.path())
        .arg("--gpg")
        .arg(&gpg)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let password = stdout.lines().last().unwrap();
    assert_eq!(password.chars().count(), 10);
    assert_eq!(
        fs::read_to_string(store.path().join("Shop.gpg")).unwrap(),
        format!("{password}\nusername:erin\n")
    );
}

#[test]
fn test_insert_without_gpg_id() {
    let store = tempfile::tempdir().unwrap();
    passdmenu()
        .args(["--no-notify", "insert", "Bank", "carl", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .write_stdin("pw1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recipient configured"));
}

#[test]
fn test_insert_missing_gpg_binary() {
    let store = new_store_dir();
    passdmenu()
        .args(["--no-notify", "insert", "Bank", "carl", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .args(["--gpg", "/nonexistent/passdmenu-gpg"])
        .write_stdin("pw1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Encryption backend unavailable"));
}

#[test]
fn test_insert_rejects_bad_name() {
    let store = new_store_dir();
    passdmenu()
        .args(["--no-notify", "insert", "../Bank", "carl", "--stdin"])
        .arg("--store-dir")
        .arg(store.path())
        .write_stdin("pw1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid service or user name"));
}
