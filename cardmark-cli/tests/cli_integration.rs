//! CLI integration tests for cardmark-cli.
//!
//! These tests run the actual binary and check outputs, exit codes, and
//! the card files it writes.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{DynamicImage, ImageBuffer, Rgb};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the cardmark binary.
fn cardmark() -> Command {
    Command::cargo_bin("cardmark").unwrap()
}

/// Write a small PNG photo into `dir` and return its path.
fn write_photo(dir: &Path, name: &str) -> PathBuf {
    let img = ImageBuffer::from_fn(200, 150, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();

    let path = dir.join(name);
    fs::write(&path, buf.into_inner()).unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    cardmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("membership cards"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_version_displays_version() {
    cardmark()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cardmark"));
}

#[test]
fn test_help_shows_exit_codes() {
    cardmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_register_help_shows_options() {
    cardmark()
        .args(["register", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--subject"))
        .stdout(predicate::str::contains("--holder"))
        .stdout(predicate::str::contains("--ledger-url"))
        .stdout(predicate::str::contains("--out"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_image_returns_input_error() {
    cardmark()
        .args(["register", "/nonexistent/photo.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read image"));
}

#[test]
fn test_missing_card_returns_input_error() {
    cardmark()
        .args(["verify", "/nonexistent/card.jpg"])
        .assert()
        .code(66);
}

#[test]
fn test_undecodable_image_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("bogus.png");
    fs::write(&bogus, b"not an image at all").unwrap();

    cardmark()
        .args(["register", bogus.to_str().unwrap(), "--subject", "42"])
        .assert()
        .code(65);
}

#[test]
fn test_blank_subject_returns_usage_error() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");

    cardmark()
        .args(["register", photo.to_str().unwrap(), "--subject", "  "])
        .assert()
        .code(64);
}

// ============================================================================
// Register / Verify Workflow Tests
// ============================================================================

#[test]
fn test_register_creates_card_file() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "alice.png");

    cardmark()
        .args(["register", photo.to_str().unwrap(), "--subject", "1700000000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Membership card issued"))
        .stdout(predicate::str::contains("skipped"));

    let card = temp.path().join("alice.card.jpg");
    assert!(card.exists(), "card file should be created");
    assert_eq!(&fs::read(&card).unwrap()[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_register_verify_roundtrip() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");
    let card = temp.path().join("member.jpg");

    cardmark()
        .args([
            "register",
            photo.to_str().unwrap(),
            "--subject",
            "1700000000000",
            "--out",
            card.to_str().unwrap(),
        ])
        .assert()
        .success();

    cardmark()
        .args(["--color", "never", "verify", card.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"))
        .stdout(predicate::str::contains("1700000000000"));
}

#[test]
fn test_plain_photo_is_invalid_card() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "plain.png");

    cardmark()
        .args(["--color", "never", "verify", photo.to_str().unwrap()])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("INVALID"));
}

#[test]
fn test_require_ownership_without_ledger_fails() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");
    let card = temp.path().join("card.jpg");

    cardmark()
        .args([
            "register",
            photo.to_str().unwrap(),
            "--out",
            card.to_str().unwrap(),
        ])
        .assert()
        .success();

    cardmark()
        .args([
            "verify",
            card.to_str().unwrap(),
            "--holder",
            "0x1111111111111111111111111111111111111111",
            "--require-ownership",
        ])
        .assert()
        .code(65);
}

#[test]
fn test_unreachable_ledger_still_issues_card() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");
    let card = temp.path().join("card.jpg");

    cardmark()
        .args([
            "register",
            photo.to_str().unwrap(),
            "--holder",
            "0x1111111111111111111111111111111111111111",
            "--ledger-url",
            "http://127.0.0.1:9",
            "--ledger-timeout",
            "2",
            "--out",
            card.to_str().unwrap(),
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"failed\""));

    assert!(card.exists());

    cardmark()
        .args([
            "verify",
            card.to_str().unwrap(),
            "--holder",
            "0x1111111111111111111111111111111111111111",
            "--ledger-url",
            "http://127.0.0.1:9",
            "--ledger-timeout",
            "2",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"))
        .stdout(predicate::str::contains("\"ownershipVerified\": false"));
}

#[test]
fn test_register_json_output() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");

    let output = cardmark()
        .args([
            "register",
            photo.to_str().unwrap(),
            "--subject",
            "member-7",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["userId"], "member-7");
    assert_eq!(json["hashPrefix"].as_str().unwrap().len(), 16);
    assert_eq!(json["anchor"]["status"], "skipped");
}

#[test]
fn test_inspect_shows_payload() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");
    let card = temp.path().join("card.jpg");

    cardmark()
        .args([
            "register",
            photo.to_str().unwrap(),
            "--subject",
            "1700000000000",
            "--out",
            card.to_str().unwrap(),
        ])
        .assert()
        .success();

    cardmark()
        .args(["--quiet", "inspect", card.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "VERIFY_DATA:{\"userId\":\"1700000000000\",\"timestamp\":",
        ));
}

#[test]
fn test_inspect_plain_photo_fails() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "plain.png");

    cardmark()
        .args(["inspect", photo.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("No card metadata"));
}

#[test]
fn test_quiet_mode_minimal_output() {
    let temp = TempDir::new().unwrap();
    let photo = write_photo(temp.path(), "photo.png");

    cardmark()
        .args(["--quiet", "register", photo.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
