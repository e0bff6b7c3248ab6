//! Integration tests for the gasread CLI
//!
//! Tests command-line interface functionality including:
//! - Scanning images with the mock engine
//! - Text extraction from files and stdin
//! - Listing the pattern bank
//! - Exit codes for unreadable input

use anyhow::Result;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{tempdir, TempDir};

/// Test helper to get the CLI binary path
fn get_cli_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    if path.ends_with("deps") {
        path.pop(); // Remove "deps" directory
    }
    path.push("gasread");
    #[cfg(windows)]
    path.set_extension("exe");
    path
}

/// Test helper to create a temporary directory
fn setup_temp_dir() -> TempDir {
    tempdir().expect("Failed to create temp directory")
}

/// Test helper to run CLI command and return output
fn run_cli_command(args: &[&str]) -> Result<std::process::Output> {
    let output = Command::new(get_cli_path()).args(args).output()?;
    Ok(output)
}

/// Test helper to write a small printout-like PNG
fn write_printout(dir: &Path, name: &str) -> PathBuf {
    let image = GrayImage::from_fn(200, 120, |x, y| {
        if y % 20 < 3 && (12..188).contains(&x) {
            Luma([20])
        } else {
            Luma([240])
        }
    });
    let path = dir.join(name);
    DynamicImage::ImageLuma8(image)
        .save_with_format(&path, ImageFormat::Png)
        .expect("Failed to write PNG");
    path
}

#[test]
fn test_cli_scan_with_mock_engine() {
    let temp_dir = setup_temp_dir();
    let image = write_printout(temp_dir.path(), "printout.png");

    let output = run_cli_command(&["scan", image.to_str().unwrap(), "--engine", "mock", "--fast"])
        .expect("CLI command should run");

    assert!(output.status.success(), "Scan should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mock OCR"));
    assert!(stdout.contains("pH"));
    assert!(stdout.contains("7.4"));
    assert!(stdout.contains("Good"));
}

#[test]
fn test_cli_scan_json_output() {
    let temp_dir = setup_temp_dir();
    let image = write_printout(temp_dir.path(), "printout.png");

    let output = run_cli_command(&["scan", image.to_str().unwrap(), "--engine", "mock", "--json"])
        .expect("CLI command should run");

    assert!(output.status.success());
    let record: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(record["success"], serde_json::json!(true));
    assert_eq!(record["key_metrics"]["HCO3"], serde_json::json!(24.0));
    assert_eq!(record["quality"]["quality"], serde_json::json!("good"));
    assert_eq!(record["variant"], serde_json::json!("simple"));
}

#[test]
fn test_cli_scan_empty_file_fails() {
    let temp_dir = setup_temp_dir();
    let image = temp_dir.path().join("empty.png");
    fs::write(&image, b"").unwrap();

    let output = run_cli_command(&["scan", image.to_str().unwrap(), "--engine", "mock"])
        .expect("CLI command should run");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Could not read image"));
}

#[test]
fn test_cli_scan_missing_file() {
    let output = run_cli_command(&["scan", "/nonexistent/printout.png", "--engine", "mock"])
        .expect("CLI command should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"));
}

#[test]
fn test_cli_scan_bad_config() {
    let temp_dir = setup_temp_dir();
    let image = write_printout(temp_dir.path(), "printout.png");
    let config = temp_dir.path().join("config.json");
    fs::write(&config, r#"{"workers": 0}"#).unwrap();

    let output = run_cli_command(&[
        "scan",
        image.to_str().unwrap(),
        "--engine",
        "mock",
        "--config",
        config.to_str().unwrap(),
    ])
    .expect("CLI command should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load config"));
}

#[test]
fn test_cli_extract_from_file() {
    let temp_dir = setup_temp_dir();
    let text = temp_dir.path().join("printout.txt");
    fs::write(&text, "pH(T) 7.318\npCcO(T) 25.9\nNa 999\n").unwrap();

    let output = run_cli_command(&["extract", text.to_str().unwrap(), "--json"])
        .expect("CLI command should run");

    assert!(output.status.success());
    let metrics: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metrics, serde_json::json!({"pCO2": 25.9, "pH": 7.318}));
}

#[test]
fn test_cli_extract_from_stdin() {
    let mut child = Command::new(get_cli_path())
        .args(["extract", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("CLI should start");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"cK+ 4.2 mmol/L\ncCl- 104 mmol/L\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<Vec<&str>> = stdout
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(rows, vec![vec!["K", "4.2"], vec!["Cl", "104"]]);
}

#[test]
fn test_cli_extract_nothing_found() {
    let temp_dir = setup_temp_dir();
    let text = temp_dir.path().join("blank.txt");
    fs::write(&text, "patient name\nward 4\n").unwrap();

    let output = run_cli_command(&["extract", text.to_str().unwrap()]).unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No metrics found"));
}

#[test]
fn test_cli_patterns_listing() {
    let output = run_cli_command(&["patterns", "--json"]).expect("CLI command should run");
    assert!(output.status.success());

    let bank: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = bank
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 20);
    assert_eq!(&names[..3], &["pH", "pCO2", "pO2"]);
    assert_eq!(bank[0]["range"], serde_json::json!([6.5, 8.0]));
}

#[test]
fn test_cli_help() {
    let output = run_cli_command(&["--help"]).unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["scan", "extract", "patterns"] {
        assert!(stdout.contains(command), "help should list {command}");
    }
}
