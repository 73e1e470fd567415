//! Integration tests for the fs3 CLI
//!
//! The in-process tests always run. Tests against a running S3-compatible
//! server need the `integration` feature and an endpoint:
//!
//! ```bash
//! TEST_S3_ENDPOINT=http://localhost:4567 \
//! TEST_S3_ACCESS_KEY=key \
//! TEST_S3_SECRET_KEY=secret \
//!     cargo test --features integration
//! ```

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run fs3 with an isolated, empty config directory
fn run_fs3(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fs3"))
        .args(args)
        .env("FS3_CONFIG_DIR", config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute fs3 command")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn test_scenarios_json() {
    let config_dir = TempDir::new().unwrap();
    let output = run_fs3(&["scenarios", "--json"], config_dir.path());
    assert!(output.status.success());

    let entries = json_stdout(&output);
    let names: Vec<_> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("create_bucket"));
    assert!(names.contains(&"versioned_delete".to_string()));
    assert_eq!(names.len(), 9);
}

#[test]
fn test_scenarios_human() {
    let config_dir = TempDir::new().unwrap();
    let output = run_fs3(&["scenarios", "--portable"], config_dir.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("list_pagination"));
    assert!(!stdout.contains("versioned_delete"));
}

#[test]
fn test_check_memory_json() {
    let config_dir = TempDir::new().unwrap();
    let output = run_fs3(
        &["check", "--target", "memory", "--big-size", "300000", "--json"],
        config_dir.path(),
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = json_stdout(&output);
    assert_eq!(report["target"], "memory");
    assert_eq!(report["bucket"], "testbucket-plntr");
    assert_eq!(report["big_object_size"], 300000);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["scenarios"].as_array().unwrap().len(), 9);
}

#[test]
fn test_check_filesystem_only_listing() {
    let config_dir = TempDir::new().unwrap();
    let data_dir = TempDir::new().unwrap();
    let output = run_fs3(
        &[
            "check",
            "--target",
            "filesystem",
            "--data-dir",
            data_dir.path().to_str().unwrap(),
            "--only",
            "list_*",
            "--json",
        ],
        config_dir.path(),
    );
    assert!(output.status.success());

    let report = json_stdout(&output);
    let names: Vec<_> = report["scenarios"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["list_objects", "list_pagination"]);
}

#[test]
fn test_check_human_output() {
    let config_dir = TempDir::new().unwrap();
    let output = run_fs3(
        &[
            "check",
            "--only",
            "put_get_delete",
            "--no-color",
            "--no-progress",
        ],
        config_dir.path(),
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("put_get_delete"));
    assert!(stdout.contains("PASS"));
    assert!(stdout.contains("1/1 scenarios passed"));
}

#[test]
fn test_check_reads_config_file() {
    let config_dir = TempDir::new().unwrap();
    std::fs::write(
        config_dir.path().join("config.toml"),
        "schema_version = 1\n\n[suite]\nbucket = \"configured-bucket\"\n",
    )
    .unwrap();

    let output = run_fs3(
        &["check", "--only", "create_bucket", "--json"],
        config_dir.path(),
    );
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["bucket"], "configured-bucket");
}

#[test]
fn test_check_usage_errors() {
    let config_dir = TempDir::new().unwrap();

    let output = run_fs3(&["check", "--only", "nope"], config_dir.path());
    assert_eq!(output.status.code(), Some(2));

    let output = run_fs3(&["check", "--bucket", "UPPER"], config_dir.path());
    assert_eq!(output.status.code(), Some(2));

    let output = run_fs3(&["check", "--target", "filesystem"], config_dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_check_rejects_newer_config() {
    let config_dir = TempDir::new().unwrap();
    std::fs::write(config_dir.path().join("config.toml"), "schema_version = 99\n").unwrap();

    let output = run_fs3(&["check"], config_dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("newer"));
}

#[test]
fn test_completions_bash() {
    let config_dir = TempDir::new().unwrap();
    let output = run_fs3(&["completions", "bash"], config_dir.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("fs3"));
}

#[cfg(feature = "integration")]
mod remote {
    use super::*;

    /// Get S3 test configuration from environment
    fn get_test_config() -> Option<(String, String, String)> {
        let endpoint = std::env::var("TEST_S3_ENDPOINT").ok()?;
        let access_key = std::env::var("TEST_S3_ACCESS_KEY").ok()?;
        let secret_key = std::env::var("TEST_S3_SECRET_KEY").ok()?;
        Some((endpoint, access_key, secret_key))
    }

    /// Write a config pointing at the test endpoint
    fn setup_remote() -> Option<(TempDir, String)> {
        let (endpoint, access_key, secret_key) = get_test_config()?;
        let config_dir = TempDir::new().ok()?;
        let config = format!(
            "schema_version = 1\n\n[remote]\nendpoint = \"{endpoint}\"\naccess_key = \"{access_key}\"\nsecret_key = \"{secret_key}\"\n"
        );
        std::fs::write(config_dir.path().join("config.toml"), config).ok()?;
        let bucket = format!("fs3-test-{}", std::process::id());
        Some((config_dir, bucket))
    }

    #[test]
    fn test_remote_portable_suite() {
        let Some((config_dir, bucket)) = setup_remote() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let output = run_fs3(
            &[
                "check",
                "--target",
                "remote",
                "--bucket",
                &bucket,
                "--big-size",
                "12000000",
                "--json",
            ],
            config_dir.path(),
        );
        let report = json_stdout(&output);
        assert!(output.status.success(), "report: {report:#}");
        assert_eq!(report["target"], "remote");

        let names: Vec<_> = report["scenarios"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert!(!names.contains(&"versioned_delete"));
    }

    #[test]
    fn test_remote_unreachable_is_network_error() {
        let Some((config_dir, bucket)) = setup_remote() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let output = run_fs3(
            &[
                "check",
                "--target",
                "remote",
                "--endpoint",
                "http://127.0.0.1:9",
                "--bucket",
                &bucket,
            ],
            config_dir.path(),
        );
        assert_eq!(output.status.code(), Some(3));
    }
}
