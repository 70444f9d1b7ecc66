//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Nothing listens on the discard port in test environments
const UNREACHABLE_API: &str = "http://127.0.0.1:9";

fn churn(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_churn"))
        .args(args)
        .env("HOME", home)
        .env_remove("CHURN_API_URL")
        .output()
        .expect("Failed to execute command")
}

fn write_artifacts(dir: &Path) {
    std::fs::write(
        dir.join("forest.json"),
        r#"{"classes": ["No", "Yes"], "n_features": 3, "feature_importances": [0.5, 0.2, 0.3],
            "trees": [{"nodes": [
                {"feature": 2, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [0.8, 0.2]},
                {"value": [0.3, 0.7]}
            ]}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("columns.json"),
        r#"["tenure", "MonthlyCharges", "Contract_Month-to-month"]"#,
    )
    .unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = churn(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("churn prediction service"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("schema"), "Should show schema command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = churn(home.path(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("churn"), "Should show binary name");
}

/// Test predict subcommand help lists the form flags
#[test]
fn test_predict_help() {
    let home = TempDir::new().unwrap();
    let output = churn(home.path(), &["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    for flag in [
        "--file",
        "--tenure",
        "--contract",
        "--monthly-charges",
        "--total-charges",
        "--streaming-movies",
        "--payment-method",
        "--model",
        "--schema",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test predict falls back to local artifacts when the API is down
#[test]
fn test_predict_local_fallback() {
    let home = TempDir::new().unwrap();
    write_artifacts(home.path());
    let model = home.path().join("forest.json");
    let schema = home.path().join("columns.json");

    let output = churn(
        home.path(),
        &[
            "--api-url",
            UNREACHABLE_API,
            "--format",
            "json",
            "predict",
            "--tenure",
            "3",
            "--contract",
            "Month-to-month",
            "--model",
            model.to_str().unwrap(),
            "--schema",
            schema.to_str().unwrap(),
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["source"], "local");
    assert_eq!(result["label"], "Yes");
    assert_eq!(result["confidence"], 70.0);
    assert_eq!(result["importances"][0]["feature"], "tenure");
}

/// Test predict reads the record from a file
#[test]
fn test_predict_from_file() {
    let home = TempDir::new().unwrap();
    write_artifacts(home.path());
    let record = home.path().join("client.json");
    std::fs::write(&record, r#"{"tenure": 40, "Contract": "Two year"}"#).unwrap();

    let output = churn(
        home.path(),
        &[
            "--api-url",
            UNREACHABLE_API,
            "--format",
            "json",
            "predict",
            "--file",
            record.to_str().unwrap(),
            "--no-explain",
            "--model",
            home.path().join("forest.json").to_str().unwrap(),
            "--schema",
            home.path().join("columns.json").to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label"], "No");
    assert!(result.get("importances").is_none());
}

/// Test predict fails cleanly without the API or local artifacts
#[test]
fn test_predict_unreachable_without_local_model() {
    let home = TempDir::new().unwrap();
    let output = churn(home.path(), &["--api-url", UNREACHABLE_API, "predict"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--model and --schema"), "stderr: {}", stderr);
}

/// Test inconsistent charges produce a warning but still predict
#[test]
fn test_predict_warns_on_inconsistent_charges() {
    let home = TempDir::new().unwrap();
    write_artifacts(home.path());

    let output = churn(
        home.path(),
        &[
            "--api-url",
            UNREACHABLE_API,
            "--format",
            "json",
            "predict",
            "--tenure",
            "10",
            "--monthly-charges",
            "50",
            "--total-charges",
            "100",
            "--model",
            home.path().join("forest.json").to_str().unwrap(),
            "--schema",
            home.path().join("columns.json").to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("$500.00"), "stderr: {}", stderr);
}
