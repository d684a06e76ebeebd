// Allow deprecated APIs (assert_cmd::cargo_bin is deprecated but still works)
#![allow(deprecated)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::Path;
use std::process::Command;

fn grid_path(name: &str) -> String {
    let root_path = Path::new(env!("CARGO_MANIFEST_DIR"));
    root_path
        .join("..")
        .join("raster-checker-rs")
        .join("tests")
        .join("grids")
        .join(format!("{}.asc", name))
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn check_no_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: raster-checker"));
    Ok(())
}

#[rstest]
fn test_identical_grids_pass(
    #[values("dem", "dem_noflag")] name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg(grid_path(name))
        .arg("-e").arg(grid_path(name))
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: PASS"));
    Ok(())
}

#[test]
fn test_differing_grids_fail() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg(grid_path("dem_one_off"))
        .arg("-e").arg(grid_path("dem"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Result: FAIL"))
        .stdout(predicate::str::contains("1 mismatched"));
    Ok(())
}

#[test]
fn test_missing_input_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg("/nonexistent/missing.asc")
        .arg("-e").arg(grid_path("dem"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Cannot open"));
    Ok(())
}

#[test]
fn test_unknown_source_type() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg(grid_path("dem"))
        .arg("--verified-type").arg("grib2")
        .arg("-e").arg(grid_path("dem"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source type"));
    Ok(())
}

#[test]
fn test_json_format() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    let output = cmd
        .arg("-v").arg(grid_path("dem"))
        .arg("-e").arg(grid_path("dem"))
        .arg("--format").arg("json")
        .output()?;

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["passed"], serde_json::Value::Bool(true));
    Ok(())
}

#[test]
fn test_invalid_format() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg(grid_path("dem"))
        .arg("-e").arg(grid_path("dem"))
        .arg("--format").arg("yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid report format"));
    Ok(())
}

#[test]
fn test_html_report_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let report_path = dir.path().join("report.html");

    let mut cmd = Command::cargo_bin("raster-checker")?;
    cmd.arg("-v").arg(grid_path("dem_one_off"))
        .arg("-e").arg(grid_path("dem"))
        .arg("--format").arg("html")
        .arg("-o").arg(&report_path)
        .assert()
        .failure();

    let html = fs::read_to_string(&report_path)?;
    assert!(html.contains("Param name"));
    assert!(html.contains("<h3>Band 1</h3>"));
    Ok(())
}
