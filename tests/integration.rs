//! CLI integration tests.

use std::process::{Command, Output};

fn gunlayer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gunlayer"))
        .args(args)
        .output()
        .expect("run gunlayer")
}

fn stdout(o: &Output) -> String {
    String::from_utf8_lossy(&o.stdout).into_owned()
}

#[test]
fn tables_then_solve_with_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tables = dir.path().join("tables");
    let tables_str = tables.to_str().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_gunlayer"))
        .args(["tables", "--out", tables_str, "--step-mil", "25", "--dt", "0.05"])
        .status()
        .expect("run tables");
    assert!(status.success(), "tables should succeed");
    for name in ["ballistic_direct.npz", "ballistic_low.npz", "ballistic_high.npz"] {
        assert!(tables.join(name).exists(), "{} should exist", name);
    }

    let report_path = dir.path().join("solution.json");
    let output = gunlayer(&[
        "solve",
        "--range",
        "500",
        "--arc",
        "low",
        "--tolerance",
        "10",
        "--dt",
        "0.05",
        "--tables",
        tables_str,
        "--json",
        "--out",
        report_path.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "solve should succeed: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    assert_eq!(v["request"]["target_range_m"], 500.0);
    assert_eq!(v["within_tolerance"], true);
    let elevation = v["solution"]["elevation_mil"].as_f64().unwrap();
    assert!((0.0..=650.0).contains(&elevation));
    assert!(report_path.exists(), "solution.json should exist");
}

#[test]
fn solve_by_brute_force_prints_text() {
    let output = gunlayer(&["solve", "--range", "400", "--height", "-10", "--dt", "0.05"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Charge:"), "output: {}", out);
    assert!(out.contains("Elevation:"));
    assert!(!out.contains("Bearing:"));
}

#[test]
fn solve_from_grid_coordinates_reports_bearing() {
    let output = gunlayer(&[
        "solve",
        "--gun-x",
        "0100",
        "--gun-y",
        "0100",
        "--target-x",
        "0150",
        "--target-y",
        "0100",
        "--wind-speed",
        "3",
        "--wind-from",
        "270",
        "--dt",
        "0.05",
    ]);
    assert!(
        output.status.success(),
        "{:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).contains("Bearing:      1600.0 mil"));
}

#[test]
fn solve_uses_config_charges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = dir.path().join("gun.toml");
    std::fs::write(
        &cfg,
        "base_velocity_mps = 150.0\n\n[[charges]]\nid = 7\nmultiplier = 1.0\n",
    )
    .unwrap();
    let output = gunlayer(&[
        "solve",
        "--range",
        "800",
        "--dt",
        "0.05",
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Charge:       7"));
}

#[test]
fn missing_tables_folder_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope");
    let output = gunlayer(&["solve", "--range", "500", "--tables", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ballistic_direct.npz"));
}

#[test]
fn solve_requires_a_target() {
    let output = gunlayer(&["solve", "--gun-x", "0100"]);
    assert!(!output.status.success());
}

#[test]
fn shot_prints_impact() {
    let output = gunlayer(&["shot", "--charge", "2", "--elevation", "800", "--dt", "0.05"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Charge 2 at 800.0 mil"), "output: {}", out);
    assert!(out.contains("impact"));
}

#[test]
fn shot_with_vanishing_step_is_refused() {
    let output = gunlayer(&["shot", "--charge", "1", "--elevation", "800", "--dt", "1e-300"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid integration settings"));
}

#[test]
fn shot_with_unknown_charge_fails() {
    let output = gunlayer(&["shot", "--charge", "42", "--elevation", "800"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid charge: 42"));
}

#[test]
fn catalog_lists_profiles() {
    let output = gunlayer(&["catalog"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("mortar_82"));
    assert!(out.contains("Charges:"));

    let one = gunlayer(&["catalog", "--weapon", "GRENADE_LAUNCHER"]);
    assert!(one.status.success());
    assert!(!stdout(&one).contains("mortar_82"));
    assert!(!gunlayer(&["catalog", "--weapon", "trebuchet"]).status.success());
}
