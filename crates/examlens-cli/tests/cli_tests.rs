//! CLI integration tests using assert_cmd.

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{examlens, seed_workspace};

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    examlens()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created examlens.toml"))
        .stdout(predicate::str::contains("Created database examlens.db"));

    assert!(dir.path().join("examlens.toml").exists());
    assert!(dir.path().join("examlens.db").exists());

    let config = std::fs::read_to_string(dir.path().join("examlens.toml")).unwrap();
    assert!(config.contains("[selection]"));
    assert!(config.contains("max_questions = 20"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    examlens()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    examlens()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn report_text() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["report", "--attempt", "seven"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall: 66.7% (7/10 correct)"))
        .stdout(predicate::str::contains("C2.1.4"))
        .stdout(predicate::str::contains("borderline"))
        .stdout(predicate::str::contains("Recommendations"));
}

#[test]
fn report_json() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    let output = examlens()
        .arg("--config")
        .arg(&config)
        .args(["report", "--attempt", "seven", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["attempt_id"], "seven");
    assert_eq!(json["overall"]["correct"], 7);
    assert_eq!(json["points"][0]["level"], "borderline");
    assert_eq!(json["coverage"]["total_points_in_scope"], 4);
    assert_eq!(json["chapters"][0]["chapter_code"], "C2");
}

#[test]
fn report_markdown_and_output_file() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());
    let saved = dir.path().join("out").join("seven.json");

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["report", "--attempt", "seven", "--format", "markdown", "--output"])
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Diagnostic report: seven"))
        .stderr(predicate::str::contains("Report saved to"));

    let report = examlens_core::report::Report::load_json(&saved).unwrap();
    assert_eq!(report.attempt_id, "seven");
    assert_eq!(report.overall.total, 10);
}

#[test]
fn report_unknown_attempt_prints_error_body() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["report", "--attempt", "missing", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"code\": \"ATTEMPT_NOT_FOUND\""))
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("attempt not found: missing"));
}

#[test]
fn practice_json() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    let output = examlens()
        .arg("--config")
        .arg(&config)
        .args(["practice", "--attempt", "seven", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 20);
    assert_eq!(json["target"], 18);
    assert_eq!(json["risk_level"], "low");
    assert_eq!(json["completed_correct"], 7);
    assert_eq!(json["weaknesses"][0]["code"], "C2.1.4");
    assert_eq!(json["weaknesses"][0]["sectionCode"], "C2.1");
    assert_eq!(json["questions"].as_array().unwrap().len(), 20);
}

#[test]
fn practice_text_reports_tiers() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["practice", "--attempt", "seven"])
        .assert()
        .success()
        .stdout(predicate::str::contains("risk low"))
        .stdout(predicate::str::contains("20 practice questions (target 18)"))
        .stderr(predicate::str::contains("Tier points: +10"));
}

#[test]
fn practice_unscoped_attempt_is_incomplete() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["practice", "--attempt", "unscoped", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ATTEMPT_INCOMPLETE"));
}

#[test]
fn practice_blank_attempt_id() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    examlens()
        .arg("--config")
        .arg(&config)
        .args(["practice", "--attempt", "  ", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("MISSING_ATTEMPT_ID"));
}

#[test]
fn missing_database_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("examlens.toml");
    std::fs::write(&config, "database = \"nowhere.db\"\n").unwrap();

    examlens()
        .current_dir(dir.path())
        .args(["report", "--attempt", "seven"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("database not found"));
}

#[test]
fn missing_config_file() {
    examlens()
        .args(["--config", "nonexistent.toml", "report", "--attempt", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn rollup_text_and_json() {
    let dir = TempDir::new().unwrap();
    let tree = dir.path().join("tree.json");
    std::fs::write(
        &tree,
        r#"[
            {"id": "c2", "code": "C2", "title": "Chapter 2"},
            {"id": "s1", "parent_id": "c2", "code": "C2.1", "title": "Section 1"},
            {"id": "k1", "parent_id": "s1", "code": "C2.1.1", "mastery_score": 80},
            {"id": "k2", "parent_id": "s1", "code": "C2.1.2", "mastery_score": 60},
            {"id": "k3", "parent_id": "s1", "code": "C2.1.3"}
        ]"#,
    )
    .unwrap();

    examlens()
        .arg("rollup")
        .arg("--tree")
        .arg(&tree)
        .assert()
        .success()
        .stdout(predicate::str::contains("C2.1.1"))
        .stdout(predicate::str::contains("70.0"))
        .stdout(predicate::str::contains("review"));

    let output = examlens()
        .arg("rollup")
        .arg("--tree")
        .arg(&tree)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let nodes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(nodes[0]["mastery_score"], 70.0);
    assert_eq!(nodes[0]["mastery_level"], "review");
    assert_eq!(nodes[1]["mastery_score"], 70.0);
    assert_eq!(nodes[4]["mastery_level"], "unlearned");
}

#[test]
fn rollup_rejects_duplicate_ids() {
    let dir = TempDir::new().unwrap();
    let tree = dir.path().join("tree.json");
    std::fs::write(&tree, r#"[{"id": "a"}, {"id": "a"}]"#).unwrap();

    examlens()
        .arg("rollup")
        .arg("--tree")
        .arg(&tree)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate node id: a"));
}
