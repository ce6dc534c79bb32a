//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn polylog() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("polylog").unwrap();
    cmd.env_remove("POLYLOG_EVALUATOR_URL")
        .env_remove("POLYLOG_EVALUATOR_KEY");
    cmd
}

fn content_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content")
}

/// Write a config that stores data in `dir` and reads the bundled content.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("polylog.toml");
    let config = format!(
        "data_dir = '{}'\ncontent_dir = '{}'\nparallelism = 2\n\n[evaluator]\ntype = \"mock\"\n",
        dir.join("data").display(),
        content_dir().display()
    );
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn validate_content_directory() {
    polylog()
        .arg("validate")
        .arg("--content")
        .arg("../../content")
        .assert()
        .success()
        .stdout(predicate::str::contains("300-301 review (2 days, 7 questions)"))
        .stdout(predicate::str::contains("ja 300-301 learn"))
        .stdout(predicate::str::contains("All content valid"));
}

#[test]
fn validate_single_file() {
    polylog()
        .arg("validate")
        .arg("--content")
        .arg("../../content/en/speaking.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("en 100-101 review (1 days, 3 questions)"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{"language": "en", "module_id": "300", "test_id": "301", "mode": "review",
            "content": {"1": [
              {"id": "a", "prompt": "", "answers": ["x"]},
              {"id": "a", "prompt": "pick", "options": ["x", "y"], "correct_option": 5}
            ]}}"#,
    )
    .unwrap();

    polylog()
        .arg("validate")
        .arg("--content")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("prompt is empty"))
        .stdout(predicate::str::contains("duplicate question ID"))
        .stdout(predicate::str::contains("out of range"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    polylog()
        .arg("validate")
        .arg("--content")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    polylog()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created polylog.toml"))
        .stdout(predicate::str::contains("Created content/en/vocabulary.json"));

    assert!(dir.path().join("polylog.toml").exists());

    polylog()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--content")
        .arg("content")
        .assert()
        .success()
        .stdout(predicate::str::contains("All content valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("polylog.toml"), "# mine\n").unwrap();

    polylog()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("polylog.toml already exists"));

    let kept = std::fs::read_to_string(dir.path().join("polylog.toml")).unwrap();
    assert_eq!(kept, "# mine\n");
}

#[test]
fn days_counts_content() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args(["days", "--module", "300", "--test", "301"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 day(s)"));

    polylog()
        .arg("--config")
        .arg(&config)
        .args(["days", "--module", "999", "--test", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 day(s)"));
}

#[test]
fn grade_then_dashboard() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "grade", "--user", "ana@example.com", "--module", "300", "--test", "301", "--day",
            "1",
        ])
        .args(["--answer", "1", "--answer", "0", "--answer", "2"])
        .args(["--answer", "0", "--answer", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 80.0/100"));

    assert!(dir.path().join("data/results.json").exists());

    let output = polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "dashboard",
            "--user",
            "ana@example.com",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["user_id"], "ana@example.com");
    let dashboard = &report["dashboard"];
    assert_eq!(dashboard["total_tests"], 5);
    // Choice credits are not reviewed scores.
    assert_eq!(dashboard["average_score"], 0.0);
    assert_eq!(dashboard["score_by_module"].as_array().unwrap().len(), 0);
    assert_eq!(dashboard["top_missed_questions"][0]["miss_rate"], 100.0);
    assert_eq!(dashboard["top_missed_questions"][1]["miss_rate"], 0.0);
    let recent = dashboard["recent_results"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert!(recent.iter().all(|r| r["score"].is_null()));
}

#[test]
fn grade_rejects_wrong_answer_count() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "grade", "--user", "ana@example.com", "--module", "300", "--test", "301", "--day",
            "2", "--answer", "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 answers for 2 questions"));
}

#[test]
fn grade_speech_by_similarity() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "grade",
            "--user",
            "ana@example.com",
            "--module",
            "100",
            "--test",
            "101",
            "--day",
            "1",
            "--modality",
            "speech-accuracy",
        ])
        .args(["--answer", "good morning"])
        .args(["--answer", "nice to meet you"])
        .args(["--answer", "could you say that again"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 100.0/100"));
}

#[test]
fn review_with_mock_evaluator() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "review", "--user", "ana@example.com", "--module", "200", "--test", "201", "--day",
            "1",
        ])
        .args(["--answer", "I am a student."])
        .args(["--answer", "It is raining today."])
        .args(["--answer", "I met a friend yesterday."])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock review"))
        .stderr(predicate::str::contains("Complete: 3/3 reviewed, 0 failed"));
}

#[test]
fn complete_then_markdown_dashboard() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "complete", "--user", "ana@example.com", "--module", "300", "--test", "301", "--day",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed 300-301-1"));

    let saved = dir.path().join("out/dashboard.json");
    polylog()
        .arg("--config")
        .arg(&config)
        .args([
            "dashboard",
            "--user",
            "ana@example.com",
            "--period",
            "7d",
            "--format",
            "markdown",
            "--output",
        ])
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Dashboard for ana@example.com (en, 7d)"))
        .stdout(predicate::str::contains("| Completed tests | 1.0 |"));

    assert!(saved.exists());
}

#[test]
fn dashboard_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    polylog()
        .arg("--config")
        .arg(&config)
        .args(["dashboard", "--user", "ana@example.com", "--format", "html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn missing_config_file_fails() {
    polylog()
        .args(["--config", "nope.toml", "days", "--module", "300", "--test", "301"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn help_output() {
    polylog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("grade"))
        .stdout(predicate::str::contains("dashboard"));
}

#[test]
fn version_output() {
    polylog()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polylog"));
}
