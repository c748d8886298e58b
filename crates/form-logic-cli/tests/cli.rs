use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

const FIXTURE: &str = include_str!("../../form-logic/tests/fixtures/feedback_form.json");

fn write_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("feedback.form.json");
    fs::write(&path, FIXTURE).expect("write fixture");
    path
}

#[test]
fn conditions_command_lists_ordered_operators() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("form-logic")?
        .args(["conditions", "--type", "date"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        ["equals", "not_equals", "is_empty", "is_not_empty", "greater_than", "less_than"]
    );
    Ok(())
}

#[test]
fn evaluate_command_prints_hidden_fields() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let form = write_fixture(&dir);
    let answers = dir.path().join("answers.json");
    fs::write(&answers, r#"{"email":"sam@example.com","satisfied":"No"}"#)?;

    let output = Command::cargo_bin("form-logic")?
        .arg("evaluate")
        .arg("--form")
        .arg(&form)
        .arg("--answers")
        .arg(&answers)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Next field: complaint"));
    assert!(stdout.contains("Hidden fields: export_format, score"));
    Ok(())
}

#[test]
fn evaluate_command_emits_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let form = write_fixture(&dir);

    let output = Command::cargo_bin("form-logic")?
        .arg("evaluate")
        .arg("--form")
        .arg(&form)
        .args(["--format", "json"])
        .output()?;
    assert!(output.status.success());
    let ui: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(ui["form_id"], "feedback-form");
    assert_eq!(ui["progress"]["total"], 4);
    Ok(())
}

#[test]
fn validate_command_fails_on_missing_required() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let form = write_fixture(&dir);
    let answers = dir.path().join("answers.json");
    fs::write(&answers, r#"{"email":"sam@acme.io","satisfied":"No"}"#)?;

    let output = Command::cargo_bin("form-logic")?
        .arg("validate")
        .arg("--form")
        .arg(&form)
        .arg("--answers")
        .arg(&answers)
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Missing required answers: complaint"));
    Ok(())
}

#[test]
fn set_logic_command_writes_updated_form() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form = workspace.child("form.json");
    form.write_str(FIXTURE)?;
    let rules = workspace.child("rules.json");
    rules.write_str(
        r#"[
            {"id": "r1", "trigger_field_id": "satisfied", "condition": "equals", "value": "Yes", "action": "show"},
            {"id": "r2", "trigger_field_id": "", "condition": "equals", "value": "", "action": "show"}
        ]"#,
    )?;
    let out = workspace.child("updated.json");

    Command::cargo_bin("form-logic")?
        .arg("set-logic")
        .arg("--form")
        .arg(form.path())
        .args(["--field", "topics"])
        .arg("--rules")
        .arg(rules.path())
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    let written = fs::read_to_string(out.path())?;
    assert!(written.contains("\"trigger_field_id\": \"satisfied\""));
    let updated: Value = serde_json::from_str(&written)?;
    assert_eq!(updated["fields"][2]["logic"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn set_logic_command_rejects_forward_reference() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form = workspace.child("form.json");
    form.write_str(FIXTURE)?;
    let rules = workspace.child("rules.json");
    rules.write_str(
        r#"[{"id": "r1", "trigger_field_id": "score", "condition": "is_empty", "action": "hide"}]"#,
    )?;

    Command::cargo_bin("form-logic")?
        .arg("set-logic")
        .arg("--form")
        .arg(form.path())
        .args(["--field", "email"])
        .arg("--rules")
        .arg(rules.path())
        .assert()
        .failure();

    let unchanged = fs::read_to_string(form.path())?;
    assert_eq!(unchanged, FIXTURE);
    Ok(())
}

#[test]
fn check_command_reports_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("cyclic.json");
    fs::write(
        &path,
        json!({
            "id": "cyclic",
            "title": "Cyclic",
            "version": "1",
            "fields": [
                { "id": "a", "type": "text", "label": "A", "logic": [
                    { "id": "r1", "trigger_field_id": "b", "condition": "is_empty", "action": "hide" }
                ]},
                { "id": "b", "type": "text", "label": "B", "logic": [
                    { "id": "r2", "trigger_field_id": "a", "condition": "is_empty", "action": "hide" }
                ]},
                { "id": "c", "type": "text", "label": "C", "logic": [
                    { "id": "r3", "trigger_field_id": "a", "condition": "is_empty", "action": "hide" }
                ]}
            ]
        })
        .to_string(),
    )?;

    let output = Command::cargo_bin("form-logic")?
        .arg("check")
        .arg("--form")
        .arg(&path)
        .arg("--json")
        .output()?;
    assert!(!output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["ok"], false);
    assert_eq!(report["logic_error"], "logic rules form a cycle through: a, b");
    Ok(())
}

#[test]
fn check_command_accepts_fixture() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let form = write_fixture(&dir);
    Command::cargo_bin("form-logic")?
        .arg("check")
        .arg("--form")
        .arg(&form)
        .assert()
        .success();
    Ok(())
}
