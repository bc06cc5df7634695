use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const ISSUE_JSON: &str = r#"{
  "type": "doc",
  "version": 1,
  "content": [
    {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Plan"}]},
    {"type": "paragraph", "content": [
      {"type": "text", "text": "Owner: "},
      {"type": "mention", "attrs": {"id": "abc123", "text": "@Jane"}},
      {"type": "text", "text": " "},
      {"type": "status", "attrs": {"text": "Done", "color": "green"}}
    ]},
    {"type": "taskList", "attrs": {"localId": ""}, "content": [
      {"type": "taskItem", "attrs": {"localId": "", "state": "TODO"}, "content": [{"type": "text", "text": "Ship it"}]}
    ]}
  ]
}"#;

#[test]
fn render_adf_file_to_markdown() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("issue.json");
    fs::write(&input, ISSUE_JSON).unwrap();

    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("render")
        .arg(&input)
        .arg("--base-url")
        .arg("https://h.atlassian.net");

    cmd.assert().success().stdout(
        "## Plan\n\n\
         Owner: [@Jane](https://h.atlassian.net/jira/people/abc123) `[status:g]Done`\n\n\
         ☐ Ship it\n",
    );
}

#[test]
fn render_reads_stdin() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("render").arg("-").write_stdin(ISSUE_JSON);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[@Jane](/jira/people/abc123)"));
}

#[test]
fn render_rejects_invalid_json() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("render").arg("-").write_stdin("{not json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid ADF JSON"));
}

#[test]
fn parse_markdown_to_adf_json() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("parse").arg("-").write_stdin("Hello **world**\n");

    let output_pred = predicate::str::contains("\"type\": \"doc\"")
        .and(predicate::str::contains("\"text\": \"Hello \""))
        .and(predicate::str::contains("\"type\": \"strong\""));
    cmd.assert().success().stdout(output_pred);
}

#[test]
fn parse_reports_warnings_on_stderr() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("parse").arg("-").write_stdin("![logo](logo.png)\n");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "Warning: Unsupported inline markdown: image",
        ))
        .stdout(predicate::str::contains("\"text\": \"logo\""));
}

#[test]
fn parse_quiet_suppresses_warnings() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("parse")
        .arg("-")
        .arg("--quiet")
        .write_stdin("![logo](logo.png)\n");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Warning").not());
}

#[test]
fn convert_is_the_default_command() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.md");
    fs::write(&input, "- [x] done\n").unwrap();

    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg(&input).arg("--to").arg("adf");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"DONE\""));
}

#[test]
fn convert_writes_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("issue.json");
    let output = dir.path().join("issue.md");
    fs::write(&input, ISSUE_JSON).unwrap();

    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("convert")
        .arg(&input)
        .arg("--to")
        .arg("markdown")
        .arg("-o")
        .arg(&output)
        .arg("--extra-base-url")
        .arg("https://h.atlassian.net");
    cmd.assert().success().stdout("");

    let markdown = fs::read_to_string(&output).unwrap();
    assert!(markdown.contains("[@Jane](https://h.atlassian.net/jira/people/abc123)"));
}

#[test]
fn convert_requires_known_extension_or_from() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "text").unwrap();

    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("convert").arg(&input).arg("--to").arg("adf");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Could not detect format"));

    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("convert")
        .arg(&input)
        .arg("--from")
        .arg("markdown")
        .arg("--to")
        .arg("adf");
    cmd.assert().success();
}

#[test]
fn convert_unknown_format_fails() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("convert")
        .arg("-")
        .arg("--from")
        .arg("markdown")
        .arg("--to")
        .arg("html")
        .write_stdin("x");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Format 'html' not found"));
}

#[test]
fn list_formats() {
    let mut cmd = cargo_bin_cmd!("adf");
    cmd.arg("--list-formats");

    cmd.assert().success().stdout(
        predicate::str::contains("adf")
            .and(predicate::str::contains("markdown"))
            .and(predicate::str::contains("GitHub-flavoured Markdown")),
    );
}
