// CLI integration tests for describe/check/normalize flows.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_cachew-marshal");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    parse_json(line)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write file");
    path
}

const PERSON_SCHEMA: &str = r#"{
  "record": {
    "name": "Person",
    "fields": [
      {"name": "name", "type": "text"},
      {"name": "age", "type": {"optional": "int"}},
      {"name": "contact", "type": {"union": {"name": "Contact", "variants": [
        "text",
        {"record": {"name": "Phone", "fields": [{"name": "number", "type": "text"}]}}
      ]}}}
    ]
  }
}"#;

#[test]
fn describe_prints_canonical_form_and_tags() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "person.json", PERSON_SCHEMA);

    let describe = cmd()
        .args(["describe", schema.to_str().unwrap()])
        .output()
        .expect("describe");
    assert!(describe.status.success());
    let json = parse_json_line(&describe.stdout);
    assert_eq!(
        json["canonical"],
        "Person{name:text,age:optional<int>,contact:Contact[text|Phone{number:text}]} @union(tag,value)"
    );
    assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(json["unions"][0]["name"], "Contact");
    assert_eq!(json["unions"][0]["tags"], serde_json::json!(["text", "Phone"]));

    let custom = cmd()
        .args(["--tag-key", "t", "--value-key", "v", "describe", schema.to_str().unwrap()])
        .output()
        .expect("describe");
    assert!(custom.status.success());
    let custom_json = parse_json_line(&custom.stdout);
    assert_ne!(custom_json["fingerprint"], json["fingerprint"]);
}

#[test]
fn check_counts_noncanonical_and_failed_records() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "person.json", PERSON_SCHEMA);
    let input = write_file(
        temp.path(),
        "cache.jsonl",
        concat!(
            "{\"name\":\"ada\",\"age\":36,\"contact\":{\"tag\":\"text\",\"value\":\"a@b\"}}\n",
            "{\"age\":null,\"name\":\"bob\",\"contact\":{\"tag\":\"Phone\",\"value\":{\"number\":\"1\"}}}\n",
            "{\"name\":\"eve\",\"contact\":{\"tag\":\"Fax\",\"value\":\"2\"}}\n",
        ),
    );

    let clean = cmd()
        .args(["check", schema.to_str().unwrap(), input.to_str().unwrap(), "--errors", "skip"])
        .output()
        .expect("check");
    assert_eq!(clean.status.code(), Some(10));
    let summary = parse_json_line(&clean.stdout);
    assert_eq!(summary["records_total"], 3);
    assert_eq!(summary["ok"], 2);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["noncanonical"], 1);

    let stopped = cmd()
        .args(["check", schema.to_str().unwrap(), input.to_str().unwrap()])
        .output()
        .expect("check");
    assert_eq!(stopped.status.code(), Some(5));
    let err = parse_json_line(&stopped.stderr);
    assert_eq!(err["error"]["kind"], "UnknownVariant");
    assert_eq!(err["error"]["line"], 3);
    assert_eq!(err["error"]["location"], "$.contact");
}

#[test]
fn normalize_reads_stdin_and_writes_canonical_lines() {
    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "person.json", PERSON_SCHEMA);

    let mut child = cmd()
        .args(["normalize", schema.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"{\"contact\":{\"value\":\"x\",\"tag\":\"text\"},\"name\":\"cy\"}\n\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("normalize");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "{\"name\":\"cy\",\"age\":null,\"contact\":{\"tag\":\"text\",\"value\":\"x\"}}\n"
    );

    let again = write_file(
        temp.path(),
        "again.jsonl",
        "{\"name\":\"cy\",\"age\":null,\"contact\":{\"tag\":\"text\",\"value\":\"x\"}}\n",
    );
    let check = cmd()
        .args(["check", schema.to_str().unwrap(), again.to_str().unwrap()])
        .output()
        .expect("check");
    assert!(check.status.success());
    assert_eq!(parse_json_line(&check.stdout)["noncanonical"], 0);
}

#[test]
fn bad_schema_and_missing_files_map_to_exit_codes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let bad = write_file(temp.path(), "bad.json", r#"{"record": {"name": "X"}}"#);
    let output = cmd()
        .args(["describe", bad.to_str().unwrap()])
        .output()
        .expect("describe");
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Schema");
    assert!(err["error"]["hint"].as_str().unwrap().contains("schema descriptor"));

    let nested = write_file(temp.path(), "nested.json", r#"{"optional": {"optional": "int"}}"#);
    let output = cmd()
        .args(["describe", nested.to_str().unwrap()])
        .output()
        .expect("describe");
    assert_eq!(output.status.code(), Some(3));

    let missing = temp.path().join("missing.json");
    let output = cmd()
        .args(["describe", missing.to_str().unwrap()])
        .output()
        .expect("describe");
    assert_eq!(output.status.code(), Some(9));
    assert_eq!(parse_json_line(&output.stderr)["error"]["kind"], "Io");
}

#[test]
fn usage_errors_and_version() {
    let output = cmd().args(["describe"]).output().expect("describe");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(parse_json_line(&output.stderr)["error"]["kind"], "Usage");

    let temp = tempfile::tempdir().expect("tempdir");
    let schema = write_file(temp.path(), "person.json", PERSON_SCHEMA);
    let output = cmd()
        .args(["--tag-key", "k", "--value-key", "k", "describe", schema.to_str().unwrap()])
        .output()
        .expect("describe");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(parse_json_line(&output.stderr)["error"]["kind"], "Usage");

    let version = cmd().arg("version").output().expect("version");
    assert!(version.status.success());
    let json = parse_json_line(&version.stdout);
    assert_eq!(json["name"], "cachew-marshal");
    assert!(json["version"].as_str().is_some());
}

#[test]
fn completion_emits_script() {
    let output = cmd().args(["completion", "bash"]).output().expect("completion");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("cachew-marshal"));
}
