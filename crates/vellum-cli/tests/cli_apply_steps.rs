use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;

fn fixture_path(file: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(file)
}

fn joined_doc() -> serde_json::Value {
    json!({
        "type": "doc",
        "content": [
            { "type": "paragraph", "content": [{ "type": "text", "text": "ad" }] }
        ]
    })
}

#[test]
fn apply_delete_prints_resulting_document() {
    let doc = fixture_path("doc.json");
    let steps = fixture_path("steps.delete.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["apply", doc.to_str().unwrap(), steps.to_str().unwrap()]);

    let output = cmd.assert().success().code(0).get_output().stdout.clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed, joined_doc());
}

#[test]
fn apply_min_emits_a_single_line() {
    let doc = fixture_path("doc.json");
    let steps = fixture_path("steps.delete.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["apply", doc.to_str().unwrap(), steps.to_str().unwrap(), "--min"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.lines().count(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, joined_doc());
}

#[test]
fn apply_refused_step_exits_2_and_prints_reason() {
    let doc = fixture_path("doc.json");
    let steps = fixture_path("steps.refused.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["apply", doc.to_str().unwrap(), steps.to_str().unwrap()]);

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("step failed"));
}

#[test]
fn apply_unknown_step_type_exits_1() {
    let doc = fixture_path("doc.json");
    let steps = fixture_path("steps.unknown_type.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["apply", doc.to_str().unwrap(), steps.to_str().unwrap()]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("teleport"));
}
