use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn fixture_path(file: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(file)
}

#[test]
fn check_valid_doc_exits_0_and_prints_size() {
    let doc = fixture_path("doc.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["check", doc.to_str().unwrap()]);

    cmd.assert().success().code(0).stdout("OK 10\n");
}

#[test]
fn check_unknown_node_type_exits_2_and_prints_error_to_stderr() {
    let doc = fixture_path("doc.unknown_type.json");

    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["check", doc.to_str().unwrap()]);

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unknown node type 'sidebar'"));
}

#[test]
fn check_missing_file_exits_1() {
    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["check", "no-such-file.json"]);

    cmd.assert().failure().code(1);
}

#[test]
fn check_non_document_json_exits_2() {
    let steps = fixture_path("steps.delete.json");

    // A steps array is well-formed JSON but not a document object.
    let mut cmd = cargo_bin_cmd!("vellum");
    cmd.args(["check", steps.to_str().unwrap()]);

    cmd.assert().failure().code(2);
}
