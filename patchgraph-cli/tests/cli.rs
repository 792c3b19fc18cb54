//! Tests for the CLI, driving the compiled binary end to end.

use assert_cmd::Command;
use assert_fs::NamedTempFile;
use assert_fs::fixture::FileWriteStr;
use patchgraph::template::TemplateRegistry;
use patchgraph::{Graph, Position};
use patchgraph_cli::validate::VALID_PRINT;
use predicates::prelude::*;
use predicates::str::contains;
use rstest::{fixture, rstest};

#[fixture]
fn cmd() -> Command {
    Command::cargo_bin("patchgraph").unwrap()
}

#[fixture]
fn val_cmd(mut cmd: Command) -> Command {
    cmd.arg("validate");
    cmd
}

/// A wired three-node document rendered to JSON.
#[fixture]
fn chain_doc() -> String {
    let mut graph = Graph::new();
    let templates = TemplateRegistry::new();
    let a = graph
        .create_node(&templates, "SOURCE", Position::new(0.0, 0.0))
        .unwrap();
    let b = graph
        .create_node(&templates, "TRANSFORM", Position::new(200.0, 0.0))
        .unwrap();
    let c = graph
        .create_node(&templates, "SINK", Position::new(400.0, 0.0))
        .unwrap();
    graph.connect(a, 0, b, 0).unwrap();
    graph.connect(b, 0, c, 0).unwrap();
    graph.to_document().to_json().unwrap()
}

/// A document whose single edge references a node that does not exist.
const DANGLING_EDGE_DOC: &str = r#"{
    "items": [
        {"id": "11111111-1111-1111-1111-111111111111", "type": "SOURCE", "x": 0, "y": 0, "inputs": 0, "outputs": 1},
        {"id": "33333333-3333-3333-3333-333333333333",
         "fromNode": "11111111-1111-1111-1111-111111111111", "fromSocketIndex": 0,
         "toNode": "99999999-9999-9999-9999-999999999999", "toSocketIndex": 0}
    ]
}"#;

#[rstest]
fn validate_good_document(mut val_cmd: Command, chain_doc: String) {
    val_cmd
        .write_stdin(chain_doc)
        .assert()
        .success()
        .stdout(contains(VALID_PRINT))
        .stdout(contains("nodes: 3, edges: 2"));
}

#[rstest]
fn validate_reads_files(mut val_cmd: Command, chain_doc: String) {
    let file = NamedTempFile::new("doc.json").unwrap();
    file.write_str(&chain_doc).unwrap();
    val_cmd.arg(file.path()).assert().success();
}

#[rstest]
fn validate_rejects_garbage(mut val_cmd: Command) {
    val_cmd
        .write_stdin("this is not json")
        .assert()
        .failure()
        .stderr(contains("malformed document"));
}

#[rstest]
fn validate_reports_dropped_edges(mut val_cmd: Command) {
    val_cmd
        .write_stdin(DANGLING_EDGE_DOC)
        .assert()
        .failure()
        .stderr(contains("dropped"));
}

#[rstest]
fn validate_allows_degraded_when_asked(mut val_cmd: Command) {
    val_cmd
        .arg("--allow-degraded")
        .write_stdin(DANGLING_EDGE_DOC)
        .assert()
        .success()
        .stdout(contains("nodes: 1, edges: 0"));
}

#[rstest]
fn validate_rejects_unsupported_version(mut val_cmd: Command) {
    val_cmd
        .write_stdin(r#"{"version": "9.9", "items": []}"#)
        .assert()
        .failure()
        .stderr(contains("unsupported document version"));
}

#[rstest]
fn describe_lists_records(mut cmd: Command, chain_doc: String) {
    cmd.arg("describe")
        .write_stdin(chain_doc)
        .assert()
        .success()
        .stdout(contains("nodes: 3"))
        .stdout(contains("edges: 2"))
        .stdout(contains("TRANSFORM"))
        .stdout(contains("-> "));
}

#[rstest]
fn describe_accepts_wrapped_layout(mut cmd: Command) {
    let wrapped = r#"{
        "nodes": [
            {"id": "11111111-1111-1111-1111-111111111111", "type": "SOURCE", "x": 0, "y": 0, "inputs": 0, "outputs": 1}
        ],
        "connections": []
    }"#;
    cmd.arg("describe")
        .write_stdin(wrapped)
        .assert()
        .success()
        .stdout(contains("nodes: 1"))
        .stdout(contains("SOURCE"));
}
