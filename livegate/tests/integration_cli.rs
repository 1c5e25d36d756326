//! The `livegate` binary.


use std::process::{Command, Output};

use fixtures::*;
use livegate::Document;

fn livegate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_livegate"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run livegate")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn flatten_writes_a_file_without_uses() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("flat.svg");
    let input = schematic_path("ring.svg");

    let out = livegate(&[
        "flatten",
        input.to_str().unwrap(),
        "-o",
        out_path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let flat = std::fs::read_to_string(&out_path).unwrap();
    let doc = Document::parse(&flat).unwrap();
    assert!(doc.elements_named("use").is_empty());
    assert!(!doc.elements_named("path").is_empty());
}

#[test]
fn flatten_can_color_nets() {
    let input = schematic_path("source_sink.svg");
    let out = livegate(&["flatten", input.to_str().unwrap(), "--color-nets"]);
    assert!(out.status.success());

    let doc = Document::parse(&stdout(&out)).unwrap();
    let a = doc.element_by_id("src-y").unwrap();
    let b = doc.element_by_id("snk-a").unwrap();
    let style = doc.attr(a, "style").unwrap();
    assert!(style.starts_with("stroke:rgb("));
    assert_eq!(doc.attr(a, "style"), doc.attr(b, "style"));
}

#[test]
fn nets_as_json() {
    let input = schematic_path("half_adder.svg");
    let out = livegate(&["nets", input.to_str().unwrap(), "--json"]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["nets"].as_array().unwrap().len(), 4);
    assert_eq!(report["rejected"][0]["path"], "#decoration");
    assert!(report["nets"][0]["value"].is_null());
}

#[test]
fn cells_lists_behaviors() {
    let input = schematic_path("half_adder.svg");
    let out = livegate(&["cells", input.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("6 cells"), "{text}");
    assert!(text.contains("[xor]"));
    assert!(text.contains("[and]"));
}

#[test]
fn config_file_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("livegate.yaml");
    std::fs::write(&cfg, "tolerance: 0.25\nmax_micro_rounds: 12\n").unwrap();

    let out = livegate(&["config", "--config", cfg.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("tolerance: 0.25"), "{text}");
    assert!(text.contains("max_micro_rounds: 12"), "{text}");
}

#[test]
fn bad_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.svg");
    std::fs::write(&bad, "<svg><g></svg>").unwrap();
    let out = livegate(&["nets", bad.to_str().unwrap()]);
    assert!(!out.status.success());
}
