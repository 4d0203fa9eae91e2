use std::path::Path;
use std::process::{Command, Output};

use image::{GrayImage, Luma};

const TEMPLATE: &str = r#"{
    "width": 50,
    "height": 50,
    "nodes": [
        { "type": "group", "transform": "translate(2, 3)", "children": [
            { "type": "mark", "id": "A", "x": 3, "y": 2, "width": 10, "height": 10 }
        ]},
        { "type": "mark", "id": "B", "x": 30, "y": 30, "width": 10, "height": 10 }
    ]
}"#;

/// A 100x100 white form (twice the template canvas) with mark A inked.
fn write_form(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("form.png");
    let img = GrayImage::from_fn(100, 100, |x, y| {
        if (10..30).contains(&x) && (10..30).contains(&y) {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    img.save(&path).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_omr-marks"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn prints_id_and_state_code_per_mark() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(&template, TEMPLATE).unwrap();
    let form = write_form(dir.path());

    let output = run(&["-t", template.to_str().unwrap(), form.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "A 2\nB 0\n");
}

#[test]
fn prints_json_with_scores() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(&template, TEMPLATE).unwrap();
    let form = write_form(dir.path());

    let output = run(&["--json", "-t", template.to_str().unwrap(), form.to_str().unwrap()]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["id"], "A");
    assert_eq!(json[0]["state"], "overfilled");
    assert_eq!(json[0]["score"], 1.0);
    assert_eq!(json[1]["state"], "void");
}

#[test]
fn calibration_file_changes_classification() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(&template, TEMPLATE).unwrap();
    let calibration = dir.path().join("calibration.json");
    std::fs::write(&calibration, r#"{ "overfilledThreshold": 1.0 }"#).unwrap();
    let form = write_form(dir.path());

    let output = run(&[
        "-c",
        calibration.to_str().unwrap(),
        "-t",
        template.to_str().unwrap(),
        form.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "A 1\nB 0\n");
}

#[test]
fn empty_template_exits_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(&template, r#"{ "width": 50, "height": 50, "nodes": [] }"#).unwrap();
    let form = write_form(dir.path());

    let output = run(&["-t", template.to_str().unwrap(), form.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Warning"));
}

#[test]
fn empty_template_warns_without_reading_the_image() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(&template, r#"{ "width": 50, "height": 50, "nodes": [] }"#).unwrap();
    let missing = dir.path().join("missing.png");

    let output = run(&["-t", template.to_str().unwrap(), missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Warning"));
}

#[test]
fn unsupported_transform_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.json");
    std::fs::write(
        &template,
        r#"{ "width": 50, "height": 50, "nodes": [
            { "type": "group", "transform": "scale(2)", "children": [
                { "type": "mark", "id": "A", "x": 1, "y": 1, "width": 2, "height": 2 }
            ]}
        ]}"#,
    )
    .unwrap();
    let form = write_form(dir.path());

    let output = run(&["-t", template.to_str().unwrap(), form.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("scale(2)"));
}
