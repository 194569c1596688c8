use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

const PAGE: &str = r#"
<div id="app">
  <section class="panel">
    <div class="row"><div class="cell"><button class="save-btn">Save</button></div></div>
  </section>
</div>"#;

const EDITOR: &str = r#"<div class="toolbar"><button class="publish">Publish</button></div>"#;

fn waypoint() -> Command {
    let mut cmd = Command::cargo_bin("waypoint").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("WAYPOINT_POLICY_OVERRIDE_JSON");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.display().to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn capture_then_resolve_round_trips() {
    let dir = tempdir().unwrap();
    let html = write(dir.path(), "page.html", PAGE);
    let target = dir.path().join("target.json");

    waypoint()
        .args(["capture", "--html", html.as_str(), "--selector", ".save-btn", "--output"])
        .arg(&target)
        .assert()
        .success();

    let stored: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(stored["mode"], "auto");
    assert_eq!(stored["textContent"], "Save");
    assert!(!stored["contextTree"]["selectors"].as_array().unwrap().is_empty());

    let output = waypoint()
        .args(["resolve", "--html", html.as_str(), "--target"])
        .arg(&target)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["element"]["tag"], "button");
    assert_eq!(report["element"]["text"], "Save");
    assert_eq!(report["matchKind"]["kind"], "strict");
}

#[test]
fn resolve_reports_not_found_with_exit_code_two() {
    let dir = tempdir().unwrap();
    let html = write(dir.path(), "page.html", PAGE);
    let target = write(
        dir.path(),
        "target.json",
        r#"{"mode": "custom", "customSelector": "div#nonexistent"}"#,
    );

    let output = waypoint()
        .args(["resolve", "--html", html.as_str(), "--target", target.as_str()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output), Value::Null);
}

#[test]
fn frames_lists_accessible_documents_only() {
    let dir = tempdir().unwrap();
    let html = write(
        dir.path(),
        "page.html",
        r#"<iframe id="ads"></iframe><iframe id="editor"></iframe>"#,
    );
    let editor = write(dir.path(), "editor.html", EDITOR);
    let ads = write(dir.path(), "ads.html", "<p>ad</p>");

    let output = waypoint()
        .args(["frames", "--html", html.as_str(), "--url", "https://app.example.com/"])
        .arg("--frame")
        .arg(format!("#ads={ads}@https://ads.example.net/slot"))
        .arg("--frame")
        .arg(format!("#editor={editor}@/editor"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries = stdout_json(&output);
    let labels: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["frameSelector"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["", "iframe#editor"]);
    assert_eq!(entries[1]["url"], "https://app.example.com/editor");
}

#[test]
fn capture_inside_frame_resolves_across_frames() {
    let dir = tempdir().unwrap();
    let html = write(dir.path(), "page.html", r#"<iframe id="editor"></iframe>"#);
    let editor = write(dir.path(), "editor.html", EDITOR);
    let frame = format!("#editor={editor}");
    let target = dir.path().join("target.json");

    waypoint()
        .args(["capture", "--html", html.as_str(), "--frame", frame.as_str()])
        .args(["--selector", ".publish", "--across-frames", "--output"])
        .arg(&target)
        .assert()
        .success();

    let output = waypoint()
        .args(["resolve", "--html", html.as_str(), "--frame", frame.as_str(), "--target"])
        .arg(&target)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["iframeContext"], "iframe#editor");
    assert_eq!(report["isInIframe"], true);
}

#[test]
fn unknown_selector_fails_capture() {
    let dir = tempdir().unwrap();
    let html = write(dir.path(), "page.html", PAGE);
    waypoint()
        .args(["capture", "--html", html.as_str(), "--selector", ".missing"])
        .assert()
        .code(1);
}

#[test]
fn policy_file_overrides_precision_scale() {
    let dir = tempdir().unwrap();
    let html = write(
        dir.path(),
        "page.html",
        r#"<div id="app"><section class="panel"><div class="row"><button class="save-btn">Save</button></div></section></div>"#,
    );
    // .cell no longer exists: the button verifies three of four ancestors, rate 7.5
    let target = write(
        dir.path(),
        "target.json",
        r##"{
          "contextTree": {
            "selectors": [".save-btn"], "depth": 0,
            "parent": {"selectors": [".cell"], "depth": 1,
              "parent": {"selectors": [".row"], "depth": 2,
                "parent": {"selectors": ["section.panel"], "depth": 3,
                  "parent": {"selectors": ["#app"], "depth": 4}}}}
          },
          "precisionLevel": "medium"
        }"##,
    );

    waypoint()
        .args(["resolve", "--html", html.as_str(), "--target", target.as_str()])
        .assert()
        .success();

    let config = write(dir.path(), "policy.yaml", "precision:\n  medium: 8\n");
    waypoint()
        .args(["--config", config.as_str(), "resolve", "--html", html.as_str(), "--target", target.as_str()])
        .assert()
        .code(2);
}

#[test]
fn missing_policy_file_is_an_error() {
    let dir = tempdir().unwrap();
    let html = write(dir.path(), "page.html", PAGE);
    waypoint()
        .args(["--config", "/nonexistent/policy.yaml", "frames", "--html", html.as_str()])
        .assert()
        .code(1);
}
