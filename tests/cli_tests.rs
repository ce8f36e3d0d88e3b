mod common;

use common::*;
use std::path::Path;
use std::process::Command;

fn cli_command(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_upload-actions"));
    command.current_dir(dir);
    command
}

#[test]
fn test_cli_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Publish a video post to several destinations"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("show"));
}

#[test]
fn test_cli_version() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("upload-actions"));
}

#[test]
fn test_cli_run_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["run", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--platform"));
    assert!(stdout.contains("--metadata"));
    assert!(stdout.contains("--video"));
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--json"));
}

#[test]
fn test_cli_list_builtins() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("list").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["x", "linkedin", "instagram", "tiktok", "snapchat", "youtube"] {
        assert!(stdout.contains(name), "missing {} in {}", name, stdout);
    }
}

#[test]
fn test_cli_list_includes_workflows_dir() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "mastodon.yaml",
        &simple_workflow("mastodon", "Published"),
    );

    let output = cli_command(dir.path())
        .args(["list", "--workflows", "."])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mastodon"));
    assert!(stdout.contains("youtube"));
}

#[test]
fn test_cli_validate_builtins() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("validate").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("6 workflow(s) validated"));
}

#[test]
fn test_cli_validate_rejects_invalid_workflow() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "broken.yaml",
        r#"
name: broken
steps:
  - id: type
    wait: { element_exists: { css: textarea } }
    action: { type_text: { text: "{undefined}" } }
success: { text_contains: Done }
"#,
    );

    let output = cli_command(dir.path())
        .args(["validate", "broken.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid workflow"));
    assert!(stderr.contains("undefined"));
}

#[test]
fn test_cli_show() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["show", "youtube"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: youtube"));
    assert!(stdout.contains("not-for-kids-radio"));
}

#[test]
fn test_cli_show_unknown_platform() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["show", "myspace"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown platform: myspace"));
}

#[test]
fn test_cli_dry_run() {
    let dir = create_test_dir();
    write_metadata(dir.path());

    let output = cli_command(dir.path())
        .args([
            "run",
            "--platform",
            "x",
            "--platform",
            "linkedin",
            "--metadata",
            "post.txt",
            "--video",
            "clip.mp4",
            "--dry-run",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== x ==="));
    assert!(stdout.contains("=== linkedin ==="));
    assert!(stdout.contains("T\n\nD\n\n#x"));
    assert!(stdout.find("=== x ===") < stdout.find("=== linkedin ==="));
}

#[test]
fn test_cli_dry_run_json_from_config() {
    let dir = create_test_dir();
    write_metadata(dir.path());
    write_runner_config(
        dir.path(),
        r#"
platforms: [tiktok]
payload:
  metadata: post.txt
  video: clip.mp4
"#,
    );

    let output = cli_command(dir.path())
        .args(["run", "--dry-run", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["platform"], "tiktok");
    assert_eq!(plans[0]["post"], "T\n\nD\n\n#x");
}

#[test]
fn test_cli_run_unknown_platform() {
    let dir = create_test_dir();
    write_metadata(dir.path());

    let output = cli_command(dir.path())
        .args([
            "run",
            "--platform",
            "myspace",
            "--metadata",
            "post.txt",
            "--video",
            "clip.mp4",
            "--dry-run",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown platform: myspace"));
}

#[test]
fn test_cli_run_without_metadata() {
    let dir = create_test_dir();

    let output = cli_command(dir.path())
        .args(["run", "--platform", "x", "--video", "clip.mp4"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No metadata file given"));
}

#[test]
fn test_cli_run_missing_video() {
    let dir = create_test_dir();
    write_metadata(dir.path());

    let output = cli_command(dir.path())
        .args([
            "run",
            "--platform",
            "x",
            "--metadata",
            "post.txt",
            "--video",
            "missing.mp4",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Video file not found"));
}
