mod common;

use common::*;
use std::fs;
use upload_actions::prelude::*;
use upload_actions::workflow::FailurePolicy;

#[test]
fn test_load_empty_directory() {
    let dir = create_test_dir();
    let workflows = WorkflowLoader::load_directory(dir.path()).unwrap();
    assert!(workflows.is_empty());
}

#[test]
fn test_load_multiple_workflows_sorted_by_file_name() {
    let dir = create_test_dir();
    write_file(dir.path(), "c.yaml", &simple_workflow("mastodon", "Published"));
    write_file(dir.path(), "a.yaml", &simple_workflow("bluesky", "Posted"));
    write_file(dir.path(), "b.yml", &simple_workflow("threads", "Shared"));

    let workflows = WorkflowLoader::load_directory(dir.path()).unwrap();

    let names: Vec<_> = workflows.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["bluesky", "threads", "mastodon"]);
}

#[test]
fn test_skip_non_workflow_files() {
    let dir = create_test_dir();
    write_file(dir.path(), "bluesky.yaml", &simple_workflow("bluesky", "Posted"));
    write_file(dir.path(), "README.md", "# Workflows");
    write_file(dir.path(), "post.txt", "T\nD\n#x\n");
    write_runner_config(dir.path(), "platforms: [bluesky]");
    write_file(dir.path(), "runner.yml", "parallel: 2");
    fs::create_dir(dir.path().join("drafts")).unwrap();
    write_file(
        &dir.path().join("drafts"),
        "draft.yaml",
        &simple_workflow("draft", "Saved"),
    );

    let workflows = WorkflowLoader::load_directory(dir.path()).unwrap();

    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].name, "bluesky");
}

#[test]
fn test_load_file_not_found() {
    let dir = create_test_dir();
    let err = WorkflowLoader::load_file(&dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn test_load_file_invalid_yaml() {
    let dir = create_test_dir();
    write_file(dir.path(), "bad.yaml", "name: [unclosed");

    let err = WorkflowLoader::load_file(&dir.path().join("bad.yaml")).unwrap_err();
    match err {
        LoadError::Yaml { file, .. } => assert!(file.ends_with("bad.yaml")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_load_file_missing_success_condition() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "no-success.yaml",
        r#"
name: no-success
steps:
  - id: open
    action: { navigate: { url: "https://example.com" } }
"#,
    );

    let err = WorkflowLoader::load_file(&dir.path().join("no-success.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Yaml { .. }));
}

#[test]
fn test_invalid_step_rejected_with_every_problem() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "broken.yaml",
        r#"
name: broken
steps:
  - id: type
    action: { type_text: { text: "{nickname}" } }
success: { text_contains: Done }
"#,
    );

    let err = WorkflowLoader::load_directory(dir.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken.yaml"), "{}", message);
    assert!(message.contains("nickname"), "{}", message);
}

#[test]
fn test_load_workflow_with_all_fields() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "full.yaml",
        r#"
name: full
description: Every field at once
post_template: "{title} - {tags}"
compose:
  max_chars: 100
  strip_non_bmp: true
steps:
  - id: open
    action: { navigate: { url: "https://full.example/new" } }
  - id: caption
    wait:
      element_interactable: { css: "textarea" }
      timeout: 20s
      poll_interval: 250ms
    action: { compose_text: {} }
    verify:
      element_absent: { css: ".error" }
      timeout: 2s
    on_failure: { retry: { max_retries: 2, backoff: 1s } }
  - id: share
    wait: { element_interactable: { text: Share } }
    action: click
    on_failure: continue
success:
  url_contains: "/posts/"
  timeout: 1m
result:
  from: current_url
  pattern: "/posts/([0-9]+)"
"#,
    );

    let workflow = WorkflowLoader::load_file(&dir.path().join("full.yaml")).unwrap();

    assert_eq!(workflow.name, "full");
    assert_eq!(workflow.description.as_deref(), Some("Every field at once"));
    assert_eq!(workflow.post_template, "{title} - {tags}");
    assert_eq!(workflow.compose.max_chars, Some(100));
    assert!(workflow.compose.strip_non_bmp);
    assert_eq!(workflow.steps.len(), 3);
    assert!(workflow.result.is_some());

    let caption = &workflow.steps[1];
    assert_eq!(caption.id, "caption");
    assert!(caption.wait.is_some());
    assert!(caption.verify.is_some());
    assert!(matches!(caption.on_failure, FailurePolicy::Retry(_)));
    assert_eq!(workflow.steps[2].on_failure, FailurePolicy::ContinueDegraded);
}

#[test]
fn test_load_unicode_in_workflow() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "unicode.yaml",
        &simple_workflow("unicode", "Publicación enviada ✓"),
    );

    let workflow = WorkflowLoader::load_file(&dir.path().join("unicode.yaml")).unwrap();
    assert_eq!(workflow.name, "unicode");
}
