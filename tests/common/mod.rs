#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use upload_actions::engine::RecordingObserver;
use upload_actions::workflow::{ExecutionContext, Payload, Workflow, WorkflowLoader};
use upload_actions::SimulatedSession;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write file");
}

pub fn write_runner_config(dir: &Path, content: &str) {
    write_file(dir, "runner.yaml", content);
}

/// Metadata file whose composed post is "T\n\nD\n\n#x"
pub fn write_metadata(dir: &Path) {
    write_file(dir, "post.txt", "T\nD\n#x\n");
}

pub fn payload() -> Arc<Payload> {
    Arc::new(Payload::new("T", "D", "#x", "/videos/clip.mp4"))
}

pub fn workflow(yaml: &str) -> Arc<Workflow> {
    Arc::new(WorkflowLoader::load_str("test.yaml", yaml).expect("Invalid test workflow"))
}

pub fn context(session: &Arc<SimulatedSession>) -> ExecutionContext {
    ExecutionContext::new(payload(), session.clone())
}

pub fn observed_context(
    session: &Arc<SimulatedSession>,
) -> (ExecutionContext, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let ctx = context(session).with_observer(observer.clone());
    (ctx, observer)
}

/// A workflow that opens a page and waits for `marker` in the page text
pub fn simple_workflow(name: &str, marker: &str) -> String {
    format!(
        r#"
name: {name}
steps:
  - id: open
    action: {{ navigate: {{ url: "https://{name}.example/upload" }} }}
success: {{ text_contains: "{marker}", timeout: 5s }}
"#
    )
}

/// Upload page: hidden file input, a textbox and a Post button that
/// reports "Posted" once clicked
pub const UPLOAD_WORKFLOW: &str = r#"
name: demo
steps:
  - id: open
    action: { navigate: { url: "https://demo.example/upload" } }
  - id: select-file
    wait: { element_exists: { xpath: "//input[@type='file']" } }
    action: { upload_file: {} }
  - id: enter-text
    wait: { element_interactable: { css: "div[role=textbox]" } }
    action: { compose_text: {} }
  - id: submit
    wait: { element_interactable: { text: Post } }
    action: click
success:
  text_contains: Posted
  timeout: 10s
"#;
