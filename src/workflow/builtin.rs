//! Built-in destination workflows
//!
//! The definitions live as YAML under `workflows/` and are embedded at build
//! time. A `workflows_dir` in runner.yaml can add to or replace them by name.

use super::loader::{LoadError, WorkflowLoader};
use super::Workflow;

const BUILTIN: &[(&str, &str)] = &[
    ("x", include_str!("../../workflows/x.yaml")),
    ("linkedin", include_str!("../../workflows/linkedin.yaml")),
    ("instagram", include_str!("../../workflows/instagram.yaml")),
    ("tiktok", include_str!("../../workflows/tiktok.yaml")),
    ("snapchat", include_str!("../../workflows/snapchat.yaml")),
    ("youtube", include_str!("../../workflows/youtube.yaml")),
];

/// Names of the built-in destinations
pub fn names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(name, _)| *name).collect()
}

/// Load one built-in destination, `None` if there is no such destination
pub fn builtin(name: &str) -> Option<Result<Workflow, LoadError>> {
    BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(n, source)| WorkflowLoader::load_str(&format!("builtin:{}", n), source))
}

/// Load every built-in destination
pub fn all() -> Result<Vec<Workflow>, LoadError> {
    BUILTIN
        .iter()
        .map(|(n, source)| WorkflowLoader::load_str(&format!("builtin:{}", n), source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Action, ExtractSource, FailurePolicy, Predicate};

    #[test]
    fn test_all_builtins_load() {
        let workflows = all().unwrap();
        assert_eq!(workflows.len(), 6);
        for (workflow, name) in workflows.iter().zip(names()) {
            assert_eq!(workflow.name, name);
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin("myspace").is_none());
    }

    #[test]
    fn test_x_truncates() {
        let x = builtin("x").unwrap().unwrap();
        assert_eq!(x.compose.max_chars, Some(280));
        assert!(x.result.is_none());
    }

    #[test]
    fn test_instagram() {
        let instagram = builtin("instagram").unwrap().unwrap();
        assert!(instagram.compose.strip_non_bmp);
        assert_eq!(
            instagram.success.predicate,
            Predicate::TextContains("Your reel has been shared.".to_string())
        );
        assert!(matches!(
            instagram.result.as_ref().unwrap().from,
            ExtractSource::Attribute { .. }
        ));
    }

    #[test]
    fn test_tiktok_caption_fallback() {
        let tiktok = builtin("tiktok").unwrap().unwrap();
        let caption = tiktok.find_step("enter-caption").unwrap();
        let alt = caption.fallback().unwrap();
        assert!(matches!(alt.action, Some(Action::RunScript { .. })));

        let uploaded = tiktok.find_step("wait-uploaded").unwrap();
        assert!(uploaded.action.is_none());
        assert!(uploaded.wait.is_some());
    }

    #[test]
    fn test_youtube() {
        let youtube = builtin("youtube").unwrap().unwrap();

        let capture = youtube.find_step("read-channel").unwrap();
        assert!(matches!(
            capture.action,
            Some(Action::Capture { ref name, .. }) if name == "channel_id"
        ));

        let kids = youtube.find_step("not-for-kids").unwrap();
        assert!(matches!(kids.on_failure, FailurePolicy::Fallback(_)));

        let description = youtube.find_step("enter-description").unwrap();
        assert_eq!(description.element_locator().unwrap().position(), 1);

        let result = youtube.result.as_ref().unwrap();
        assert_eq!(
            result.format.as_deref(),
            Some("https://www.youtube.com/watch?v=$1")
        );
    }

    #[test]
    fn test_youtube_publish_must_be_confirmed() {
        let youtube = builtin("youtube").unwrap().unwrap();

        for id in ["done", "wait-published"] {
            assert_eq!(youtube.find_step(id).unwrap().on_failure, FailurePolicy::Abort, "{}", id);
        }
        let ids: Vec<_> = youtube.steps.iter().map(|s| s.id.as_str()).collect();
        let published = ids.iter().position(|id| *id == "wait-published").unwrap();
        let shorts = ids.iter().position(|id| *id == "open-shorts").unwrap();
        assert!(published < shorts);

        assert_eq!(
            youtube.success.predicate,
            Predicate::UrlContains("/videos/short".to_string())
        );
    }
}
