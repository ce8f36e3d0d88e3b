//! Workflow and step definitions
//!
//! A workflow is the declarative description of one publishing destination:
//! an ordered list of steps, the success marker that proves publication, and
//! an optional rule for reading back the published identifier.

use serde::{Deserialize, Serialize};
use serde_yaml::with::singleton_map_recursive;
use std::time::Duration;

use super::condition::WaitCondition;
use super::duration::{human, human_option};
use super::locator::Locator;
use super::template::{ComposeSettings, DEFAULT_POST_TEMPLATE};

// ============================================================================
// Workflow
// ============================================================================

/// Ordered steps plus a success marker for one publishing destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Destination name (e.g. "x", "youtube")
    pub name: String,

    /// Human-readable summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template for the composed post text, also available as `{post}`
    #[serde(default = "default_post_template")]
    pub post_template: String,

    /// Length limit and character filtering for composed text
    #[serde(default)]
    pub compose: ComposeSettings,

    /// Steps to execute, strictly in order
    pub steps: Vec<WorkflowStep>,

    /// Condition whose satisfaction defines the run as published
    pub success: WaitCondition,

    /// Best-effort rule for reading back the published identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Extraction>,
}

fn default_post_template() -> String {
    DEFAULT_POST_TEMPLATE.to_string()
}

impl Workflow {
    /// Look up a step by id, including fallback steps
    pub fn find_step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find_map(|step| step.find(id))
    }
}

// ============================================================================
// Step
// ============================================================================

/// One UI interaction: wait, act, verify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Identifier reported in results
    pub id: String,

    /// Step name (for logging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Readiness condition evaluated before acting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitCondition>,

    /// Element to act on; defaults to the wait condition's locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Locator>,

    /// Interaction to perform; a step without one only waits
    #[serde(default, with = "singleton_map_recursive", skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// Condition that must hold after the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<WaitCondition>,

    /// How a failed wait/action is handled
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub on_failure: FailurePolicy,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            wait: None,
            target: None,
            action: None,
            verify: None,
            on_failure: FailurePolicy::Abort,
        }
    }

    pub fn wait(mut self, condition: WaitCondition) -> Self {
        self.wait = Some(condition);
        self
    }

    pub fn target(mut self, locator: Locator) -> Self {
        self.target = Some(locator);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn verify(mut self, condition: WaitCondition) -> Self {
        self.verify = Some(condition);
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Element the action applies to
    pub fn element_locator(&self) -> Option<&Locator> {
        self.target
            .as_ref()
            .or_else(|| self.wait.as_ref().and_then(|w| w.predicate.locator()))
    }

    /// Fallback step attached to this step's policy
    pub fn fallback(&self) -> Option<&WorkflowStep> {
        match &self.on_failure {
            FailurePolicy::Fallback(step) => Some(step),
            _ => None,
        }
    }

    fn find(&self, id: &str) -> Option<&WorkflowStep> {
        if self.id == id {
            return Some(self);
        }
        self.fallback().and_then(|f| f.find(id))
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Interaction performed by a step
///
/// Written as a bare name (`click`) or a single-key map
/// (`{ navigate: { url: ... } }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Load a URL (templated)
    Navigate { url: String },

    /// Click the step's element
    Click,

    /// Type templated text into the step's element
    TypeText {
        text: String,
        #[serde(default)]
        clear: bool,
    },

    /// Compose the post text and type it into the step's element
    ComposeText {
        /// Overrides the workflow's post template
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },

    /// Set a local file path on the step's file input
    UploadFile {
        /// Templated path; defaults to the payload's file
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Run a script against the page
    RunScript {
        script: String,
        #[serde(default)]
        args: Vec<ScriptArg>,
    },

    /// Read a value from the page and keep it for later templates
    Capture { name: String, extract: Extraction },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click => "click",
            Action::TypeText { .. } => "type_text",
            Action::ComposeText { .. } => "compose_text",
            Action::UploadFile { .. } => "upload_file",
            Action::RunScript { .. } => "run_script",
            Action::Capture { .. } => "capture",
        }
    }

    /// Whether the action needs the step's element
    pub fn needs_element(&self) -> bool {
        match self {
            Action::Click
            | Action::TypeText { .. }
            | Action::ComposeText { .. }
            | Action::UploadFile { .. } => true,
            Action::RunScript { args, .. } => args.iter().any(|a| matches!(a, ScriptArg::Element)),
            Action::Navigate { .. } | Action::Capture { .. } => false,
        }
    }
}

/// Argument handed to a page script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptArg {
    /// The step's element
    Element,
    /// Templated text
    Text(String),
}

// ============================================================================
// Extraction
// ============================================================================

/// Where an extracted value is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractSource {
    /// The page's current URL
    CurrentUrl,
    /// An attribute of an element
    Attribute { locator: Locator, name: String },
    /// The string value returned by a script
    Script(String),
}

/// Rule for deriving a value from page state
///
/// ```yaml
/// result:
///   from: { attribute: { locator: { css: "ytcp-video-row a" }, name: href } }
///   pattern: "/video/([^/]+)/"
///   format: "https://www.youtube.com/watch?v=$1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(with = "singleton_map_recursive")]
    pub from: ExtractSource,

    /// Regex applied to the raw value; no match means nothing was extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Output built from the pattern's captures (`$1`, `${name}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

// ============================================================================
// Failure policy
// ============================================================================

/// Per-step rule governing how a failed wait/action is handled
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the workflow and report the failure
    #[default]
    Abort,
    /// Log and proceed to the next step
    #[serde(rename = "continue")]
    ContinueDegraded,
    /// Re-run the step with increasing delay
    Retry(RetryPolicy),
    /// Run an alternate step once; its outcome becomes this step's outcome
    Fallback(Box<WorkflowStep>),
}

/// Retry settings for a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Re-runs after the first attempt
    pub max_retries: u32,

    /// Delay before the first re-run, doubled for each later one
    #[serde(default = "default_backoff", with = "human")]
    pub backoff: Duration,

    /// Cap for the doubled delay
    #[serde(default, with = "human_option", skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<Duration>,
}

fn default_backoff() -> Duration {
    Duration::from_secs(1)
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
            max_backoff: None,
        }
    }

    /// Delay before the given re-run (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        let delay = self
            .backoff
            .checked_mul(1u32 << shift)
            .unwrap_or(Duration::MAX);
        match self.max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}
