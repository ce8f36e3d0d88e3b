//! Runner configuration
//!
//! Configuration for a publishing run, loaded from runner.yaml:
//!
//! ```yaml
//! platforms: [x, linkedin, youtube]
//! workflows_dir: ./workflows
//! parallel: 1
//!
//! payload:
//!   metadata: ./post.txt
//!   video: ./clip.mp4
//!
//! session:
//!   playwright:
//!     browser: chromium
//!     headless: false
//!     profile_dir: ~/.config/upload-actions/profile
//!     profile_dirs:
//!       youtube: ~/.config/upload-actions/youtube
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::loader::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Platforms to publish to, in order
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Directory whose workflow files add to or replace the built-in ones
    #[serde(default)]
    pub workflows_dir: Option<PathBuf>,

    #[serde(default)]
    pub payload: PayloadConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Max concurrent platform runs; 1 runs them in order on one session
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PayloadConfig {
    /// Text file holding title, description and tags
    pub metadata: Option<PathBuf>,

    /// Video file to upload
    pub video: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub playwright: PlaywrightConfig,
}

/// Playwright page server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    /// Page server script run under node
    #[serde(default = "default_server_script")]
    pub server_script: PathBuf,

    /// Browser to use
    #[serde(default)]
    pub browser: BrowserType,

    /// Run in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Persistent profile holding the logged-in sessions
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    /// Per-platform profile overrides
    #[serde(default)]
    pub profile_dirs: HashMap<String, PathBuf>,

    #[serde(default = "default_node")]
    pub node: String,
}

/// Browser types supported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

fn default_parallel() -> usize {
    1
}

fn default_server_script() -> PathBuf {
    PathBuf::from("extensions/playwright/server.js")
}

fn default_headless() -> bool {
    // logged-in profiles are usually set up in a visible browser
    false
}

fn default_node() -> String {
    "node".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            workflows_dir: None,
            payload: PayloadConfig::default(),
            session: SessionConfig::default(),
            parallel: default_parallel(),
        }
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            server_script: default_server_script(),
            browser: BrowserType::default(),
            headless: default_headless(),
            profile_dir: None,
            profile_dirs: HashMap::new(),
            node: default_node(),
        }
    }
}

impl PlaywrightConfig {
    /// Profile directory for one platform, falling back to the shared one
    pub fn profile_for(&self, platform: &str) -> Option<&Path> {
        self.profile_dirs
            .get(platform)
            .or(self.profile_dir.as_ref())
            .map(|p| p.as_path())
    }
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: RunnerConfig =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;
        Ok(config)
    }

    /// Whether platforms get their own sessions
    pub fn is_isolated(&self) -> bool {
        self.parallel > 1
    }
}
