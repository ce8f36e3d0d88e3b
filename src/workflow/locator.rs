//! Element locators
//!
//! A locator names exactly one strategy and its selector, optionally picking
//! the n-th match when several elements qualify:
//!
//! ```yaml
//! locator: { xpath: "//input[@type='file']" }
//! locator: { id: textbox, index: 1 }
//! locator: { text: Next }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a selector string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    XPath,
    Css,
    Id,
    Name,
    Tag,
    /// Exact visible text
    Text,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::XPath => "xpath",
            Strategy::Css => "css",
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::Tag => "tag",
            Strategy::Text => "text",
        }
    }
}

/// A rule identifying one element on a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LocatorSpec", into = "LocatorSpec")]
pub struct Locator {
    pub strategy: Strategy,
    pub selector: String,
    /// Pick the n-th match instead of the first
    pub index: Option<usize>,
}

impl Locator {
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
            index: None,
        }
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, selector)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Id, selector)
    }

    pub fn text(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Text, selector)
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Position among all matches this locator resolves to
    pub fn position(&self) -> usize {
        self.index.unwrap_or(0)
    }

    /// Render as a Playwright selector engine string
    pub fn to_playwright_selector(&self) -> String {
        match self.strategy {
            Strategy::XPath => format!("xpath={}", self.selector),
            Strategy::Css => format!("css={}", self.selector),
            Strategy::Id => format!("css=[id=\"{}\"]", self.selector),
            Strategy::Name => format!("css=[name=\"{}\"]", self.selector),
            Strategy::Tag => format!("css={}", self.selector),
            Strategy::Text => format!("text=\"{}\"", self.selector),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy.as_str(), self.selector)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

/// Wire form: one populated strategy key plus an optional index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocatorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

impl TryFrom<LocatorSpec> for Locator {
    type Error = String;

    fn try_from(spec: LocatorSpec) -> Result<Self, Self::Error> {
        let candidates = [
            (Strategy::XPath, spec.xpath),
            (Strategy::Css, spec.css),
            (Strategy::Id, spec.id),
            (Strategy::Name, spec.name),
            (Strategy::Tag, spec.tag),
            (Strategy::Text, spec.text),
        ];

        let mut chosen = candidates
            .into_iter()
            .filter_map(|(strategy, selector)| selector.map(|s| (strategy, s)));

        let (strategy, selector) = chosen
            .next()
            .ok_or_else(|| "locator needs one of xpath, css, id, name, tag, text".to_string())?;

        if chosen.next().is_some() {
            return Err(format!(
                "locator '{}' names more than one strategy",
                selector
            ));
        }

        if selector.trim().is_empty() {
            return Err(format!("{} locator has an empty selector", strategy.as_str()));
        }

        Ok(Locator {
            strategy,
            selector,
            index: spec.index,
        })
    }
}

impl From<Locator> for LocatorSpec {
    fn from(locator: Locator) -> Self {
        let mut spec = LocatorSpec {
            index: locator.index,
            ..Default::default()
        };
        let selector = Some(locator.selector);
        match locator.strategy {
            Strategy::XPath => spec.xpath = selector,
            Strategy::Css => spec.css = selector,
            Strategy::Id => spec.id = selector,
            Strategy::Name => spec.name = selector,
            Strategy::Tag => spec.tag = selector,
            Strategy::Text => spec.text = selector,
        }
        spec
    }
}
