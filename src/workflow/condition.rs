//! Wait conditions
//!
//! A wait condition is one predicate over page state plus the time budget
//! for observing it:
//!
//! ```yaml
//! wait:
//!   element_interactable: { xpath: "//span[text()='Post']" }
//!   timeout: 20s
//!   poll_interval: 250ms
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration::human_option;
use super::locator::Locator;

/// Default time budget for a wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default pause between predicate evaluations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A predicate over session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// An element matching the locator exists
    ElementExists(Locator),
    /// An element matching the locator exists, is visible and enabled
    ElementInteractable(Locator),
    /// No element matches the locator
    ElementAbsent(Locator),
    /// The rendered page text contains the substring
    TextContains(String),
    /// The current URL matches the regular expression
    UrlMatches(String),
    /// The current URL contains the substring
    UrlContains(String),
    /// A fixed delay has passed; only for pages that expose no better signal
    Elapsed(Duration),
}

impl Predicate {
    /// Locator this predicate targets, if any
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Predicate::ElementExists(l)
            | Predicate::ElementInteractable(l)
            | Predicate::ElementAbsent(l) => Some(l),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Predicate::ElementExists(l) => format!("element {} exists", l),
            Predicate::ElementInteractable(l) => format!("element {} is interactable", l),
            Predicate::ElementAbsent(l) => format!("element {} is absent", l),
            Predicate::TextContains(s) => format!("page text contains '{}'", s),
            Predicate::UrlMatches(p) => format!("url matches /{}/", p),
            Predicate::UrlContains(s) => format!("url contains '{}'", s),
            Predicate::Elapsed(d) => format!("{:?} elapsed", d),
        }
    }
}

/// A timeout-bounded predicate over page/session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConditionSpec", into = "ConditionSpec")]
pub struct WaitCondition {
    pub predicate: Predicate,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitCondition {
    pub fn new(predicate: Predicate) -> Self {
        let timeout = match &predicate {
            Predicate::Elapsed(d) => *d + DEFAULT_POLL_INTERVAL,
            _ => DEFAULT_TIMEOUT,
        };
        Self {
            predicate,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn element_exists(locator: Locator) -> Self {
        Self::new(Predicate::ElementExists(locator))
    }

    pub fn element_interactable(locator: Locator) -> Self {
        Self::new(Predicate::ElementInteractable(locator))
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        Self::new(Predicate::TextContains(text.into()))
    }

    pub fn url_contains(text: impl Into<String>) -> Self {
        Self::new(Predicate::UrlContains(text.into()))
    }

    pub fn elapsed(duration: Duration) -> Self {
        Self::new(Predicate::Elapsed(duration))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn describe(&self) -> String {
        format!("{} (within {:?})", self.predicate.describe(), self.timeout)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    element_exists: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    element_interactable: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    element_absent: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_contains: Option<String>,
    #[serde(default, with = "human_option", skip_serializing_if = "Option::is_none")]
    elapsed: Option<Duration>,
    #[serde(default, with = "human_option", skip_serializing_if = "Option::is_none")]
    timeout: Option<Duration>,
    #[serde(default, with = "human_option", skip_serializing_if = "Option::is_none")]
    poll_interval: Option<Duration>,
}

impl TryFrom<ConditionSpec> for WaitCondition {
    type Error = String;

    fn try_from(spec: ConditionSpec) -> Result<Self, Self::Error> {
        let candidates = [
            spec.element_exists.map(Predicate::ElementExists),
            spec.element_interactable.map(Predicate::ElementInteractable),
            spec.element_absent.map(Predicate::ElementAbsent),
            spec.text_contains.map(Predicate::TextContains),
            spec.url_matches.map(Predicate::UrlMatches),
            spec.url_contains.map(Predicate::UrlContains),
            spec.elapsed.map(Predicate::Elapsed),
        ];

        let mut chosen = candidates.into_iter().flatten();
        let predicate = chosen.next().ok_or_else(|| {
            "wait condition needs one predicate (element_exists, element_interactable, \
             element_absent, text_contains, url_matches, url_contains, elapsed)"
                .to_string()
        })?;
        if let Some(extra) = chosen.next() {
            return Err(format!(
                "wait condition has more than one predicate: {} and {}",
                predicate.describe(),
                extra.describe()
            ));
        }

        if let Predicate::UrlMatches(pattern) = &predicate {
            regex::Regex::new(pattern)
                .map_err(|e| format!("invalid url pattern '{}': {}", pattern, e))?;
        }

        let mut condition = WaitCondition::new(predicate);
        if let Some(poll_interval) = spec.poll_interval {
            if poll_interval.is_zero() {
                return Err("poll_interval must be greater than zero".to_string());
            }
            condition.poll_interval = poll_interval;
        }
        if let Some(timeout) = spec.timeout {
            condition.timeout = timeout;
        } else if let Predicate::Elapsed(d) = &condition.predicate {
            condition.timeout = *d + condition.poll_interval;
        }

        if let Predicate::Elapsed(d) = &condition.predicate {
            if condition.timeout < *d {
                return Err(format!(
                    "elapsed {:?} can never hold within timeout {:?}",
                    d, condition.timeout
                ));
            }
        }

        Ok(condition)
    }
}

impl From<WaitCondition> for ConditionSpec {
    fn from(condition: WaitCondition) -> Self {
        let mut spec = ConditionSpec {
            timeout: Some(condition.timeout),
            poll_interval: Some(condition.poll_interval),
            ..Default::default()
        };
        match condition.predicate {
            Predicate::ElementExists(l) => spec.element_exists = Some(l),
            Predicate::ElementInteractable(l) => spec.element_interactable = Some(l),
            Predicate::ElementAbsent(l) => spec.element_absent = Some(l),
            Predicate::TextContains(s) => spec.text_contains = Some(s),
            Predicate::UrlMatches(p) => spec.url_matches = Some(p),
            Predicate::UrlContains(s) => spec.url_contains = Some(s),
            Predicate::Elapsed(d) => spec.elapsed = Some(d),
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let cond: WaitCondition =
            serde_yaml::from_str("element_exists: { xpath: \"//input[@type='file']\" }").unwrap();
        assert_eq!(
            cond.predicate,
            Predicate::ElementExists(Locator::xpath("//input[@type='file']"))
        );
        assert_eq!(cond.timeout, DEFAULT_TIMEOUT);
        assert_eq!(cond.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_deserialize_with_timing() {
        let yaml = r#"
text_contains: "Your reel has been shared."
timeout: 2m
poll_interval: 1s
"#;
        let cond: WaitCondition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cond.predicate,
            Predicate::TextContains("Your reel has been shared.".to_string())
        );
        assert_eq!(cond.timeout, Duration::from_secs(120));
        assert_eq!(cond.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_elapsed_gets_room_to_hold() {
        let cond: WaitCondition = serde_yaml::from_str("elapsed: 10s").unwrap();
        assert_eq!(cond.predicate, Predicate::Elapsed(Duration::from_secs(10)));
        assert!(cond.timeout >= Duration::from_secs(10));

        let err = serde_yaml::from_str::<WaitCondition>("{ elapsed: 10s, timeout: 5s }");
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_ambiguous_or_empty() {
        assert!(serde_yaml::from_str::<WaitCondition>("timeout: 5s").is_err());
        assert!(serde_yaml::from_str::<WaitCondition>(
            "{ text_contains: a, url_contains: b }"
        )
        .is_err());
        assert!(serde_yaml::from_str::<WaitCondition>("url_matches: \"(unclosed\"").is_err());
        assert!(serde_yaml::from_str::<WaitCondition>(
            "{ text_contains: a, poll_interval: 0 }"
        )
        .is_err());
    }

    #[test]
    fn test_predicate_locator() {
        let l = Locator::id("next-button");
        assert_eq!(Predicate::ElementInteractable(l.clone()).locator(), Some(&l));
        assert_eq!(Predicate::TextContains("x".into()).locator(), None);
    }
}
