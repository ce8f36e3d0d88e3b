//! Duration parsing for workflow files
//!
//! Durations may be written as plain integers (milliseconds) or as strings
//! made of number/unit pairs:
//!
//! ```yaml
//! timeout: 20s
//! poll_interval: 250ms
//! backoff: 1m30s
//! delay: 1500
//! ```

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),
}

/// Parse a duration string like "1h30m", "500ms" or "2.5s".
///
/// A trailing number without a unit is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationError::InvalidFormat("empty string".to_string()));
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(c) = chars.peek().copied() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                chars.next();
            } else {
                break;
            }
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek().copied() {
            if c.is_ascii_alphabetic() {
                unit.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if number.is_empty() {
            return Err(DurationError::InvalidFormat(format!(
                "expected number before unit '{}' in '{}'",
                unit, s
            )));
        }

        let num: f64 = number
            .parse()
            .map_err(|_| DurationError::InvalidFormat(format!("invalid number: {}", number)))?;

        let millis = match unit.as_str() {
            "ms" => num,
            "s" | "" => num * 1000.0,
            "m" => num * 60.0 * 1000.0,
            "h" => num * 60.0 * 60.0 * 1000.0,
            "d" => num * 24.0 * 60.0 * 60.0 * 1000.0,
            other => {
                return Err(DurationError::InvalidFormat(format!(
                    "unknown unit '{}'",
                    other
                )))
            }
        };

        total += Duration::from_millis(millis.round() as u64);
    }

    Ok(total)
}

/// Serde adapter: integers are milliseconds, strings go through [`parse_duration`].
pub mod human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(Duration::from_millis(ms)),
            Repr::Text(s) => super::parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Serde adapter for optional durations, same forms as [`human`].
pub mod human_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Millis(ms)) => Ok(Some(Duration::from_millis(ms))),
            Some(Repr::Text(s)) => super::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
