//! Health status levels shared by subsystems and the overall monitor

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Severity of a subsystem or of the whole process.
///
/// Variants are declared in increasing severity, so `Ord` compares them by
/// how bad they are: `Good < Warn < Bad`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Fully usable.
    #[default]
    Good,
    /// Usable, but having problems.
    Warn,
    /// Completely unusable.
    Bad,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Good => "good",
            StatusLevel::Warn => "warn",
            StatusLevel::Bad => "bad",
        }
    }

    pub fn is_good(&self) -> bool {
        *self == StatusLevel::Good
    }
}

impl std::fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for StatusLevel {
    fn from(healthy: bool) -> Self {
        if healthy {
            StatusLevel::Good
        } else {
            StatusLevel::Bad
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status level: {0}")]
pub struct ParseStatusError(String);

impl FromStr for StatusLevel {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(StatusLevel::Good),
            "warn" => Ok(StatusLevel::Warn),
            "bad" => Ok(StatusLevel::Bad),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(StatusLevel::Good < StatusLevel::Warn);
        assert!(StatusLevel::Warn < StatusLevel::Bad);
        assert_eq!(
            [StatusLevel::Warn, StatusLevel::Bad, StatusLevel::Good].iter().max(),
            Some(&StatusLevel::Bad)
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StatusLevel::Good.to_string(), "good");
        assert_eq!(StatusLevel::Warn.to_string(), "warn");
        assert_eq!(StatusLevel::Bad.to_string(), "bad");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&StatusLevel::Warn).unwrap(), "\"warn\"");
        let parsed: StatusLevel = serde_json::from_str("\"bad\"").unwrap();
        assert_eq!(parsed, StatusLevel::Bad);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Good".parse::<StatusLevel>().unwrap(), StatusLevel::Good);
        assert_eq!(" warn ".parse::<StatusLevel>().unwrap(), StatusLevel::Warn);
        assert!("unknown".parse::<StatusLevel>().is_err());
    }

    #[test]
    fn test_status_from_bool() {
        assert_eq!(StatusLevel::from(true), StatusLevel::Good);
        assert_eq!(StatusLevel::from(false), StatusLevel::Bad);
    }
}
