//! Small shared types used across the dermascan crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of a configuration value.
///
/// Used for attribution in `dermascan config` output.
///
/// # Serialization
///
/// Serializes to lowercase strings: `"cli"`, `"config"`, `"programmatic"`, `"default"`.
///
/// ```rust
/// use dermascan_utils::types::ConfigSource;
///
/// let json = serde_json::to_string(&ConfigSource::Cli).unwrap();
/// assert_eq!(json, r#""cli""#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

/// Distinguishable failure kind carried by every error that reaches a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed caller input
    Validation,
    /// Pre-flight health gate failed
    Connection,
    /// Network or timeout failure on a gateway call
    Transport,
    /// The remote service signalled an application-level failure
    Remote,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation_error"),
            Self::Connection => write!(f, "connection_error"),
            Self::Transport => write!(f, "transport_error"),
            Self::Remote => write!(f, "remote_failure"),
        }
    }
}
