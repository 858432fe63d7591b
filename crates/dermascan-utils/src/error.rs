use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::FailureKind;

/// Library-level error type with user-facing reporting.
///
/// `DermaError` is the error returned at the boundary of dermascan operations.
/// Every variant maps to a [`FailureKind`] and to a CLI exit code, so callers
/// never have to inspect raw transport errors.
///
/// # Error Categories
///
/// | Variant | Kind | Description |
/// |---------|------|-------------|
/// | `Config` | Validation | Configuration file or CLI argument errors |
/// | `Validation` | Validation | Malformed caller input, rejected before any network call |
/// | `Connection` | Connection | Pre-flight health gate failed |
/// | `Gateway` | Transport / Remote | A single gateway call failed |
/// | `TrainingFailed` | Remote | Training job reached the `Failed` terminal state |
/// | `PartialBatch` | Remote | Some records in a batch failed |
/// | `Io` | Transport | Local file access failed |
///
/// # Example
///
/// ```rust
/// use dermascan_utils::error::{DermaError, ValidationError};
/// use dermascan_utils::exit_codes::ExitCode;
///
/// let err = DermaError::from(ValidationError::new("epochs", "must be greater than 0"));
/// assert_eq!(err.to_exit_code(), ExitCode::VALIDATION);
/// ```
#[derive(Error, Debug)]
pub enum DermaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Training job {task_id} failed: {message}")]
    TrainingFailed { task_id: String, message: String },

    #[error("Batch finished with {failed} failed record(s) out of {total}")]
    PartialBatch { failed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DermaError {
    /// Failure kind used for reporting and exit-code mapping.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::Validation(_) => FailureKind::Validation,
            Self::Connection(_) => FailureKind::Connection,
            Self::Gateway(e) => e.kind(),
            Self::TrainingFailed { .. } | Self::PartialBatch { .. } => FailureKind::Remote,
            Self::Io(_) => FailureKind::Transport,
        }
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Connectivity,
    RemoteService,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::Connectivity => write!(f, "Connectivity"),
            Self::RemoteService => write!(f, "Remote Service"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

/// Malformed caller input, rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single gateway call.
///
/// Transport-level problems (`Transport`, `Timeout`) and application-level
/// rejections (`Remote`) are kept apart so the caller can report them, but
/// call sites treat both identically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network failure: connection refused, DNS, reset, unreadable body
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request exceeded its bounded wait
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// The service answered but rejected the request
    #[error("Remote failure: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// The gateway could not be constructed or addressed
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl GatewayError {
    /// Shorthand for an application-level rejection without an HTTP status.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Remote { .. } => FailureKind::Remote,
            Self::Transport(_) | Self::Timeout { .. } | Self::Misconfiguration(_) => {
                FailureKind::Transport
            }
        }
    }

    /// Human-readable message without the variant prefix.
    ///
    /// This is what gets recorded on a failed image record.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Transport(msg) | Self::Misconfiguration(msg) => msg.clone(),
            Self::Timeout { duration } => {
                format!("request timed out after {}s", duration.as_secs())
            }
            Self::Remote { message, .. } => message.clone(),
        }
    }
}

impl UserFriendlyError for GatewayError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Could not reach the analysis server: {msg}"),
            Self::Timeout { duration } => {
                format!("The server did not answer within {}s", duration.as_secs())
            }
            Self::Remote {
                status: Some(code),
                message,
            } => format!("The server rejected the request ({code}): {message}"),
            Self::Remote {
                status: None,
                message,
            } => format!("The server rejected the request: {message}"),
            Self::Misconfiguration(msg) => format!("Gateway configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => Some(
                "Transport errors occur when the server is down, unreachable, or overloaded."
                    .to_string(),
            ),
            Self::Remote { .. } => Some(
                "The server processed the request and reported an application-level failure."
                    .to_string(),
            ),
            Self::Misconfiguration(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => vec![
                "Run 'dermascan health' to check connectivity".to_string(),
                "Verify [server] base_url in your configuration".to_string(),
            ],
            Self::Remote { .. } => vec![
                "Check the input (image format, training parameters) and try again".to_string(),
            ],
            Self::Misconfiguration(_) => {
                vec!["Check the [server] section of your configuration".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Remote { .. } => ErrorCategory::RemoteService,
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            Self::Transport(_) | Self::Timeout { .. } => ErrorCategory::Connectivity,
        }
    }
}

impl UserFriendlyError for DermaError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::InvalidValue { key, value }) => {
                format!("Configuration value '{key}' is invalid: {value}")
            }
            Self::Config(e) => e.to_string(),
            Self::Validation(e) => format!("Invalid input: {e}"),
            Self::Connection(msg) => format!("Server unavailable: {msg}"),
            Self::Gateway(e) => e.user_message(),
            Self::TrainingFailed { task_id, message } => {
                format!("Training job '{task_id}' failed: {message}")
            }
            Self::PartialBatch { failed, total } => {
                format!("{failed} of {total} image(s) failed")
            }
            Self::Io(e) => format!("File access failed: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Gateway(e) => e.context(),
            Self::Connection(_) => Some(
                "Both the primary and the fallback health endpoints failed to answer.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Run 'dermascan config' to see effective values and their sources".to_string(),
            ],
            Self::Connection(_) => vec![
                "Start the analysis server and run 'dermascan health' again".to_string(),
                "Use --base-url to point at a different server".to_string(),
            ],
            Self::Gateway(e) => e.suggestions(),
            Self::PartialBatch { .. } => {
                vec!["Re-run the command on the failed files".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Connection(_) => ErrorCategory::Connectivity,
            Self::Gateway(e) => e.category(),
            Self::TrainingFailed { .. } | Self::PartialBatch { .. } => {
                ErrorCategory::RemoteService
            }
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl DermaError {
    /// Multi-line message with context and suggestions, for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("Error [{}]: {}", self.category(), self.user_message());
        if let Some(context) = self.context() {
            out.push_str("\n\n");
            out.push_str(&context);
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for s in suggestions {
                out.push_str("\n  - ");
                out.push_str(&s);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_message_strips_prefix() {
        let err = GatewayError::remote("low image quality");
        assert_eq!(err.message(), "low image quality");
        assert_eq!(err.to_string(), "Remote failure: low image quality");
        assert_eq!(err.kind(), FailureKind::Remote);
    }

    #[test]
    fn timeout_is_a_transport_failure() {
        let err = GatewayError::Timeout {
            duration: Duration::from_secs(30),
        };
        assert_eq!(err.kind(), FailureKind::Transport);
        assert_eq!(err.message(), "request timed out after 30s");
    }

    #[test]
    fn derma_error_kinds() {
        let validation: DermaError = ValidationError::new("image", "empty payload").into();
        assert_eq!(validation.kind(), FailureKind::Validation);

        let connection = DermaError::Connection("unreachable".to_string());
        assert_eq!(connection.kind(), FailureKind::Connection);

        let gateway: DermaError = GatewayError::Transport("refused".to_string()).into();
        assert_eq!(gateway.kind(), FailureKind::Transport);
    }

    #[test]
    fn display_for_user_lists_suggestions() {
        let err = DermaError::Connection("health check failed".to_string());
        let text = err.display_for_user();
        assert!(text.starts_with("Error [Connectivity]: Server unavailable"));
        assert!(text.contains("Suggestions:"));
        assert!(text.contains("dermascan health"));
    }
}
