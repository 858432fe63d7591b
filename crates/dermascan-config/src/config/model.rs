use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::ConfigSource;

/// Default address of the analysis server
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default primary health endpoint, relative to the base URL
pub const DEFAULT_HEALTH_PRIMARY_PATH: &str = "/api/health";

/// Default fallback health endpoint, relative to the base URL
pub const DEFAULT_HEALTH_FALLBACK_PATH: &str = "/health";

pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_RETRIES: u32 = 0;
pub const DEFAULT_TRAINING_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_EPOCHS: u32 = 30;
pub const DEFAULT_BATCH_SIZE: u32 = 16;
pub const DEFAULT_MODEL_TYPE: &str = "resnet50";

/// Model architectures the training endpoint accepts
pub const SUPPORTED_MODEL_TYPES: &[&str] = &["resnet50", "efficientnet"];

/// Configuration for dermascan operations.
///
/// Precedence: CLI arguments > config file > built-in defaults. Every section
/// stores `Option`s so the three layers can be merged field by field; use the
/// accessor methods to read resolved values.
///
/// # Discovery
///
/// [`Config::discover()`] looks for a config file in this order:
/// - explicit `--config` path
/// - `$DERMASCAN_HOME/config.toml`
/// - `.dermascan/config.toml`, searching upward from the current directory
///
/// # Configuration File Format
///
/// ```toml
/// [server]
/// base_url = "http://127.0.0.1:5000"
///
/// [health]
/// primary_path = "/api/health"
/// fallback_path = "/health"
/// timeout_secs = 10
///
/// [analysis]
/// timeout_secs = 30
/// inter_request_delay_ms = 500
///
/// [training]
/// poll_interval_ms = 5000
/// epochs = 30
/// batch_size = 16
/// model_type = "resnet50"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub analysis: AnalysisConfig,
    pub training: TrainingDefaults,
    pub logging: LoggingConfig,
    /// Source attribution for each setting (for `dermascan config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    pub primary_path: Option<String>,
    /// Set to an empty string to disable the fallback probe
    pub fallback_path: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    pub timeout_secs: Option<u64>,
    /// Fixed pause between consecutive analyze requests
    pub inter_request_delay_ms: Option<u64>,
    /// Retries for 5xx and network failures on a single request
    pub max_retries: Option<u32>,
}

/// `[training]` section: request timeout, poll cadence, and default job parameters
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingDefaults {
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub epochs: Option<u32>,
    pub batch_size: Option<u32>,
    pub model_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
}

/// CLI arguments that participate in configuration precedence
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub verbose: Option<bool>,
    pub epochs: Option<u32>,
    pub batch_size: Option<u32>,
    pub model_type: Option<String>,
}

impl Config {
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// Absolute URL for a path relative to the base URL
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}/{}", self.base_url(), path)
        }
    }

    #[must_use]
    pub fn health_primary_url(&self) -> String {
        self.endpoint(
            self.health
                .primary_path
                .as_deref()
                .unwrap_or(DEFAULT_HEALTH_PRIMARY_PATH),
        )
    }

    /// `None` when the fallback probe is disabled
    #[must_use]
    pub fn health_fallback_url(&self) -> Option<String> {
        match self.health.fallback_path.as_deref() {
            Some("") => None,
            Some(path) => Some(self.endpoint(path)),
            None => Some(self.endpoint(DEFAULT_HEALTH_FALLBACK_PATH)),
        }
    }

    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(
            self.health
                .timeout_secs
                .unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(
            self.analysis
                .timeout_secs
                .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(
            self.analysis
                .inter_request_delay_ms
                .unwrap_or(DEFAULT_INTER_REQUEST_DELAY_MS),
        )
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.analysis.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn training_timeout(&self) -> Duration {
        Duration::from_secs(
            self.training
                .timeout_secs
                .unwrap_or(DEFAULT_TRAINING_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.training
                .poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn epochs(&self) -> u32 {
        self.training.epochs.unwrap_or(DEFAULT_EPOCHS)
    }

    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.training.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    #[must_use]
    pub fn model_type(&self) -> &str {
        self.training
            .model_type
            .as_deref()
            .unwrap_or(DEFAULT_MODEL_TYPE)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }
}
