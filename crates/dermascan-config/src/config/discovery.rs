use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, DermaError};
use crate::types::ConfigSource;

use super::{
    AnalysisConfig, CliArgs, Config, HealthConfig, LoggingConfig, ServerConfig, TrainingDefaults,
};

/// Environment variable pointing at a directory that holds `config.toml`
pub const HOME_ENV_VAR: &str = "DERMASCAN_HOME";

/// Directory searched for upward from the working directory
pub const CONFIG_DIR_NAME: &str = ".dermascan";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Keys tracked for source attribution, all starting out as defaults
pub(crate) const ATTRIBUTED_KEYS: &[&str] = &[
    "base_url",
    "health_primary_path",
    "health_fallback_path",
    "health_timeout_secs",
    "analysis_timeout_secs",
    "inter_request_delay_ms",
    "max_retries",
    "training_timeout_secs",
    "poll_interval_ms",
    "epochs",
    "batch_size",
    "model_type",
    "verbose",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    server: Option<ServerConfig>,
    health: Option<HealthConfig>,
    analysis: Option<AnalysisConfig>,
    training: Option<TrainingDefaults>,
    logging: Option<LoggingConfig>,
}

/// Overwrite `target` when `value` is set, recording where it came from.
fn apply<T>(
    target: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if value.is_some() {
        *target = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for the upward search.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Path-driven variant used by tests to avoid depending on the process CWD.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Config::default();
        for key in ATTRIBUTED_KEYS {
            config
                .source_attribution
                .insert((*key).to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(DermaError::Config(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    })
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
        }

        config.apply_cli(cli_args);
        config.validate()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let source = ConfigSource::Config;
        let attribution = &mut self.source_attribution;

        if let Some(server) = file.server {
            apply(&mut self.server.base_url, server.base_url, "base_url", &source, attribution);
        }

        if let Some(health) = file.health {
            apply(
                &mut self.health.primary_path,
                health.primary_path,
                "health_primary_path",
                &source,
                attribution,
            );
            apply(
                &mut self.health.fallback_path,
                health.fallback_path,
                "health_fallback_path",
                &source,
                attribution,
            );
            apply(
                &mut self.health.timeout_secs,
                health.timeout_secs,
                "health_timeout_secs",
                &source,
                attribution,
            );
        }

        if let Some(analysis) = file.analysis {
            apply(
                &mut self.analysis.timeout_secs,
                analysis.timeout_secs,
                "analysis_timeout_secs",
                &source,
                attribution,
            );
            apply(
                &mut self.analysis.inter_request_delay_ms,
                analysis.inter_request_delay_ms,
                "inter_request_delay_ms",
                &source,
                attribution,
            );
            apply(
                &mut self.analysis.max_retries,
                analysis.max_retries,
                "max_retries",
                &source,
                attribution,
            );
        }

        if let Some(training) = file.training {
            apply(
                &mut self.training.timeout_secs,
                training.timeout_secs,
                "training_timeout_secs",
                &source,
                attribution,
            );
            apply(
                &mut self.training.poll_interval_ms,
                training.poll_interval_ms,
                "poll_interval_ms",
                &source,
                attribution,
            );
            apply(&mut self.training.epochs, training.epochs, "epochs", &source, attribution);
            apply(
                &mut self.training.batch_size,
                training.batch_size,
                "batch_size",
                &source,
                attribution,
            );
            apply(
                &mut self.training.model_type,
                training.model_type,
                "model_type",
                &source,
                attribution,
            );
        }

        if let Some(logging) = file.logging {
            apply(&mut self.logging.verbose, logging.verbose, "verbose", &source, attribution);
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let source = ConfigSource::Cli;
        let attribution = &mut self.source_attribution;

        apply(
            &mut self.server.base_url,
            cli.base_url.clone(),
            "base_url",
            &source,
            attribution,
        );
        apply(&mut self.logging.verbose, cli.verbose, "verbose", &source, attribution);
        apply(&mut self.training.epochs, cli.epochs, "epochs", &source, attribution);
        apply(
            &mut self.training.batch_size,
            cli.batch_size,
            "batch_size",
            &source,
            attribution,
        );
        apply(
            &mut self.training.model_type,
            cli.model_type.clone(),
            "model_type",
            &source,
            attribution,
        );
    }

    /// Locate a config file without reading it.
    ///
    /// `$DERMASCAN_HOME/config.toml` wins over the upward search.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV_VAR) {
            let candidate = PathBuf::from(home).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: TomlConfig = toml::from_str(&content).map_err(|e| {
            DermaError::Config(ConfigError::InvalidFile(format!(
                "{}: {}",
                path.display(),
                e.message()
            )))
        })?;
        Ok(parsed)
    }
}
