use crate::error::{ConfigError, DermaError};

use super::{Config, SUPPORTED_MODEL_TYPES};

fn invalid(key: &str, value: impl Into<String>) -> DermaError {
    DermaError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

fn check_range(key: &str, value: Option<u64>, min: u64, max: u64, unit: &str) -> Result<(), DermaError> {
    if let Some(v) = value {
        if v < min {
            return Err(invalid(key, format!("must be at least {min}{unit}")));
        }
        if v > max {
            return Err(invalid(key, format!("exceeds maximum limit of {max}{unit}")));
        }
    }
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), DermaError> {
        if let Some(base_url) = &self.server.base_url
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(invalid(
                "base_url",
                format!("'{base_url}' must start with http:// or https://"),
            ));
        }

        if let Some(path) = &self.health.primary_path
            && path.trim().is_empty()
        {
            return Err(invalid("health_primary_path", "must not be empty"));
        }

        check_range("health_timeout_secs", self.health.timeout_secs, 1, 300, " seconds")?;
        check_range("analysis_timeout_secs", self.analysis.timeout_secs, 1, 300, " seconds")?;
        check_range("training_timeout_secs", self.training.timeout_secs, 1, 300, " seconds")?;
        check_range(
            "inter_request_delay_ms",
            self.analysis.inter_request_delay_ms,
            0,
            60_000,
            " ms",
        )?;
        check_range(
            "poll_interval_ms",
            self.training.poll_interval_ms,
            100,
            600_000,
            " ms",
        )?;
        check_range("max_retries", self.analysis.max_retries.map(u64::from), 0, 5, "")?;
        check_range("epochs", self.training.epochs.map(u64::from), 1, 1000, "")?;
        check_range("batch_size", self.training.batch_size.map(u64::from), 1, 1024, "")?;

        if let Some(model_type) = &self.training.model_type
            && !SUPPORTED_MODEL_TYPES.contains(&model_type.as_str())
        {
            return Err(invalid(
                "model_type",
                format!(
                    "'{}' is not supported. Supported: {}",
                    model_type,
                    SUPPORTED_MODEL_TYPES.join(", ")
                ),
            ));
        }

        Ok(())
    }
}
