use std::time::Duration;

use crate::error::DermaError;
use crate::types::ConfigSource;

use super::Config;
use super::discovery::ATTRIBUTED_KEYS;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding dermascan and you need deterministic behavior
    /// independent of config files and environment variables.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dermascan_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .base_url("http://10.0.0.5:5000")
    ///     .inter_request_delay(Duration::from_millis(250))
    ///     .poll_interval(Duration::from_secs(2))
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.base_url(), "http://10.0.0.5:5000");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for programmatic configuration of dermascan.
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    base_url: Option<String>,
    health_timeout: Option<Duration>,
    fallback_path: Option<String>,
    analysis_timeout: Option<Duration>,
    inter_request_delay: Option<Duration>,
    max_retries: Option<u32>,
    training_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    epochs: Option<u32>,
    batch_size: Option<u32>,
    model_type: Option<String>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = Some(timeout);
        self
    }

    /// Fallback health path; pass `""` to disable the fallback probe.
    #[must_use]
    pub fn health_fallback_path(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn training_timeout(mut self, timeout: Duration) -> Self {
        self.training_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn epochs(mut self, epochs: u32) -> Self {
        self.epochs = Some(epochs);
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    #[must_use]
    pub fn model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build the configuration, validating every value that was set.
    ///
    /// # Errors
    ///
    /// Returns `DermaError::Config` if any value is out of range.
    pub fn build(self) -> Result<Config, DermaError> {
        let mut config = Config::default();
        for key in ATTRIBUTED_KEYS {
            config
                .source_attribution
                .insert((*key).to_string(), ConfigSource::Default);
        }

        let mut mark = |key: &str, set: bool| {
            if set {
                config
                    .source_attribution
                    .insert(key.to_string(), ConfigSource::Programmatic);
            }
        };
        mark("base_url", self.base_url.is_some());
        mark("health_timeout_secs", self.health_timeout.is_some());
        mark("health_fallback_path", self.fallback_path.is_some());
        mark("analysis_timeout_secs", self.analysis_timeout.is_some());
        mark("inter_request_delay_ms", self.inter_request_delay.is_some());
        mark("max_retries", self.max_retries.is_some());
        mark("training_timeout_secs", self.training_timeout.is_some());
        mark("poll_interval_ms", self.poll_interval.is_some());
        mark("epochs", self.epochs.is_some());
        mark("batch_size", self.batch_size.is_some());
        mark("model_type", self.model_type.is_some());
        mark("verbose", self.verbose.is_some());

        config.server.base_url = self.base_url;
        config.health.timeout_secs = self.health_timeout.map(|d| d.as_secs());
        config.health.fallback_path = self.fallback_path;
        config.analysis.timeout_secs = self.analysis_timeout.map(|d| d.as_secs());
        config.analysis.inter_request_delay_ms =
            self.inter_request_delay.map(|d| d.as_millis() as u64);
        config.analysis.max_retries = self.max_retries;
        config.training.timeout_secs = self.training_timeout.map(|d| d.as_secs());
        config.training.poll_interval_ms = self.poll_interval.map(|d| d.as_millis() as u64);
        config.training.epochs = self.epochs;
        config.training.batch_size = self.batch_size;
        config.training.model_type = self.model_type;
        config.logging.verbose = self.verbose;

        config.validate()?;
        Ok(config)
    }
}
