use std::collections::BTreeMap;

use crate::types::ConfigSource;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = self
                .source_attribution
                .get(key)
                .unwrap_or(&ConfigSource::Default)
                .as_str()
                .to_string();
            config.insert(key.to_string(), (value, source));
        };

        add("base_url", self.base_url().to_string());
        add("health_primary_path", self.health_primary_url());
        add(
            "health_fallback_path",
            self.health_fallback_url()
                .unwrap_or_else(|| "(disabled)".to_string()),
        );
        add(
            "health_timeout_secs",
            self.health_timeout().as_secs().to_string(),
        );
        add(
            "analysis_timeout_secs",
            self.analysis_timeout().as_secs().to_string(),
        );
        add(
            "inter_request_delay_ms",
            self.inter_request_delay().as_millis().to_string(),
        );
        add("max_retries", self.max_retries().to_string());
        add(
            "training_timeout_secs",
            self.training_timeout().as_secs().to_string(),
        );
        add(
            "poll_interval_ms",
            self.poll_interval().as_millis().to_string(),
        );
        add("epochs", self.epochs().to_string());
        add("batch_size", self.batch_size().to_string());
        add("model_type", self.model_type().to_string());
        add("verbose", self.verbose().to_string());

        config
    }
}
