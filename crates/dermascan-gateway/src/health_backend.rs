//! HTTP health probe
//!
//! One instance per address: the primary (`/api/health`) and the fallback
//! (`/health`) are two separate gateways.

use async_trait::async_trait;
use dermascan_utils::error::GatewayError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::gateway::HealthGateway;
use crate::http_client::HttpClient;
use crate::types::HealthReport;

pub(crate) struct HttpHealthGateway {
    client: HttpClient,
    url: String,
    timeout: Duration,
}

impl HttpHealthGateway {
    pub fn new(client: HttpClient, url: String, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl HealthGateway for HttpHealthGateway {
    async fn check(&self) -> Result<HealthReport, GatewayError> {
        let response = self
            .client
            .execute_with_retry(|c| c.get(&self.url), self.timeout, "health check")
            .await?;

        let body = response.text().await.unwrap_or_default();
        let report = health_report_from_body(&self.url, &body);

        debug!(
            endpoint = %self.url,
            status = ?report.status,
            model_loaded = ?report.model_loaded,
            "Health endpoint answered"
        );

        Ok(report)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Default, Deserialize)]
struct HealthBody {
    status: Option<String>,
    model_loaded: Option<bool>,
}

/// Any success status means "up"; the body is informational and may be absent.
fn health_report_from_body(endpoint: &str, body: &str) -> HealthReport {
    let parsed: HealthBody = serde_json::from_str(body).unwrap_or_default();
    HealthReport {
        endpoint: endpoint.to_string(),
        status: parsed.status,
        model_loaded: parsed.model_loaded,
    }
}
