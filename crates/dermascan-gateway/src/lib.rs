//! Gateway layer for the dermascan analysis server
//!
//! The engine depends only on the [`HealthGateway`], [`AnalysisGateway`] and
//! [`TrainingGateway`] traits. [`from_config`] builds the HTTP implementations
//! that share one connection pool.

mod analysis_backend;
mod gateway;
mod health_backend;
mod http_client;
mod training_backend;
mod types;

use std::sync::Arc;

pub use dermascan_config as config;
pub use dermascan_utils::error::GatewayError;
pub use gateway::{AnalysisGateway, HealthGateway, TrainingGateway};
pub use types::{
    Candidate, ClassLabel, Diagnosis, HealthReport, ImagePayload, ModelInfo, ModelType, SampleId,
    TaskId, TrainingConfig, TrainingStatus, TrainingStatusReport,
};

use crate::analysis_backend::HttpAnalysisGateway;
use crate::config::Config;
use crate::health_backend::HttpHealthGateway;
use crate::http_client::HttpClient;
use crate::training_backend::HttpTrainingGateway;

/// The set of gateways one dermascan session talks to.
#[derive(Clone)]
pub struct Gateways {
    pub health_primary: Arc<dyn HealthGateway>,
    /// `None` when the fallback probe is disabled in configuration
    pub health_fallback: Option<Arc<dyn HealthGateway>>,
    pub analysis: Arc<dyn AnalysisGateway>,
    pub training: Arc<dyn TrainingGateway>,
}

/// Construct the HTTP gateways described by `config`.
///
/// # Errors
///
/// Returns `GatewayError::Misconfiguration` if the HTTP client cannot be built.
pub fn from_config(config: &Config) -> Result<Gateways, GatewayError> {
    let client = HttpClient::new(config.max_retries())?;

    let health_primary: Arc<dyn HealthGateway> = Arc::new(HttpHealthGateway::new(
        client.clone(),
        config.health_primary_url(),
        config.health_timeout(),
    ));
    let health_fallback = config.health_fallback_url().map(|url| {
        Arc::new(HttpHealthGateway::new(
            client.clone(),
            url,
            config.health_timeout(),
        )) as Arc<dyn HealthGateway>
    });

    Ok(Gateways {
        health_primary,
        health_fallback,
        analysis: Arc::new(HttpAnalysisGateway::new(
            client.clone(),
            config.base_url(),
            config.analysis_timeout(),
        )),
        training: Arc::new(HttpTrainingGateway::new(
            client,
            config.base_url(),
            config.training_timeout(),
        )),
    })
}
