//! Gateway contracts.
//!
//! The engine talks to the remote service only through these traits, so the
//! HTTP backends can be replaced by scripted doubles in tests.

use async_trait::async_trait;
use dermascan_utils::error::GatewayError;

use crate::types::{
    ClassLabel, Diagnosis, HealthReport, ImagePayload, SampleId, TaskId, TrainingConfig,
    TrainingStatusReport,
};

/// Binary up/down probe of one address.
#[async_trait]
pub trait HealthGateway: Send + Sync {
    /// Succeeds when the endpoint answered with a success status.
    async fn check(&self) -> Result<HealthReport, GatewayError>;

    /// Address probed, for logging.
    fn endpoint(&self) -> &str;
}

/// Classification of a single image.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Submit one image and return its ranked classification.
    async fn analyze(&self, image: &ImagePayload) -> Result<Diagnosis, GatewayError>;

    /// Labels the model can emit.
    async fn classes(&self) -> Result<Vec<ClassLabel>, GatewayError>;
}

/// Remote training jobs and training-sample intake.
#[async_trait]
pub trait TrainingGateway: Send + Sync {
    async fn start(&self, config: &TrainingConfig) -> Result<TaskId, GatewayError>;

    async fn status(&self, task_id: &TaskId) -> Result<TrainingStatusReport, GatewayError>;

    /// Upload one labeled image to the training set.
    async fn collect_sample(
        &self,
        image: &ImagePayload,
        label: &str,
    ) -> Result<SampleId, GatewayError>;
}
