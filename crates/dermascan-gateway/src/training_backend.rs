//! HTTP training backend
//!
//! Job control lives under `{base}/api/training/`: `start` (JSON body),
//! `status/{task_id}` and `collect` (multipart `image` + `diagnosis`).

use async_trait::async_trait;
use dermascan_utils::error::GatewayError;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::analysis_backend::image_part;
use crate::gateway::TrainingGateway;
use crate::http_client::{HttpClient, read_json};
use crate::types::{
    ImagePayload, SampleId, TaskId, TrainingConfig, TrainingStatus, TrainingStatusReport,
};

const START_PATH: &str = "/api/training/start";
const STATUS_PATH: &str = "/api/training/status";
const COLLECT_PATH: &str = "/api/training/collect";

pub(crate) struct HttpTrainingGateway {
    client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl HttpTrainingGateway {
    pub fn new(client: HttpClient, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl TrainingGateway for HttpTrainingGateway {
    async fn start(&self, config: &TrainingConfig) -> Result<TaskId, GatewayError> {
        let url = format!("{}{}", self.base_url, START_PATH);
        let request_body = StartRequest {
            epochs: config.epochs,
            batch_size: config.batch_size,
            model_type: config.model_type.as_str(),
        };

        debug!(
            epochs = config.epochs,
            batch_size = config.batch_size,
            model_type = %config.model_type,
            "Starting training job"
        );

        let response = self
            .client
            .execute_with_retry(|c| c.post(&url).json(&request_body), self.timeout, "start training")
            .await?;

        let body: StartResponse = read_json(response, "start training").await?;
        task_id_from_response(body)
    }

    async fn status(&self, task_id: &TaskId) -> Result<TrainingStatusReport, GatewayError> {
        let url = format!("{}{}/{}", self.base_url, STATUS_PATH, task_id);
        let response = self
            .client
            .execute_with_retry(|c| c.get(&url), self.timeout, "training status")
            .await?;

        let body: StatusResponse = read_json(response, "training status").await?;
        report_from_response(body)
    }

    async fn collect_sample(
        &self,
        image: &ImagePayload,
        label: &str,
    ) -> Result<SampleId, GatewayError> {
        let url = format!("{}{}", self.base_url, COLLECT_PATH);

        debug!(image = %image.name, label = %label, "Uploading training sample");

        let response = self
            .client
            .execute_with_retry(
                |c| {
                    let form = Form::new()
                        .part("image", image_part(image))
                        .text("diagnosis", label.to_string());
                    c.post(&url).multipart(form)
                },
                self.timeout,
                "collect sample",
            )
            .await?;

        let body: CollectResponse = read_json(response, "collect sample").await?;
        sample_id_from_response(body)
    }
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    epochs: u32,
    batch_size: u32,
    model_type: &'a str,
}

/// Envelope shared by the training endpoints: `status` is `"success"` or `"error"`.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn check(&self, fallback: &str) -> Result<(), GatewayError> {
        match self.status.as_deref() {
            Some("success") => Ok(()),
            _ => Err(GatewayError::remote(
                self.message
                    .clone()
                    .or_else(|| self.error.clone())
                    .unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTrainingStatus {
    status: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    training_status: Option<WireTrainingStatus>,
}

#[derive(Debug, Deserialize)]
struct CollectResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    sample_id: Option<String>,
}

fn task_id_from_response(body: StartResponse) -> Result<TaskId, GatewayError> {
    body.envelope.check("failed to start training")?;
    body.task_id
        .filter(|id| !id.trim().is_empty())
        .map(TaskId::new)
        .ok_or_else(|| GatewayError::remote("server did not return a task id"))
}

fn report_from_response(body: StatusResponse) -> Result<TrainingStatusReport, GatewayError> {
    body.envelope.check("failed to query training status")?;
    let wire = body
        .training_status
        .ok_or_else(|| GatewayError::remote("server did not return a training status"))?;
    let status: TrainingStatus = wire.status.parse().map_err(GatewayError::remote)?;

    Ok(TrainingStatusReport {
        status,
        progress: wire.progress,
        error: wire.error.filter(|e| !e.is_empty()),
        started_at: wire.started_at,
    })
}

fn sample_id_from_response(body: CollectResponse) -> Result<SampleId, GatewayError> {
    body.envelope.check("failed to save training sample")?;
    Ok(SampleId::new(body.sample_id.unwrap_or_default()))
}
