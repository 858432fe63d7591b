//! HTTP analysis backend
//!
//! `POST {base}/api/predict` with a multipart `image` field, and
//! `GET {base}/api/classes` for the label catalogue.

use async_trait::async_trait;
use dermascan_utils::error::GatewayError;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::gateway::AnalysisGateway;
use crate::http_client::{HttpClient, read_json};
use crate::types::{Candidate, ClassLabel, Diagnosis, ImagePayload, ModelInfo};

const PREDICT_PATH: &str = "/api/predict";
const CLASSES_PATH: &str = "/api/classes";

pub(crate) struct HttpAnalysisGateway {
    client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl HttpAnalysisGateway {
    pub fn new(client: HttpClient, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Multipart part carrying the raw image bytes under its original file name.
pub(crate) fn image_part(image: &ImagePayload) -> Part {
    Part::bytes(image.bytes.to_vec()).file_name(image.name.clone())
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn analyze(&self, image: &ImagePayload) -> Result<Diagnosis, GatewayError> {
        let url = format!("{}{}", self.base_url, PREDICT_PATH);

        debug!(
            image = %image.name,
            bytes = image.len(),
            timeout_secs = self.timeout.as_secs(),
            "Submitting image for analysis"
        );

        let response = self
            .client
            .execute_with_retry(
                |c| {
                    c.post(&url)
                        .multipart(Form::new().part("image", image_part(image)))
                },
                self.timeout,
                "analyze",
            )
            .await?;

        let body: PredictResponse = read_json(response, "analyze").await?;
        let diagnosis = diagnosis_from_response(body)?;

        debug!(
            image = %image.name,
            label = %diagnosis.label,
            confidence = diagnosis.confidence,
            "Analysis completed"
        );

        Ok(diagnosis)
    }

    async fn classes(&self) -> Result<Vec<ClassLabel>, GatewayError> {
        let url = format!("{}{}", self.base_url, CLASSES_PATH);
        let response = self
            .client
            .execute_with_retry(|c| c.get(&url), self.timeout, "classes")
            .await?;

        let body: ClassesResponse = read_json(response, "classes").await?;
        classes_from_response(body)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WirePrediction {
    #[serde(rename = "class")]
    label: String,
    #[serde(default)]
    class_vi: Option<String>,
    /// 0-1
    #[serde(default)]
    confidence: Option<f64>,
    /// 0-100
    #[serde(default)]
    percentage: Option<f64>,
}

impl WirePrediction {
    fn into_candidate(self) -> Candidate {
        let confidence = self
            .percentage
            .or(self.confidence.map(|c| c * 100.0))
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        Candidate {
            label: self.label,
            localized_label: self.class_vi,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireModelInfo {
    classes: u32,
    #[serde(default)]
    input_size: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    predictions: Option<Vec<WirePrediction>>,
    #[serde(default)]
    top_prediction: Option<WirePrediction>,
    #[serde(default)]
    model_info: Option<WireModelInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireClass {
    #[serde(rename = "class")]
    label: String,
    #[serde(default)]
    class_vi: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassesResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    classes: Vec<WireClass>,
    #[serde(default)]
    error: Option<String>,
}

fn diagnosis_from_response(body: PredictResponse) -> Result<Diagnosis, GatewayError> {
    if body.success == Some(false) {
        return Err(GatewayError::remote(
            body.error
                .unwrap_or_else(|| "Unknown error occurred".to_string()),
        ));
    }

    let mut predictions = body.predictions.unwrap_or_default();
    if predictions.is_empty()
        && let Some(top) = body.top_prediction
    {
        predictions.push(top);
    }

    let candidates = predictions
        .into_iter()
        .map(WirePrediction::into_candidate)
        .collect();
    let model_info = body.model_info.map(|info| ModelInfo {
        classes: info.classes,
        input_size: info.input_size,
    });

    Diagnosis::from_candidates(candidates, model_info)
        .ok_or_else(|| GatewayError::remote("server returned no predictions"))
}

fn classes_from_response(body: ClassesResponse) -> Result<Vec<ClassLabel>, GatewayError> {
    if body.success == Some(false) {
        return Err(GatewayError::remote(
            body.error
                .unwrap_or_else(|| "failed to list classes".to_string()),
        ));
    }

    Ok(body
        .classes
        .into_iter()
        .map(|c| ClassLabel {
            label: c.label,
            localized_label: c.class_vi,
        })
        .collect())
}
