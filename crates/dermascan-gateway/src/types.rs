//! Domain types exchanged with the gateways.
//!
//! These are transport-independent: the HTTP backends translate wire JSON
//! into them, and the engine never sees a raw response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dermascan_utils::error::ValidationError;

/// One image submitted for analysis or collection.
///
/// The bytes are an opaque, shared, immutable blob; nothing in dermascan
/// decodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl ImagePayload {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reject payloads that cannot be sent to the server.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the name is blank or the payload is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "image name must not be empty"));
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::new(
                "payload",
                format!("image '{}' has an empty payload", self.name),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One ranked classification candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    /// Localized display name, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_label: Option<String>,
    /// Confidence on the 0-100 scale
    pub confidence: f64,
}

/// Model metadata reported alongside a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub classes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_size: Vec<u32>,
}

/// Successful classification of one image.
///
/// `candidates` is ordered by descending confidence and always non-empty;
/// `label`/`confidence` describe the top candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_label: Option<String>,
    pub confidence: f64,
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

impl Diagnosis {
    /// Build a diagnosis from candidates, sorting them by confidence.
    ///
    /// Returns `None` when there are no candidates.
    #[must_use]
    pub fn from_candidates(
        mut candidates: Vec<Candidate>,
        model_info: Option<ModelInfo>,
    ) -> Option<Self> {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let top = candidates.first()?.clone();
        Some(Self {
            label: top.label,
            localized_label: top.localized_label,
            confidence: top.confidence,
            candidates,
            model_info,
        })
    }
}

/// A label the model can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_label: Option<String>,
}

/// Model architecture accepted by the training endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Resnet50,
    Efficientnet,
}

impl ModelType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resnet50 => "resnet50",
            Self::Efficientnet => "efficientnet",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resnet50" => Ok(Self::Resnet50),
            "efficientnet" => Ok(Self::Efficientnet),
            other => Err(ValidationError::new(
                "model_type",
                format!("'{other}' is not supported (expected resnet50 or efficientnet)"),
            )),
        }
    }
}

/// Parameters of a training job, immutable once the job is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: u32,
    pub batch_size: u32,
    pub model_type: ModelType,
}

impl TrainingConfig {
    /// # Errors
    ///
    /// Returns a `ValidationError` for zero epochs or a zero batch size.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.epochs == 0 {
            return Err(ValidationError::new("epochs", "must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::new("batch_size", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Server-assigned identifier of a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned identifier of a collected training sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a training job. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Preparing,
    Running,
    Completed,
    Failed,
}

impl TrainingStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(Self::Preparing),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown training status '{other}'")),
        }
    }
}

/// Answer to a single status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatusReport {
    pub status: TrainingStatus,
    /// 0-100, surfaced as reported
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server-side start time, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

/// Answer of a health endpoint that responded successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
}
