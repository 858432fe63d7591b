//! Scripted gateway doubles for engine tests.
//!
//! Enabled for this crate's unit tests and, through the `test-utils`
//! feature, for downstream integration tests. Every double counts its calls
//! with atomics so tests can assert "zero requests" properties.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dermascan_gateway::{
    AnalysisGateway, Candidate, ClassLabel, Diagnosis, GatewayError, HealthGateway, HealthReport,
    ImagePayload, SampleId, TaskId, TrainingConfig, TrainingGateway, TrainingStatus,
    TrainingStatusReport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Small non-empty payload named `name`.
#[must_use]
pub fn image(name: &str) -> ImagePayload {
    ImagePayload::new(name, vec![0xFFu8, 0xD8, 0xFF, 0xE0])
}

/// Diagnosis with a single candidate.
#[must_use]
pub fn diagnosis(label: &str, confidence: f64) -> Diagnosis {
    Diagnosis {
        label: label.to_string(),
        localized_label: None,
        confidence,
        candidates: vec![Candidate {
            label: label.to_string(),
            localized_label: None,
            confidence,
        }],
        model_info: None,
    }
}

#[must_use]
pub fn status(status: TrainingStatus, progress: f64) -> TrainingStatusReport {
    TrainingStatusReport {
        status,
        progress,
        error: None,
        started_at: None,
    }
}

/// Health probe with a fixed answer.
pub struct ScriptedHealthGateway {
    endpoint: String,
    result: Result<(), GatewayError>,
    calls: AtomicUsize,
}

impl ScriptedHealthGateway {
    #[must_use]
    pub fn healthy(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            result: Ok(()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(endpoint: &str, error: GatewayError) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthGateway for ScriptedHealthGateway {
    async fn check(&self) -> Result<HealthReport, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map(|()| HealthReport {
            endpoint: self.endpoint.clone(),
            status: Some("healthy".to_string()),
            model_loaded: Some(true),
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Analysis double: succeeds with "Nevus" unless a failure is scripted for
/// the image name.
#[derive(Default)]
pub struct ScriptedAnalysisGateway {
    failures: Mutex<HashMap<String, GatewayError>>,
    calls: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl ScriptedAnalysisGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_on(self, name: &str, error: GatewayError) -> Self {
        self.add_failure(name, error);
        self
    }

    pub fn add_failure(&self, name: &str, error: GatewayError) {
        lock(&self.failures).insert(name.to_string(), error);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Image names in the order they were analyzed.
    pub fn calls_in_order(&self) -> Vec<String> {
        lock(&self.order).clone()
    }
}

#[async_trait]
impl AnalysisGateway for ScriptedAnalysisGateway {
    async fn analyze(&self, image: &ImagePayload) -> Result<Diagnosis, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.order).push(image.name.clone());

        let failure = lock(&self.failures).get(&image.name).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(diagnosis("Nevus", 87.5)),
        }
    }

    async fn classes(&self) -> Result<Vec<ClassLabel>, GatewayError> {
        Ok(vec![
            ClassLabel {
                label: "Melanoma".to_string(),
                localized_label: None,
            },
            ClassLabel {
                label: "Nevus".to_string(),
                localized_label: None,
            },
        ])
    }
}

/// Training double with a scripted start result and status sequence.
///
/// Once the status script is exhausted its last entry repeats; an empty
/// script answers `Running` at 0%.
pub struct ScriptedTrainingGateway {
    start_result: Mutex<Result<TaskId, GatewayError>>,
    statuses: Mutex<VecDeque<Result<TrainingStatusReport, GatewayError>>>,
    status_latency: Option<Duration>,
    collect_failures: Mutex<HashMap<String, GatewayError>>,
    collected: Mutex<Vec<String>>,
    started: Mutex<Vec<TrainingConfig>>,
    start_calls: AtomicUsize,
    status_calls: AtomicUsize,
    collect_calls: AtomicUsize,
}

impl ScriptedTrainingGateway {
    fn with_start(start_result: Result<TaskId, GatewayError>) -> Self {
        Self {
            start_result: Mutex::new(start_result),
            statuses: Mutex::new(VecDeque::new()),
            status_latency: None,
            collect_failures: Mutex::new(HashMap::new()),
            collected: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            collect_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn accepting(task_id: &str) -> Self {
        Self::with_start(Ok(TaskId::new(task_id)))
    }

    #[must_use]
    pub fn rejecting(error: GatewayError) -> Self {
        Self::with_start(Err(error))
    }

    #[must_use]
    pub fn with_statuses(self, statuses: Vec<Result<TrainingStatusReport, GatewayError>>) -> Self {
        *lock(&self.statuses) = statuses.into();
        self
    }

    /// Sleep this long inside every `status` call, after counting it.
    #[must_use]
    pub fn with_status_latency(mut self, latency: Duration) -> Self {
        self.status_latency = Some(latency);
        self
    }

    #[must_use]
    pub fn fail_collect_on(self, name: &str, error: GatewayError) -> Self {
        lock(&self.collect_failures).insert(name.to_string(), error);
        self
    }

    pub fn clear_collect_failures(&self) {
        lock(&self.collect_failures).clear();
    }

    pub fn set_start_result(&self, result: Result<TaskId, GatewayError>) {
        *lock(&self.start_result) = result;
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn collect_calls(&self) -> usize {
        self.collect_calls.load(Ordering::SeqCst)
    }

    /// Labels of every `collect_sample` call, in order.
    pub fn collected_labels(&self) -> Vec<String> {
        lock(&self.collected).clone()
    }

    /// Configs of every accepted or rejected `start` call.
    pub fn started_configs(&self) -> Vec<TrainingConfig> {
        lock(&self.started).clone()
    }
}

#[async_trait]
impl TrainingGateway for ScriptedTrainingGateway {
    async fn start(&self, config: &TrainingConfig) -> Result<TaskId, GatewayError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.started).push(*config);
        lock(&self.start_result).clone()
    }

    async fn status(&self, _task_id: &TaskId) -> Result<TrainingStatusReport, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let next = {
            let mut statuses = lock(&self.statuses);
            match statuses.len() {
                0 => Ok(status(TrainingStatus::Running, 0.0)),
                1 => statuses[0].clone(),
                _ => statuses
                    .pop_front()
                    .unwrap_or_else(|| Ok(status(TrainingStatus::Running, 0.0))),
            }
        };

        if let Some(latency) = self.status_latency {
            tokio::time::sleep(latency).await;
        }
        next
    }

    async fn collect_sample(
        &self,
        image: &ImagePayload,
        label: &str,
    ) -> Result<SampleId, GatewayError> {
        let call = self.collect_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.collected).push(label.to_string());

        match lock(&self.collect_failures).get(&image.name).cloned() {
            Some(error) => Err(error),
            None => Ok(SampleId::new(format!("sample-{call}"))),
        }
    }
}
