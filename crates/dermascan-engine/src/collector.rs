//! Labeled training-sample intake.
//!
//! Samples are labeled locally and then uploaded one at a time through
//! [`TrainingGateway::collect_sample`]. A failed upload stays on the sample
//! and is retried by the next `upload_pending` call.

use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, debug};

use dermascan_gateway::{ImagePayload, SampleId, TrainingGateway};
use dermascan_utils::error::ValidationError;
use dermascan_utils::logging::{batch_span, log_batch_complete, log_batch_start, log_item_failed};

use crate::dispatcher::{BatchSummary, SequentialDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Pending,
    Saved,
    Failed,
}

/// One labeled image waiting for, or done with, upload.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSample {
    pub name: String,
    pub label: String,
    pub status: SampleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<SampleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    payload: ImagePayload,
}

pub struct SampleCollector {
    gateway: Arc<dyn TrainingGateway>,
    dispatcher: SequentialDispatcher,
    samples: Vec<TrainingSample>,
    uploads: u64,
}

impl SampleCollector {
    /// Collector that uploads without pausing between samples.
    pub fn new(gateway: Arc<dyn TrainingGateway>) -> Self {
        Self::with_dispatcher(gateway, SequentialDispatcher::unthrottled())
    }

    pub fn with_dispatcher(gateway: Arc<dyn TrainingGateway>, dispatcher: SequentialDispatcher) -> Self {
        Self {
            gateway,
            dispatcher,
            samples: Vec::new(),
            uploads: 0,
        }
    }

    /// Add labeled images. All-or-nothing, like `AnalysisOrchestrator::enqueue`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a blank label or a malformed payload.
    pub fn add(&mut self, images: Vec<(ImagePayload, String)>) -> Result<usize, ValidationError> {
        for (image, label) in &images {
            image.validate()?;
            if label.trim().is_empty() {
                return Err(ValidationError::new(
                    "label",
                    format!("image '{}' has no diagnosis label", image.name),
                ));
            }
        }

        let added = images.len();
        self.samples
            .extend(images.into_iter().map(|(payload, label)| TrainingSample {
                name: payload.name.clone(),
                label: label.trim().to_string(),
                status: SampleStatus::Pending,
                sample_id: None,
                error: None,
                payload,
            }));
        Ok(added)
    }

    /// Upload every sample that is not yet saved.
    pub async fn upload_pending(&mut self) -> BatchSummary {
        let selection: Vec<usize> = self
            .samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status != SampleStatus::Saved)
            .map(|(i, _)| i)
            .collect();

        if selection.is_empty() {
            return BatchSummary::default();
        }

        self.uploads += 1;
        let batch = format!("upload-{}", self.uploads);
        let skipped = self.samples.len() - selection.len();
        let span = batch_span(&batch, selection.len());

        self.upload(&batch, selection, skipped).instrument(span).await
    }

    async fn upload(&mut self, batch: &str, selection: Vec<usize>, skipped: usize) -> BatchSummary {
        log_batch_start(batch, selection.len(), skipped);
        let mut run = self.dispatcher.begin();

        for index in selection {
            run.next_slot().await;
            let sample = &mut self.samples[index];

            match self
                .gateway
                .collect_sample(&sample.payload, &sample.label)
                .await
            {
                Ok(sample_id) => {
                    debug!(sample = %sample.name, sample_id = %sample_id, "Sample saved");
                    sample.status = SampleStatus::Saved;
                    sample.sample_id = Some(sample_id);
                    sample.error = None;
                    run.record(true);
                }
                Err(e) => {
                    let message = e.message();
                    log_item_failed(batch, &sample.name, &message);
                    sample.status = SampleStatus::Failed;
                    sample.error = Some(message);
                    run.record(false);
                }
            }
        }

        let elapsed = run.elapsed_ms();
        let summary = run.finish();
        log_batch_complete(batch, summary.succeeded, summary.failed, elapsed);
        summary
    }

    #[must_use]
    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.status == SampleStatus::Saved)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTrainingGateway, image};
    use dermascan_gateway::GatewayError;

    fn labeled(name: &str, label: &str) -> (ImagePayload, String) {
        (image(name), label.to_string())
    }

    #[tokio::test]
    async fn unlabeled_sample_rejected_at_add() {
        let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1"));
        let mut collector = SampleCollector::new(gateway.clone());

        let err = collector
            .add(vec![labeled("a.jpg", "Melanoma"), labeled("b.jpg", "  ")])
            .unwrap_err();
        assert_eq!(err.field, "label");
        assert!(collector.samples().is_empty());
        assert_eq!(gateway.collect_calls(), 0);
    }

    #[tokio::test]
    async fn failed_upload_does_not_abort_and_is_retried() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .fail_collect_on("b.jpg", GatewayError::remote("disk full")),
        );
        let mut collector = SampleCollector::new(gateway.clone());
        collector
            .add(vec![
                labeled("a.jpg", "Nevus"),
                labeled("b.jpg", "Melanoma"),
                labeled("c.jpg", "Dermatofibroma"),
            ])
            .unwrap();

        let summary = collector.upload_pending().await;
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(collector.samples()[1].status, SampleStatus::Failed);
        assert_eq!(collector.samples()[1].error.as_deref(), Some("disk full"));
        assert_eq!(collector.saved_count(), 2);

        gateway.clear_collect_failures();
        let summary = collector.upload_pending().await;
        assert_eq!(summary.total(), 1);
        assert_eq!(collector.saved_count(), 3);
        assert_eq!(gateway.collect_calls(), 4);
        assert_eq!(
            gateway.collected_labels(),
            vec!["Nevus", "Melanoma", "Dermatofibroma", "Melanoma"]
        );

        assert_eq!(collector.upload_pending().await, BatchSummary::default());
        assert_eq!(gateway.collect_calls(), 4);
    }
}
