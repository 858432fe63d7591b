//! Batch analysis of queued images.
//!
//! The orchestrator owns the record store. A batch selects every record that
//! is still `Uploaded`, and dispatches them one at a time in submission order
//! through the [`AnalysisGateway`], pausing between requests. Per-record
//! failures are written to the record and never stop the batch.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, debug};

use dermascan_gateway::{AnalysisGateway, ImagePayload};
use dermascan_utils::error::ValidationError;
use dermascan_utils::logging::{batch_span, log_batch_complete, log_batch_start, log_item_failed};

use crate::connection::ConnectionState;
use crate::dispatcher::{BatchSummary, SequentialDispatcher};
use crate::records::{ImageRecord, ImageStatus, RecordId, RecordSnapshot, RecordStore};

/// Result of one `run_batch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum BatchOutcome {
    /// The collection was empty
    NoOp,
    /// The server was not known to be reachable; nothing was touched
    BlockedByConnection,
    /// No record was in `Uploaded`
    AllAlreadyProcessed,
    /// Counts over exactly the records processed by this call
    Completed(BatchSummary),
}

pub struct AnalysisOrchestrator {
    gateway: Arc<dyn AnalysisGateway>,
    dispatcher: SequentialDispatcher,
    store: RecordStore,
    batches: u64,
}

impl AnalysisOrchestrator {
    /// Orchestrator with a fixed pause between requests.
    pub fn new(gateway: Arc<dyn AnalysisGateway>, inter_request_delay: Duration) -> Self {
        Self::with_dispatcher(gateway, SequentialDispatcher::fixed_delay(inter_request_delay))
    }

    pub fn with_dispatcher(gateway: Arc<dyn AnalysisGateway>, dispatcher: SequentialDispatcher) -> Self {
        Self {
            gateway,
            dispatcher,
            store: RecordStore::new(),
            batches: 0,
        }
    }

    /// Add one `Uploaded` record per payload, in order. No network access.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found; nothing is appended then.
    pub fn enqueue(&mut self, images: Vec<ImagePayload>) -> Result<Vec<RecordId>, ValidationError> {
        for image in &images {
            image.validate()?;
        }
        let ids = self.store.append(images);
        debug!(count = ids.len(), total = self.store.len(), "Images enqueued");
        Ok(ids)
    }

    /// Analyze every `Uploaded` record, strictly one at a time.
    pub async fn run_batch(&mut self, connection: ConnectionState) -> BatchOutcome {
        if self.store.is_empty() {
            return BatchOutcome::NoOp;
        }

        if connection != ConnectionState::Connected {
            debug!(state = %connection, "Batch blocked by connection state");
            return BatchOutcome::BlockedByConnection;
        }

        let selection = self.store.ids_with_status(ImageStatus::Uploaded);
        if selection.is_empty() {
            return BatchOutcome::AllAlreadyProcessed;
        }

        self.batches += 1;
        let batch = format!("batch-{}", self.batches);
        let skipped = self.store.len() - selection.len();
        let span = batch_span(&batch, selection.len());

        let summary = self
            .dispatch(&batch, selection, skipped)
            .instrument(span)
            .await;
        BatchOutcome::Completed(summary)
    }

    async fn dispatch(&mut self, batch: &str, selection: Vec<RecordId>, skipped: usize) -> BatchSummary {
        log_batch_start(batch, selection.len(), skipped);
        let mut run = self.dispatcher.begin();

        for id in selection {
            run.next_slot().await;

            let Some(payload) = self.store.get(id).map(|r| r.payload()) else {
                continue;
            };
            self.store.update(id, ImageRecord::mark_analyzing);

            match self.gateway.analyze(&payload).await {
                Ok(diagnosis) => {
                    debug!(record_id = %id, label = %diagnosis.label, "Record analyzed");
                    self.store.update(id, |r| r.mark_analyzed(diagnosis));
                    run.record(true);
                }
                Err(e) => {
                    let message = e.message();
                    log_item_failed(batch, &payload.name, &message);
                    self.store.update(id, |r| r.mark_failed(message));
                    run.record(false);
                }
            }
        }

        let elapsed = run.elapsed_ms();
        let summary = run.finish();
        log_batch_complete(batch, summary.succeeded, summary.failed, elapsed);
        summary
    }

    /// Move a `Failed` record back to `Uploaded` so the next batch picks it up.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for unknown ids or records that did not fail.
    pub fn reset_for_retry(&mut self, id: RecordId) -> Result<(), ValidationError> {
        let status = self
            .store
            .get(id)
            .map(|r| r.status())
            .ok_or_else(|| ValidationError::new("record_id", format!("unknown record {id}")))?;

        if status != ImageStatus::Failed {
            return Err(ValidationError::new(
                "record_id",
                format!("record {id} has not failed"),
            ));
        }

        self.store.update(id, ImageRecord::mark_uploaded);
        Ok(())
    }

    /// Drop a record from the collection. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: RecordId) -> bool {
        self.store.remove(id).is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RecordSnapshot> {
        self.store.snapshot()
    }

    /// Receive a new snapshot after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<RecordSnapshot>> {
        self.store.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAnalysisGateway, image};
    use dermascan_gateway::GatewayError;
    use proptest::prelude::*;
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(500);

    fn orchestrator(gateway: &Arc<ScriptedAnalysisGateway>) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(gateway.clone(), DELAY)
    }

    #[tokio::test(start_paused = true)]
    async fn middle_failure_does_not_stop_batch() {
        let gateway = Arc::new(
            ScriptedAnalysisGateway::new()
                .fail_on("lesion-2.jpg", GatewayError::remote("low image quality")),
        );
        let mut orch = orchestrator(&gateway);
        let ids = orch
            .enqueue(vec![
                image("lesion-1.jpg"),
                image("lesion-2.jpg"),
                image("lesion-3.jpg"),
            ])
            .unwrap();

        let outcome = orch.run_batch(ConnectionState::Connected).await;
        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchSummary {
                succeeded: 2,
                failed: 1
            })
        );

        let snapshot = orch.snapshot();
        assert_eq!(snapshot.get(ids[0]).unwrap().status(), ImageStatus::Analyzed);
        let failed = snapshot.get(ids[1]).unwrap();
        assert_eq!(failed.status(), ImageStatus::Failed);
        assert_eq!(failed.error(), Some("low image quality"));
        assert!(failed.result().is_none());
        assert_eq!(snapshot.get(ids[2]).unwrap().status(), ImageStatus::Analyzed);
        assert_eq!(
            gateway.calls_in_order(),
            vec!["lesion-1.jpg", "lesion-2.jpg", "lesion-3.jpg"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delay_between_requests_only() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);
        orch.enqueue(vec![image("a.jpg"), image("b.jpg"), image("c.jpg")])
            .unwrap();

        let start = Instant::now();
        orch.run_batch(ConnectionState::Connected).await;
        assert_eq!(start.elapsed(), DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_batch_is_all_already_processed() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);
        orch.enqueue(vec![image("a.jpg"), image("b.jpg")]).unwrap();

        orch.run_batch(ConnectionState::Connected).await;
        let calls = gateway.calls();
        assert_eq!(
            orch.run_batch(ConnectionState::Connected).await,
            BatchOutcome::AllAlreadyProcessed
        );
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_and_noop_make_no_calls() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);

        assert_eq!(
            orch.run_batch(ConnectionState::Connected).await,
            BatchOutcome::NoOp
        );

        orch.enqueue(vec![image("a.jpg")]).unwrap();
        let before = orch.snapshot();
        for state in [ConnectionState::Disconnected, ConnectionState::Checking] {
            assert_eq!(orch.run_batch(state).await, BatchOutcome::BlockedByConnection);
        }
        assert_eq!(gateway.calls(), 0);
        assert_eq!(orch.snapshot().version, before.version);
    }

    #[tokio::test(start_paused = true)]
    async fn processed_records_are_left_untouched() {
        let gateway = Arc::new(
            ScriptedAnalysisGateway::new().fail_on("bad.jpg", GatewayError::remote("unreadable")),
        );
        let mut orch = orchestrator(&gateway);
        orch.enqueue(vec![image("good.jpg"), image("bad.jpg")]).unwrap();
        orch.run_batch(ConnectionState::Connected).await;
        let before = orch.snapshot();

        let new_id = orch.enqueue(vec![image("new.jpg")]).unwrap()[0];
        let outcome = orch.run_batch(ConnectionState::Connected).await;
        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchSummary {
                succeeded: 1,
                failed: 0
            })
        );

        let after = orch.snapshot();
        for record in &before.records {
            assert!(Arc::ptr_eq(record, after.get(record.id()).unwrap()));
        }
        assert_eq!(after.get(new_id).unwrap().status(), ImageStatus::Analyzed);
    }

    #[tokio::test(start_paused = true)]
    async fn observers_see_each_transition() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);
        let id = orch.enqueue(vec![image("a.jpg")]).unwrap()[0];
        let mut rx = orch.subscribe();

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let status = rx.borrow_and_update().get(id).map(|r| r.status());
                seen.push(status);
                if status == Some(ImageStatus::Analyzed) {
                    break;
                }
            }
            seen
        });

        // Let the observer start waiting before any mutation.
        tokio::task::yield_now().await;
        orch.run_batch(ConnectionState::Connected).await;

        let seen = observer.await.unwrap();
        assert_eq!(seen.last(), Some(&Some(ImageStatus::Analyzed)));
        assert!(seen.len() <= 2);
    }

    #[tokio::test]
    async fn enqueue_is_all_or_nothing() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);

        let err = orch
            .enqueue(vec![
                image("ok.jpg"),
                ImagePayload::new("empty.jpg", Vec::<u8>::new()),
            ])
            .unwrap_err();
        assert_eq!(err.field, "payload");
        assert!(orch.snapshot().is_empty());

        let err = orch
            .enqueue(vec![ImagePayload::new("", vec![1u8])])
            .unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[tokio::test(start_paused = true)]
    async fn reset_for_retry_requeues_failed_record() {
        let gateway = Arc::new(
            ScriptedAnalysisGateway::new()
                .fail_on("flaky.jpg", GatewayError::Transport("reset".to_string())),
        );
        let mut orch = orchestrator(&gateway);
        let ids = orch.enqueue(vec![image("ok.jpg"), image("flaky.jpg")]).unwrap();
        orch.run_batch(ConnectionState::Connected).await;

        assert!(orch.reset_for_retry(ids[0]).is_err());
        orch.reset_for_retry(ids[1]).unwrap();
        assert_eq!(
            orch.snapshot().get(ids[1]).unwrap().status(),
            ImageStatus::Uploaded
        );

        gateway.clear_failures();
        let outcome = orch.run_batch(ConnectionState::Connected).await;
        assert_eq!(
            outcome,
            BatchOutcome::Completed(BatchSummary {
                succeeded: 1,
                failed: 0
            })
        );
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test]
    async fn remove_record() {
        let gateway = Arc::new(ScriptedAnalysisGateway::new());
        let mut orch = orchestrator(&gateway);
        let ids = orch.enqueue(vec![image("a.jpg"), image("b.jpg")]).unwrap();

        assert!(orch.remove(ids[0]));
        assert!(!orch.remove(ids[0]));
        assert!(orch.reset_for_retry(ids[0]).is_err());
        assert_eq!(orch.snapshot().len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn batch_counts_match_uploaded_records(
            outcomes in proptest::collection::vec(any::<bool>(), 1..12),
            removed_early in proptest::collection::vec(any::<bool>(), 1..12),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            runtime.block_on(async {
                let gateway = Arc::new(ScriptedAnalysisGateway::new());
                let mut orch = AnalysisOrchestrator::new(gateway.clone(), DELAY);

                // First round: some records get processed before the batch under test.
                let early: Vec<_> = (0..removed_early.len())
                    .map(|i| image(&format!("early-{i}.jpg")))
                    .collect();
                let early_ids = orch.enqueue(early).unwrap();
                for (id, removed) in early_ids.iter().zip(&removed_early) {
                    if *removed {
                        orch.remove(*id);
                    }
                }
                orch.run_batch(ConnectionState::Connected).await;

                let late: Vec<_> = outcomes
                    .iter()
                    .enumerate()
                    .map(|(i, ok)| {
                        let name = format!("late-{i}.jpg");
                        if !ok {
                            gateway.add_failure(&name, GatewayError::remote("rejected"));
                        }
                        image(&name)
                    })
                    .collect();
                orch.enqueue(late).unwrap();

                let before = orch.snapshot();
                let uploaded = before.count(ImageStatus::Uploaded);
                let calls_before = gateway.calls();

                let outcome = orch.run_batch(ConnectionState::Connected).await;
                let BatchOutcome::Completed(summary) = outcome else {
                    panic!("expected Completed, got {outcome:?}");
                };

                assert_eq!(summary.total(), uploaded);
                assert_eq!(summary.failed, outcomes.iter().filter(|ok| !**ok).count());
                assert_eq!(gateway.calls() - calls_before, uploaded);

                let after = orch.snapshot();
                for record in before.records.iter().filter(|r| r.status() != ImageStatus::Uploaded) {
                    assert!(Arc::ptr_eq(record, after.get(record.id()).unwrap()));
                }
            });
        }
    }
}
