//! Training-job supervision.
//!
//! [`TrainingJobMonitor::start`] submits a job and spawns a poll loop that
//! queries the job status on a fixed interval until the job reaches a
//! terminal state or is cancelled. The loop is the only writer of the job
//! snapshot; everyone else observes it through a `watch` channel and receives
//! [`TrainingEvent`]s on the handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use dermascan_gateway::{TaskId, TrainingConfig, TrainingGateway, TrainingStatus};
use dermascan_utils::error::DermaError;
use dermascan_utils::logging::{job_span, log_job_terminal};

/// Message used when a job fails without an error description.
pub const UNKNOWN_FAILURE: &str = "unknown error";

/// Last known state of one training job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingJob {
    pub task_id: TaskId,
    pub status: TrainingStatus,
    /// 0-100, as reported by the server
    pub progress: f64,
    pub config: TrainingConfig,
    pub started_at: DateTime<Utc>,
    /// Set only when `status` is `Failed`
    pub error: Option<String>,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum TrainingOutcome {
    Completed,
    Failed(String),
}

/// Notifications emitted by the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// A poll succeeded; carries the updated snapshot
    Progress(TrainingJob),
    /// A poll failed; the snapshot is unchanged and polling continues
    PollFailed(String),
    /// Emitted exactly once, as the last event of a job that was not cancelled
    Terminal(TrainingOutcome),
}

/// Owner-side view of a running job.
///
/// Dropping the handle does not stop polling; call [`TrainingHandle::cancel`]
/// or drop the monitor.
pub struct TrainingHandle {
    task_id: TaskId,
    job_rx: watch::Receiver<TrainingJob>,
    events: mpsc::UnboundedReceiver<TrainingEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TrainingHandle {
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    #[must_use]
    pub fn snapshot(&self) -> TrainingJob {
        self.job_rx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrainingJob> {
        self.job_rx.clone()
    }

    /// Stop polling immediately. Idempotent; a no-op once the job is terminal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `true` once the poll loop has exited (terminal or cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Next event, or `None` once the poll loop has exited and all events
    /// were consumed.
    pub async fn next_event(&mut self) -> Option<TrainingEvent> {
        self.events.recv().await
    }

    /// Drain events until the job ends. `None` means it was cancelled.
    pub async fn wait(mut self) -> Option<TrainingOutcome> {
        while let Some(event) = self.events.recv().await {
            if let TrainingEvent::Terminal(outcome) = event {
                return Some(outcome);
            }
        }
        None
    }
}

struct ActiveJob {
    job_rx: watch::Receiver<TrainingJob>,
    cancel: CancellationToken,
}

/// Owns at most one active training job.
pub struct TrainingJobMonitor {
    gateway: Arc<dyn TrainingGateway>,
    poll_interval: Duration,
    active: Option<ActiveJob>,
}

impl TrainingJobMonitor {
    pub fn new(gateway: Arc<dyn TrainingGateway>, poll_interval: Duration) -> Self {
        Self {
            gateway,
            poll_interval,
            active: None,
        }
    }

    /// Validate and submit a job, then start polling it.
    ///
    /// A job that is already being polled is cancelled only once the new one
    /// has been accepted; on any error it keeps running untouched.
    ///
    /// # Errors
    ///
    /// - `DermaError::Validation` for zero epochs or batch size (no request sent)
    /// - `DermaError::Gateway` when the server rejects or cannot be reached
    pub async fn start(&mut self, config: TrainingConfig) -> Result<TrainingHandle, DermaError> {
        config.validate()?;

        let task_id = self.gateway.start(&config).await.map_err(|e| {
            warn!(error = %e, "Training start rejected");
            e
        })?;

        if let Some(previous) = self.active.take() {
            info!(
                task_id = %previous.job_rx.borrow().task_id,
                "Replacing active training job"
            );
            previous.cancel.cancel();
        }

        info!(
            task_id = %task_id,
            epochs = config.epochs,
            batch_size = config.batch_size,
            model_type = %config.model_type,
            "Training job started"
        );

        let job = TrainingJob {
            task_id: task_id.clone(),
            status: TrainingStatus::Preparing,
            progress: 0.0,
            config,
            started_at: Utc::now(),
            error: None,
        };
        let (job_tx, job_rx) = watch::channel(job);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(
            poll_loop(
                Arc::clone(&self.gateway),
                self.poll_interval,
                job_tx,
                events_tx,
                cancel.clone(),
            )
            .instrument(job_span(task_id.as_str())),
        );

        self.active = Some(ActiveJob {
            job_rx: job_rx.clone(),
            cancel: cancel.clone(),
        });

        Ok(TrainingHandle {
            task_id,
            job_rx,
            events: events_rx,
            cancel,
            task,
        })
    }

    /// Last snapshot of the active job, if any.
    #[must_use]
    pub fn active_job(&self) -> Option<TrainingJob> {
        self.active.as_ref().map(|a| a.job_rx.borrow().clone())
    }

    /// Stop polling the active job and forget it. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(task_id = %active.job_rx.borrow().task_id, "Cancelling training job");
            active.cancel.cancel();
        }
    }
}

impl Drop for TrainingJobMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_loop(
    gateway: Arc<dyn TrainingGateway>,
    poll_interval: Duration,
    job_tx: watch::Sender<TrainingJob>,
    events: mpsc::UnboundedSender<TrainingEvent>,
    cancel: CancellationToken,
) {
    let task_id = job_tx.borrow().task_id.clone();
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = gateway.status(&task_id) => result,
        };

        // A response racing with cancel() is discarded.
        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(report) => {
                job_tx.send_modify(|job| {
                    job.status = report.status;
                    job.progress = report.progress;
                    job.error = match report.status {
                        TrainingStatus::Failed => Some(
                            report
                                .error
                                .clone()
                                .unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
                        ),
                        _ => None,
                    };
                });
                let snapshot = job_tx.borrow().clone();
                debug!(
                    status = %snapshot.status,
                    progress = snapshot.progress,
                    "Training status polled"
                );
                let _ = events.send(TrainingEvent::Progress(snapshot.clone()));

                if snapshot.status.is_terminal() {
                    let outcome = match snapshot.status {
                        TrainingStatus::Failed => TrainingOutcome::Failed(
                            snapshot
                                .error
                                .unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
                        ),
                        _ => TrainingOutcome::Completed,
                    };
                    let error = match &outcome {
                        TrainingOutcome::Failed(message) => Some(message.as_str()),
                        TrainingOutcome::Completed => None,
                    };
                    log_job_terminal(task_id.as_str(), snapshot.status.as_str(), error);
                    let _ = events.send(TrainingEvent::Terminal(outcome));
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Training status poll failed, will retry next tick");
                let _ = events.send(TrainingEvent::PollFailed(e.message()));
            }
        }
    }

    debug!(task_id = %task_id, "Training poll loop cancelled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTrainingGateway, status};
    use dermascan_gateway::{GatewayError, ModelType};
    use dermascan_utils::types::FailureKind;

    const INTERVAL: Duration = Duration::from_millis(5000);

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 30,
            batch_size: 16,
            model_type: ModelType::Resnet50,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_completed_and_notifies_once() {
        let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1").with_statuses(vec![
            Ok(status(TrainingStatus::Running, 10.0)),
            Ok(status(TrainingStatus::Running, 40.0)),
            Ok(status(TrainingStatus::Running, 70.0)),
            Ok(status(TrainingStatus::Completed, 100.0)),
        ]));
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);

        let mut handle = monitor.start(config()).await.unwrap();
        assert_eq!(handle.task_id().as_str(), "t1");
        assert_eq!(handle.snapshot().status, TrainingStatus::Preparing);

        let mut progress = Vec::new();
        let mut terminals = Vec::new();
        while let Some(event) = handle.next_event().await {
            match event {
                TrainingEvent::Progress(job) => progress.push(job.progress),
                TrainingEvent::Terminal(outcome) => terminals.push(outcome),
                TrainingEvent::PollFailed(msg) => panic!("unexpected poll failure: {msg}"),
            }
        }

        assert_eq!(progress, vec![10.0, 40.0, 70.0, 100.0]);
        assert_eq!(terminals, vec![TrainingOutcome::Completed]);
        assert_eq!(gateway.status_calls(), 4);

        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(gateway.status_calls(), 4);
        assert_eq!(
            monitor.active_job().unwrap().status,
            TrainingStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_waits_one_interval() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Running, 5.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let _handle = monitor.start(config()).await.unwrap();

        tokio::time::sleep(INTERVAL - Duration::from_millis(1)).await;
        assert_eq!(gateway.status_calls(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(gateway.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_defaults_error_message() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t2")
                .with_statuses(vec![Ok(status(TrainingStatus::Failed, 20.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway, INTERVAL);
        let handle = monitor.start(config()).await.unwrap();
        let rx = handle.subscribe();

        let outcome = handle.wait().await;
        assert_eq!(
            outcome,
            Some(TrainingOutcome::Failed(UNKNOWN_FAILURE.to_string()))
        );
        assert_eq!(rx.borrow().error.as_deref(), Some(UNKNOWN_FAILURE));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_failure_keeps_state_and_continues() {
        let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1").with_statuses(vec![
            Ok(status(TrainingStatus::Running, 30.0)),
            Err(GatewayError::Transport("connection reset".to_string())),
            Ok(status(TrainingStatus::Completed, 100.0)),
        ]));
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let mut handle = monitor.start(config()).await.unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(TrainingEvent::Progress(_))
        ));
        let before = handle.snapshot();

        assert_eq!(
            handle.next_event().await,
            Some(TrainingEvent::PollFailed("connection reset".to_string()))
        );
        assert_eq!(handle.snapshot(), before);

        assert!(matches!(
            handle.next_event().await,
            Some(TrainingEvent::Progress(_))
        ));
        assert_eq!(
            handle.next_event().await,
            Some(TrainingEvent::Terminal(TrainingOutcome::Completed))
        );
        assert_eq!(gateway.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_and_retains_snapshot() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Running, 10.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let mut handle = monitor.start(config()).await.unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(TrainingEvent::Progress(_))
        ));
        handle.cancel();
        handle.cancel();
        let calls = gateway.status_calls();

        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(gateway.status_calls(), calls);
        assert!(handle.is_cancelled());
        assert_eq!(handle.snapshot().progress, 10.0);
        assert_eq!(handle.next_event().await, None);

        monitor.cancel();
        assert!(monitor.active_job().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn response_arriving_after_cancel_is_discarded() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Completed, 100.0))])
                .with_status_latency(Duration::from_secs(2)),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let handle = monitor.start(config()).await.unwrap();

        // Poll is in flight between 5s and 7s.
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(gateway.status_calls(), 1);
        monitor.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot().status, TrainingStatus::Preparing);
        assert_eq!(handle.wait().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_creates_no_job() {
        let gateway = Arc::new(ScriptedTrainingGateway::rejecting(GatewayError::Remote {
            status: Some(500),
            message: "server error".to_string(),
        }));
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);

        let err = monitor.start(config()).await.err().unwrap();
        assert_eq!(err.kind(), FailureKind::Remote);
        assert!(monitor.active_job().is_none());

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(gateway.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_is_rejected_locally() {
        let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1"));
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);

        let mut bad = config();
        bad.batch_size = 0;
        let err = monitor.start(bad).await.err().unwrap();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(gateway.start_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_leaves_running_job_untouched() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Running, 50.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let handle = monitor.start(config()).await.unwrap();

        gateway.set_start_result(Err(GatewayError::remote("busy")));
        assert!(monitor.start(config()).await.is_err());

        assert!(!handle.is_cancelled());
        assert_eq!(monitor.active_job().unwrap().task_id.as_str(), "t1");
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(gateway.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_job_replaces_previous_poll_loop() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Running, 50.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let first = monitor.start(config()).await.unwrap();

        gateway.set_start_result(Ok(TaskId::new("t2")));
        let second = monitor.start(config()).await.unwrap();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(monitor.active_job().unwrap().task_id.as_str(), "t2");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_monitor_stops_polling() {
        let gateway = Arc::new(
            ScriptedTrainingGateway::accepting("t1")
                .with_statuses(vec![Ok(status(TrainingStatus::Running, 50.0))]),
        );
        let mut monitor = TrainingJobMonitor::new(gateway.clone(), INTERVAL);
        let handle = monitor.start(config()).await.unwrap();
        drop(monitor);

        tokio::time::sleep(INTERVAL * 3).await;
        assert!(handle.is_cancelled());
        assert_eq!(gateway.status_calls(), 0);
    }
}
