//! End-to-end workflows through the public API
//!
//! These drive the orchestrators the way the CLI does, with scripted gateways
//! from `dermascan_engine::test_support` standing in for the server.

use std::sync::Arc;
use std::time::Duration;

use dermascan::{
    AnalysisOrchestrator, BatchOutcome, BatchSummary, ConnectionMonitor, ConnectionState,
    DermaError, ExitCode, GatewayError, ImageStatus, ModelType, SampleCollector, TaskId,
    TrainingConfig, TrainingJobMonitor, TrainingOutcome, TrainingStatus,
};
use dermascan_engine::test_support::{
    ScriptedAnalysisGateway, ScriptedHealthGateway, ScriptedTrainingGateway, image, status,
};

const DELAY: Duration = Duration::from_millis(500);
const POLL: Duration = Duration::from_secs(5);

fn resnet_config() -> TrainingConfig {
    TrainingConfig {
        epochs: 30,
        batch_size: 16,
        model_type: ModelType::Resnet50,
    }
}

#[tokio::test(start_paused = true)]
async fn health_gate_then_batch_with_one_failure() {
    let primary = Arc::new(ScriptedHealthGateway::failing(
        "http://server/api/health",
        GatewayError::Transport("connection refused".to_string()),
    ));
    let fallback = Arc::new(ScriptedHealthGateway::healthy("http://server/health"));
    let monitor = ConnectionMonitor::new(primary, Some(fallback));

    let gateway = Arc::new(
        ScriptedAnalysisGateway::new().fail_on("b.jpg", GatewayError::remote("low image quality")),
    );
    let mut orchestrator = AnalysisOrchestrator::new(gateway.clone(), DELAY);
    orchestrator
        .enqueue(vec![image("a.jpg"), image("b.jpg"), image("c.jpg")])
        .unwrap();

    let connection = monitor.check().await;
    assert_eq!(connection, ConnectionState::Connected);

    let started = tokio::time::Instant::now();
    let outcome = orchestrator.run_batch(connection).await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed(BatchSummary {
            succeeded: 2,
            failed: 1
        })
    );
    assert!(started.elapsed() >= DELAY * 2);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.count(ImageStatus::Analyzed), 2);
    let failed = &snapshot.records[1];
    assert_eq!(failed.status(), ImageStatus::Failed);
    assert_eq!(failed.error(), Some("low image quality"));
    assert!(failed.result().is_none());
    assert_eq!(gateway.calls_in_order(), vec!["a.jpg", "b.jpg", "c.jpg"]);
}

#[tokio::test(start_paused = true)]
async fn disconnected_server_blocks_batch_without_requests() {
    let primary = Arc::new(ScriptedHealthGateway::failing(
        "http://server/api/health",
        GatewayError::Timeout {
            duration: Duration::from_secs(10),
        },
    ));
    let monitor = ConnectionMonitor::new(primary, None);
    let gateway = Arc::new(ScriptedAnalysisGateway::new());
    let mut orchestrator = AnalysisOrchestrator::new(gateway.clone(), DELAY);
    orchestrator.enqueue(vec![image("a.jpg")]).unwrap();

    let connection = monitor.check().await;
    assert_eq!(connection, ConnectionState::Disconnected);
    assert_eq!(
        orchestrator.run_batch(connection).await,
        BatchOutcome::BlockedByConnection
    );
    assert_eq!(gateway.calls(), 0);
    assert_eq!(orchestrator.snapshot().count(ImageStatus::Uploaded), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_after_failure_reprocesses_only_that_record() {
    let gateway = Arc::new(
        ScriptedAnalysisGateway::new().fail_on("b.jpg", GatewayError::remote("server busy")),
    );
    let mut orchestrator = AnalysisOrchestrator::new(gateway.clone(), DELAY);
    let ids = orchestrator
        .enqueue(vec![image("a.jpg"), image("b.jpg")])
        .unwrap();

    orchestrator.run_batch(ConnectionState::Connected).await;
    assert_eq!(
        orchestrator.run_batch(ConnectionState::Connected).await,
        BatchOutcome::AllAlreadyProcessed
    );
    assert_eq!(gateway.calls(), 2);

    gateway.clear_failures();
    orchestrator.reset_for_retry(ids[1]).unwrap();
    let outcome = orchestrator.run_batch(ConnectionState::Connected).await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed(BatchSummary {
            succeeded: 1,
            failed: 0
        })
    );
    assert_eq!(gateway.calls_in_order(), vec!["a.jpg", "b.jpg", "b.jpg"]);
    assert_eq!(orchestrator.snapshot().count(ImageStatus::Analyzed), 2);
}

#[tokio::test(start_paused = true)]
async fn training_job_polls_to_completion() {
    let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1").with_statuses(vec![
        Ok(status(TrainingStatus::Running, 10.0)),
        Ok(status(TrainingStatus::Running, 40.0)),
        Ok(status(TrainingStatus::Running, 70.0)),
        Ok(status(TrainingStatus::Completed, 100.0)),
    ]));
    let mut monitor = TrainingJobMonitor::new(gateway.clone(), POLL);

    let handle = monitor.start(resnet_config()).await.unwrap();
    assert_eq!(handle.task_id(), &TaskId::new("t1"));
    assert_eq!(gateway.started_configs(), vec![resnet_config()]);

    let job = handle.subscribe();
    assert_eq!(handle.wait().await, Some(TrainingOutcome::Completed));
    assert_eq!(gateway.status_calls(), 4);
    assert_eq!(job.borrow().status, TrainingStatus::Completed);

    tokio::time::sleep(POLL * 3).await;
    assert_eq!(gateway.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_start_leaves_no_job() {
    let gateway = Arc::new(ScriptedTrainingGateway::rejecting(GatewayError::Remote {
        status: Some(500),
        message: "GPU unavailable".to_string(),
    }));
    let mut monitor = TrainingJobMonitor::new(gateway.clone(), POLL);

    let err = monitor.start(resnet_config()).await.err().unwrap();
    assert!(matches!(err, DermaError::Gateway(GatewayError::Remote { .. })));
    assert_eq!(err.to_exit_code(), ExitCode::GATEWAY_FAILURE);
    assert!(monitor.active_job().is_none());

    tokio::time::sleep(POLL * 2).await;
    assert_eq!(gateway.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_job_stops_polling() {
    let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1"));
    let mut monitor = TrainingJobMonitor::new(gateway.clone(), POLL);
    let handle = monitor.start(resnet_config()).await.unwrap();

    tokio::time::sleep(POLL + Duration::from_millis(1)).await;
    assert_eq!(gateway.status_calls(), 1);

    monitor.cancel();
    tokio::time::sleep(POLL * 4).await;
    assert_eq!(gateway.status_calls(), 1);
    assert_eq!(handle.wait().await, None);
}

#[tokio::test]
async fn collected_samples_carry_their_labels() {
    let gateway = Arc::new(ScriptedTrainingGateway::accepting("t1"));
    let mut collector = SampleCollector::new(gateway.clone());

    collector
        .add(vec![
            (image("mel.jpg"), "Melanoma".to_string()),
            (image("nev.jpg"), " Nevus ".to_string()),
        ])
        .unwrap();
    let summary = collector.upload_pending().await;

    assert_eq!(summary.total(), 2);
    assert_eq!(collector.saved_count(), 2);
    assert_eq!(gateway.collected_labels(), vec!["Melanoma", "Nevus"]);
}
