//! `dermascan train start` and `dermascan train status`

use anyhow::Result;
use serde::Serialize;

use dermascan_engine::UNKNOWN_FAILURE;

use super::common::{print_json, training_config_from};
use crate::cli::labels;
use crate::{
    Config, DermaError, TaskId, TrainingEvent, TrainingJob, TrainingJobMonitor, TrainingOutcome,
    TrainingStatus, TrainingStatusReport, ValidationError, from_config,
};

#[derive(Serialize)]
struct TrainOutput {
    job: TrainingJob,
    /// `None` when following was cancelled before the job ended
    outcome: Option<TrainingOutcome>,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    task_id: &'a TaskId,
    #[serde(flatten)]
    report: &'a TrainingStatusReport,
}

pub async fn execute_train_start_command(detach: bool, config: &Config, json: bool) -> Result<()> {
    let training_config = training_config_from(config)?;
    let gateways = from_config(config).map_err(DermaError::from)?;
    let mut monitor = TrainingJobMonitor::new(gateways.training, config.poll_interval());

    let mut handle = monitor.start(training_config).await?;
    let task_id = handle.task_id().clone();

    if detach {
        if json {
            print_json(&TrainOutput {
                job: handle.snapshot(),
                outcome: None,
            })?;
        } else {
            println!("Started training job {task_id}");
        }
        return Ok(());
    }

    if !json {
        println!(
            "Started training job {task_id} ({} epochs, batch size {}, {})",
            training_config.epochs, training_config.batch_size, training_config.model_type
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(TrainingEvent::Progress(job)) => {
                    if !json {
                        println!("  {} {:.0}%", labels::training_status(job.status), job.progress);
                    }
                }
                Some(TrainingEvent::PollFailed(message)) => {
                    if !json {
                        eprintln!("  ! status poll failed, retrying: {message}");
                    }
                }
                Some(TrainingEvent::Terminal(outcome)) => break Some(outcome),
                None => break None,
            },
            _ = &mut ctrl_c => {
                monitor.cancel();
                break None;
            }
        }
    };

    let job = handle.snapshot();
    if json {
        print_json(&TrainOutput {
            job,
            outcome: outcome.clone(),
        })?;
    } else {
        match &outcome {
            Some(TrainingOutcome::Completed) => println!("✓ Training job {task_id} completed"),
            Some(TrainingOutcome::Failed(message)) => {
                println!("✗ Training job {task_id} failed: {message}");
            }
            None => println!(
                "Stopped following job {task_id} at {:.0}%; it may still be running on the server",
                job.progress
            ),
        }
    }

    match outcome {
        Some(TrainingOutcome::Failed(message)) => Err(DermaError::TrainingFailed {
            task_id: task_id.to_string(),
            message,
        }
        .into()),
        _ => Ok(()),
    }
}

pub async fn execute_train_status_command(task_id: &str, config: &Config, json: bool) -> Result<()> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(DermaError::from(ValidationError::new("task_id", "must not be empty")).into());
    }
    let task_id = TaskId::new(task_id);

    let gateways = from_config(config).map_err(DermaError::from)?;
    let report = gateways
        .training
        .status(&task_id)
        .await
        .map_err(DermaError::from)?;

    if json {
        print_json(&StatusOutput {
            task_id: &task_id,
            report: &report,
        })?;
    } else {
        println!(
            "Job {task_id}: {} {:.0}%",
            labels::training_status(report.status),
            report.progress
        );
        if let Some(started_at) = &report.started_at {
            println!("  Started: {started_at}");
        }
        if let Some(error) = &report.error {
            println!("  Error: {error}");
        }
    }

    if report.status == TrainingStatus::Failed {
        return Err(DermaError::TrainingFailed {
            task_id: task_id.to_string(),
            message: report.error.unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
        }
        .into());
    }
    Ok(())
}
