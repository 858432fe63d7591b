//! `dermascan analyze`

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{print_json, read_images};
use crate::cli::labels;
use crate::{
    AnalysisOrchestrator, BatchOutcome, Config, ConnectionMonitor, ConnectionState, DermaError,
    ImageRecord, RecordOutcome, from_config,
};

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    connection: ConnectionState,
    #[serde(flatten)]
    outcome: BatchOutcome,
    records: Vec<&'a ImageRecord>,
}

pub async fn execute_analyze_command(files: &[PathBuf], config: &Config, json: bool) -> Result<()> {
    let images = read_images(files).await?;

    let gateways = from_config(config).map_err(DermaError::from)?;
    let monitor = ConnectionMonitor::new(gateways.health_primary, gateways.health_fallback);
    let mut orchestrator = AnalysisOrchestrator::new(gateways.analysis, config.inter_request_delay());

    orchestrator.enqueue(images).map_err(DermaError::from)?;

    let connection = monitor.check().await;
    let outcome = orchestrator.run_batch(connection).await;
    let snapshot = orchestrator.snapshot();

    if json {
        print_json(&AnalyzeOutput {
            connection,
            outcome,
            records: snapshot.records.iter().map(|record| record.as_ref()).collect(),
        })?;
    } else if let BatchOutcome::Completed(summary) = outcome {
        for record in &snapshot.records {
            match record.outcome() {
                RecordOutcome::Analyzed(diagnosis) => {
                    println!("✓ {}: {}", record.name(), labels::diagnosis(diagnosis));
                    for candidate in diagnosis.candidates.iter().skip(1).take(2) {
                        println!(
                            "    {} {:.1}%",
                            labels::class_name(&candidate.label, candidate.localized_label.as_deref()),
                            candidate.confidence
                        );
                    }
                }
                RecordOutcome::Failed(message) => println!("✗ {}: {message}", record.name()),
                RecordOutcome::Pending => {
                    println!("- {}: {}", record.name(), labels::image_status(record.status()));
                }
            }
        }
        println!(
            "\n{} analyzed, {} failed",
            summary.succeeded, summary.failed
        );
    }

    match outcome {
        BatchOutcome::BlockedByConnection => Err(DermaError::Connection(
            "analysis server is unreachable; no image was submitted".to_string(),
        )
        .into()),
        BatchOutcome::Completed(summary) if summary.failed > 0 => Err(DermaError::PartialBatch {
            failed: summary.failed,
            total: summary.total(),
        }
        .into()),
        _ => Ok(()),
    }
}
