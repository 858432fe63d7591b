//! `dermascan collect`

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{print_json, read_images};
use crate::cli::labels;
use crate::{BatchSummary, Config, DermaError, SampleCollector, TrainingSample, from_config};

#[derive(Serialize)]
struct CollectOutput<'a> {
    #[serde(flatten)]
    summary: BatchSummary,
    samples: &'a [TrainingSample],
}

pub async fn execute_collect_command(
    label: &str,
    files: &[PathBuf],
    config: &Config,
    json: bool,
) -> Result<()> {
    let images = read_images(files).await?;

    let gateways = from_config(config).map_err(DermaError::from)?;
    let mut collector = SampleCollector::new(gateways.training);
    collector
        .add(
            images
                .into_iter()
                .map(|image| (image, label.to_string()))
                .collect(),
        )
        .map_err(DermaError::from)?;

    let summary = collector.upload_pending().await;

    if json {
        print_json(&CollectOutput {
            summary,
            samples: collector.samples(),
        })?;
    } else {
        for sample in collector.samples() {
            let status = labels::sample_status(sample.status);
            match (&sample.sample_id, &sample.error) {
                (Some(id), _) => println!("✓ {} [{}]: {status} as {id}", sample.name, sample.label),
                (None, Some(error)) => println!("✗ {} [{}]: {status}: {error}", sample.name, sample.label),
                (None, None) => println!("- {} [{}]: {status}", sample.name, sample.label),
            }
        }
        println!("\n{} saved, {} failed", summary.succeeded, summary.failed);
    }

    if summary.failed > 0 {
        return Err(DermaError::PartialBatch {
            failed: summary.failed,
            total: summary.total(),
        }
        .into());
    }
    Ok(())
}
