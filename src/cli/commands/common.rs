//! Helpers shared by the command handlers.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{Config, DermaError, ImagePayload, ModelType, TrainingConfig, emit_jcs};

/// Print `value` as one line of canonical JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", emit_jcs(value)?);
    Ok(())
}

/// File name shown in output and sent to the server as the upload name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every file up front, in order. The first unreadable file aborts.
pub async fn read_images(paths: &[PathBuf]) -> Result<Vec<ImagePayload>, DermaError> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DermaError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            ))
        })?;
        images.push(ImagePayload::new(display_name(path), bytes));
    }
    Ok(images)
}

/// Training parameters from the effective configuration.
pub fn training_config_from(config: &Config) -> Result<TrainingConfig, DermaError> {
    let model_type: ModelType = config.model_type().parse()?;
    Ok(TrainingConfig {
        epochs: config.epochs(),
        batch_size: config.batch_size(),
        model_type,
    })
}
