//! Logging and observability infrastructure for dermascan
//!
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber once through [`init_tracing`]. The helpers below keep field
//! names consistent between the analysis orchestrator and the training
//! monitor so log lines can be filtered by `batch`, `record_id` or `task_id`.

use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize tracing subscriber for structured logging
///
/// Compact, target-less output by default. Verbose mode enables debug events
/// from the dermascan crates, targets, and span-close timing. `RUST_LOG`
/// always wins when set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("dermascan=debug,dermascan_engine=debug,dermascan_gateway=debug,info")
            } else {
                EnvFilter::try_new("dermascan=info,dermascan_engine=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one `run_batch` invocation.
pub fn batch_span(batch: &str, pending: usize) -> tracing::Span {
    span!(Level::INFO, "batch", batch = %batch, pending = pending)
}

/// Span wrapping the poll loop of one training job.
pub fn job_span(task_id: &str) -> tracing::Span {
    span!(Level::INFO, "training_job", task_id = %task_id)
}

pub fn log_batch_start(batch: &str, pending: usize, skipped: usize) {
    info!(
        batch = %batch,
        pending = pending,
        skipped = skipped,
        "Starting batch dispatch"
    );
}

pub fn log_batch_complete(batch: &str, succeeded: usize, failed: usize, duration_ms: u128) {
    info!(
        batch = %batch,
        succeeded = succeeded,
        failed = failed,
        duration_ms = %duration_ms,
        "Batch dispatch completed"
    );
}

pub fn log_item_failed(batch: &str, item: &str, error: &str) {
    warn!(
        batch = %batch,
        item = %item,
        error = %error,
        "Item failed, continuing with next"
    );
}

pub fn log_job_terminal(task_id: &str, status: &str, error: Option<&str>) {
    match error {
        Some(error) => warn!(task_id = %task_id, status = %status, error = %error, "Training job finished"),
        None => info!(task_id = %task_id, status = %status, "Training job finished"),
    }
}
