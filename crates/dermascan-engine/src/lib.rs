//! Client-side orchestration for dermascan.
//!
//! [`ConnectionMonitor`] gates analysis on server health,
//! [`AnalysisOrchestrator`] owns the image records and drives sequential
//! batches, [`TrainingJobMonitor`] polls one remote training job at a time
//! and [`SampleCollector`] uploads labeled training samples.

// Re-export shared crates so callers need only one dependency.
pub use dermascan_gateway as gateway;
pub use dermascan_utils::error;
pub use dermascan_utils::logging;

pub mod analysis;
pub mod collector;
pub mod connection;
pub mod dispatcher;
pub mod records;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod training;

pub use analysis::{AnalysisOrchestrator, BatchOutcome};
pub use collector::{SampleCollector, SampleStatus, TrainingSample};
pub use connection::{ConnectionMonitor, ConnectionState, HealthCheck};
pub use dispatcher::{BatchSummary, FixedDelay, NoDelay, SequentialDispatcher, ThrottlePolicy};
pub use records::{ImageRecord, ImageStatus, RecordId, RecordOutcome, RecordSnapshot};
pub use training::{
    TrainingEvent, TrainingHandle, TrainingJob, TrainingJobMonitor, TrainingOutcome,
    UNKNOWN_FAILURE,
};
