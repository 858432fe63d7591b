//! dermascan - batch skin-lesion analysis and training-job supervision
//!
//! dermascan talks to a remote classification server. It gates work on the
//! server's health, submits images one at a time with a fixed pause between
//! requests, and follows remote training jobs by polling them until they
//! reach a terminal state.
//!
//! dermascan can be used in two ways:
//! - **CLI**: run `dermascan analyze photo.jpg` or `dermascan train start`
//! - **Library**: drive [`AnalysisOrchestrator`] and [`TrainingJobMonitor`]
//!   directly with your own gateway implementations
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Is the server up?
//! dermascan health
//!
//! # Analyze a batch of images
//! dermascan analyze lesion-1.jpg lesion-2.jpg --json
//!
//! # Start a training job and follow it to completion
//! dermascan train start --epochs 30 --batch-size 16 --model-type resnet50
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use dermascan::{AnalysisOrchestrator, Config, ConnectionMonitor, ImagePayload};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().base_url("http://127.0.0.1:5000").build()?;
//! let gateways = dermascan::from_config(&config)?;
//!
//! let monitor = ConnectionMonitor::new(gateways.health_primary, gateways.health_fallback);
//! let mut orchestrator =
//!     AnalysisOrchestrator::new(gateways.analysis, config.inter_request_delay());
//!
//! orchestrator.enqueue(vec![ImagePayload::new("lesion.jpg", std::fs::read("lesion.jpg")?)])?;
//! let outcome = orchestrator.run_batch(monitor.check().await).await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! # JSON Output
//!
//! Every `--json` output is emitted in JCS (RFC 8785) canonical form. Use
//! [`emit_jcs`] for the same encoding in your own integrations.

mod canonical;
pub mod cli;

pub use canonical::emit_jcs;

pub use dermascan_config::{CliArgs, Config, ConfigBuilder};
pub use dermascan_engine::{
    AnalysisOrchestrator, BatchOutcome, BatchSummary, ConnectionMonitor, ConnectionState,
    FixedDelay, HealthCheck, ImageRecord, ImageStatus, NoDelay, RecordId, RecordOutcome,
    RecordSnapshot, SampleCollector, SampleStatus, SequentialDispatcher, ThrottlePolicy,
    TrainingEvent, TrainingHandle, TrainingJob, TrainingJobMonitor, TrainingOutcome,
    TrainingSample,
};
pub use dermascan_gateway::{
    AnalysisGateway, ClassLabel, Diagnosis, Gateways, HealthGateway, HealthReport, ImagePayload,
    ModelType, TaskId, TrainingConfig, TrainingGateway, TrainingStatus, TrainingStatusReport,
    from_config,
};
pub use dermascan_utils::error::{
    ConfigError, DermaError, GatewayError, UserFriendlyError, ValidationError,
};
pub use dermascan_utils::exit_codes::ExitCode;
pub use dermascan_utils::types::{ConfigSource, FailureKind};

