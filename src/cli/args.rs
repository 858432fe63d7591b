//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dermascan - skin-lesion analysis client
#[derive(Parser, Debug)]
#[command(name = "dermascan")]
#[command(about = "Batch skin-lesion analysis and training-job supervision client")]
#[command(long_about = r#"
dermascan submits skin-lesion images to a classification server one at a time,
and starts and follows model-training jobs on that server.

EXAMPLES:
  # Check that the server is reachable
  dermascan health

  # Analyze images (sequentially, with a pause between requests)
  dermascan analyze lesion-1.jpg lesion-2.jpg

  # List the classes the model can predict
  dermascan classes --json

  # Upload labeled training samples
  dermascan collect --label Melanoma mel-1.jpg mel-2.jpg

  # Start training and follow it until it finishes (Ctrl-C stops following)
  dermascan train start --epochs 30 --batch-size 16 --model-type resnet50

  # Query a job once
  dermascan train status 3f2a9c

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file: --config, else $DERMASCAN_HOME/config.toml, else the nearest
  .dermascan/config.toml found searching upward from the current directory
  Run `dermascan config` to see effective values and where they came from
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the analysis server, e.g. http://127.0.0.1:5000
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit canonical JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe the server health endpoints
    Health,

    /// Analyze one or more images
    Analyze {
        /// Image files to submit, analyzed in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the classes the model can predict
    Classes,

    /// Start or inspect training jobs
    #[command(subcommand)]
    Train(TrainCommands),

    /// Upload labeled training samples
    Collect {
        /// Diagnosis label applied to every file
        #[arg(long)]
        label: String,

        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the effective configuration and value sources
    Config,
}

#[derive(Subcommand, Debug)]
pub enum TrainCommands {
    /// Start a training job and follow it until it finishes
    Start {
        /// Number of training epochs
        #[arg(long)]
        epochs: Option<u32>,

        /// Training batch size
        #[arg(long)]
        batch_size: Option<u32>,

        /// Model architecture: resnet50 or efficientnet
        #[arg(long)]
        model_type: Option<String>,

        /// Print the task id and exit without following the job
        #[arg(long)]
        detach: bool,
    },

    /// Query the status of a training job once
    Status {
        /// Task id returned by `train start`
        task_id: String,
    },
}

impl Commands {
    /// Operation name used in log fields and error reports.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Analyze { .. } => "analyze",
            Self::Classes => "classes",
            Self::Train(TrainCommands::Start { .. }) => "train start",
            Self::Train(TrainCommands::Status { .. }) => "train status",
            Self::Collect { .. } => "collect",
            Self::Config => "config",
        }
    }
}
