//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs logging,
//! creates the tokio runtime, dispatches to a command and prints every error.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use dermascan_utils::logging::init_tracing;

use super::args::{Cli, Commands, TrainCommands};
use super::commands;
use crate::{CliArgs, Config, DermaError, ExitCode};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has been printed; `main` only maps
/// it to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    let cli_args = cli_args_from(&cli);

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(&err)),
    };

    if let Err(e) = init_tracing(config.verbose()) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let operation = cli.command.operation();
    let json = cli.json;

    let result = rt.block_on(async {
        match cli.command {
            Commands::Health => commands::execute_health_command(&config, json).await,
            Commands::Analyze { files } => {
                commands::execute_analyze_command(&files, &config, json).await
            }
            Commands::Classes => commands::execute_classes_command(&config, json).await,
            Commands::Train(TrainCommands::Start { detach, .. }) => {
                commands::execute_train_start_command(detach, &config, json).await
            }
            Commands::Train(TrainCommands::Status { task_id }) => {
                commands::execute_train_status_command(&task_id, &config, json).await
            }
            Commands::Collect { label, files } => {
                commands::execute_collect_command(&label, &files, &config, json).await
            }
            Commands::Config => commands::execute_config_command(&config, json),
        }
    });

    if let Err(error) = result {
        debug!(operation, "Command failed");
        return Err(report_error(&error));
    }

    Ok(())
}

/// Arguments that take part in configuration precedence.
///
/// Training parameters only come from `train start`; `--verbose` only
/// overrides the file when it is set.
pub(crate) fn cli_args_from(cli: &Cli) -> CliArgs {
    let (epochs, batch_size, model_type) = match &cli.command {
        Commands::Train(TrainCommands::Start {
            epochs,
            batch_size,
            model_type,
            ..
        }) => (*epochs, *batch_size, model_type.clone()),
        _ => (None, None, None),
    };

    CliArgs {
        config_path: cli.config.clone(),
        base_url: cli.base_url.clone(),
        verbose: cli.verbose.then_some(true),
        epochs,
        batch_size,
        model_type,
    }
}

/// Print `error` for the user and pick the exit code.
pub(crate) fn report_error(error: &anyhow::Error) -> ExitCode {
    if let Some(derma_error) = error.downcast_ref::<DermaError>() {
        eprintln!("{}", derma_error.display_for_user());
        derma_error.to_exit_code()
    } else {
        eprintln!("✗ Unexpected error: {error:#}");
        eprintln!("\n  Run with --verbose for more detailed output");
        ExitCode::INTERNAL
    }
}
