use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

use super::args::{Cli, Commands, TrainCommands};
use super::commands::{display_name, training_config_from};
use super::labels;
use super::run::{cli_args_from, report_error};
use crate::{
    Config, ConfigError, DermaError, Diagnosis, ExitCode, GatewayError, ImageStatus, ModelType,
    TrainingStatus,
};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args.iter().copied()).expect("arguments should parse")
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn global_flags_are_accepted_after_subcommand() {
    let cli = parse(&[
        "dermascan",
        "health",
        "--base-url",
        "http://10.0.0.5:5000",
        "--json",
        "-v",
    ]);
    assert!(matches!(cli.command, Commands::Health));
    assert!(cli.json);
    assert!(cli.verbose);
    assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.5:5000"));
}

#[test]
fn analyze_requires_files() {
    assert!(Cli::try_parse_from(["dermascan", "analyze"]).is_err());

    let cli = parse(&["dermascan", "analyze", "a.jpg", "b.jpg"]);
    match cli.command {
        Commands::Analyze { files } => {
            assert_eq!(files, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn collect_requires_label() {
    assert!(Cli::try_parse_from(["dermascan", "collect", "a.jpg"]).is_err());

    let cli = parse(&["dermascan", "collect", "--label", "Melanoma", "a.jpg"]);
    assert_eq!(cli.command.operation(), "collect");
}

#[test]
fn train_start_flags_feed_config_precedence() {
    let cli = parse(&[
        "dermascan",
        "train",
        "start",
        "--epochs",
        "5",
        "--batch-size",
        "8",
        "--model-type",
        "efficientnet",
        "--detach",
    ]);
    assert!(matches!(
        cli.command,
        Commands::Train(TrainCommands::Start { detach: true, .. })
    ));

    let args = cli_args_from(&cli);
    assert_eq!(args.epochs, Some(5));
    assert_eq!(args.batch_size, Some(8));
    assert_eq!(args.model_type.as_deref(), Some("efficientnet"));
    assert_eq!(args.verbose, None);
}

#[test]
fn training_flags_ignored_outside_train_start() {
    let cli = parse(&["dermascan", "train", "status", "t1", "--verbose"]);
    let args = cli_args_from(&cli);
    assert_eq!(args.epochs, None);
    assert_eq!(args.model_type, None);
    assert_eq!(args.verbose, Some(true));
    assert_eq!(cli.command.operation(), "train status");
}

#[test]
fn training_config_uses_effective_values() {
    let config = Config::builder()
        .epochs(12)
        .batch_size(4)
        .model_type("efficientnet")
        .build()
        .unwrap();
    let training = training_config_from(&config).unwrap();
    assert_eq!(training.epochs, 12);
    assert_eq!(training.batch_size, 4);
    assert_eq!(training.model_type, ModelType::Efficientnet);

    let defaults = training_config_from(&Config::builder().build().unwrap()).unwrap();
    assert_eq!(defaults.model_type, ModelType::Resnet50);
}

#[test]
fn display_name_uses_file_name() {
    assert_eq!(display_name(Path::new("/tmp/scans/lesion-1.jpg")), "lesion-1.jpg");
    assert_eq!(display_name(Path::new("lesion.png")), "lesion.png");
}

#[test]
fn labels_cover_every_state() {
    assert_eq!(labels::image_status(ImageStatus::Uploaded), "Waiting");
    assert_eq!(labels::image_status(ImageStatus::Failed), "Failed");
    assert_eq!(labels::training_status(TrainingStatus::Running), "Training");
    assert_eq!(labels::class_name("Melanoma", Some("U hắc tố")), "Melanoma (U hắc tố)");
    assert_eq!(labels::class_name("Melanoma", Some("")), "Melanoma");
    assert_eq!(labels::class_name("Nevus", None), "Nevus");
}

#[test]
fn diagnosis_label_has_one_decimal() {
    let diagnosis = Diagnosis {
        label: "Nevus".to_string(),
        localized_label: None,
        confidence: 87.456,
        candidates: Vec::new(),
        model_info: None,
    };
    assert_eq!(labels::diagnosis(&diagnosis), "Nevus 87.5%");
}

#[test]
fn report_error_maps_exit_codes() {
    let connection = anyhow::Error::from(DermaError::Connection("down".to_string()));
    assert_eq!(report_error(&connection), ExitCode::CONNECTION);

    let gateway = anyhow::Error::from(DermaError::from(GatewayError::remote("bad image")));
    assert_eq!(report_error(&gateway), ExitCode::GATEWAY_FAILURE);

    let config = anyhow::Error::from(DermaError::from(ConfigError::InvalidFile(
        "oops".to_string(),
    )))
    .context("Failed to load config file");
    assert_eq!(report_error(&config), ExitCode::CLI_ARGS);

    let other = anyhow::anyhow!("something else");
    assert_eq!(report_error(&other), ExitCode::INTERNAL);
}
