//! CLI command implementations.
//!
//! Every handler returns `anyhow::Result<()>`; failures that should map to a
//! specific exit code are raised as `DermaError`.

mod analyze;
mod classes;
mod collect;
mod common;
mod config_cmd;
mod health;
mod train;

pub use analyze::execute_analyze_command;
pub use classes::execute_classes_command;
pub use collect::execute_collect_command;
pub use config_cmd::execute_config_command;
pub use health::execute_health_command;
pub use train::{execute_train_start_command, execute_train_status_command};

#[cfg(test)]
pub(crate) use common::{display_name, training_config_from};
