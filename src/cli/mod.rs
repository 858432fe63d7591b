//! Command-line interface for dermascan
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, configuration discovery, and command dispatch
//! - `commands`: command implementations
//! - `labels`: human-readable labels for engine states

pub mod args;
mod commands;
mod labels;
mod run;

#[cfg(test)]
mod tests;

pub use args::{Cli, Commands, TrainCommands};
pub use run::run;
