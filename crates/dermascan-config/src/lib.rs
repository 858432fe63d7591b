//! Configuration management for dermascan
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. Supports a TOML file with `[server]`, `[health]`,
//! `[analysis]`, `[training]` and `[logging]` sections.

mod config;

pub use config::*;
pub use dermascan_utils::error;
pub use dermascan_utils::types;
