//! CLI command implementations for unostat.
//!
//! This module provides implementations for all CLI subcommands:
//! - `collect`: Metrics collection into CSV files
//! - `visualize`: JSON API over recorded files
//! - `list-devices`: Disk and interface listing
//! - `check`: System validation
//! - `test`: Foreground sampling test
//! - `config`: Configuration file generation

pub mod check;
pub mod collect;
pub mod config;
pub mod list_devices;
pub mod visualize;

// Re-export command functions
pub use check::command_check;
pub use collect::command_collect;
pub use config::{command_config, show_config};
pub use list_devices::command_list_devices;
pub use test::command_test;
pub use visualize::command_visualize;
