//! CLI arguments and subcommands for unostat.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands, and merges CLI overrides into the
//! loaded configuration.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use unostat::config::{load_config, parse_duration_secs, split_list, Config, ConfigFormat};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "unostat",
    about = "Resource-utilization telemetry agent with CSV output",
    long_about = "Resource-utilization telemetry agent with CSV output.\n\n\
                  Samples CPU, memory, disk and network counters at a fixed interval, \
                  turns them into utilization figures and appends them to a rotated CSV \
                  file. Recorded files can be browsed through a small JSON API.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Options of the `collect` subcommand. Also used when no subcommand is given.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Sampling interval (e.g. 30, 30s, 5m)
    #[arg(short = 'i', long, value_parser = parse_duration_secs)]
    pub interval: Option<u64>,

    /// Output CSV file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of rows buffered before a flush
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Maximum time between flushes (e.g. 5, 5s, 1m)
    #[arg(long, value_parser = parse_duration_secs)]
    pub flush_interval: Option<u64>,

    /// Rotate the output file once it reaches this size
    #[arg(long)]
    pub max_file_size_mb: Option<u64>,

    /// Only record these disks (comma-separated)
    #[arg(long)]
    pub include_disks: Option<String>,

    /// Never record these disks (comma-separated)
    #[arg(long)]
    pub exclude_disks: Option<String>,

    /// Only record these network interfaces (comma-separated)
    #[arg(long)]
    pub include_networks: Option<String>,

    /// Never record these network interfaces (comma-separated)
    #[arg(long)]
    pub exclude_networks: Option<String>,

    /// Timezone for the Timestamp column ("Local" or an IANA name)
    #[arg(long)]
    pub timezone: Option<String>,
}

impl CollectArgs {
    fn apply(&self, config: &mut Config) {
        if self.interval.is_some() {
            config.interval = self.interval;
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if self.buffer_size.is_some() {
            config.buffer_size = self.buffer_size;
        }
        if self.flush_interval.is_some() {
            config.flush_interval = self.flush_interval;
        }
        if self.max_file_size_mb.is_some() {
            config.max_file_size_mb = self.max_file_size_mb;
        }

        // Parse comma-separated include/exclude names
        if let Some(list) = &self.include_disks {
            config.include_disks = Some(split_list(list));
        }
        if let Some(list) = &self.exclude_disks {
            config.exclude_disks = Some(split_list(list));
        }
        if let Some(list) = &self.include_networks {
            config.include_networks = Some(split_list(list));
        }
        if let Some(list) = &self.exclude_networks {
            config.exclude_networks = Some(split_list(list));
        }

        if let Some(tz) = &self.timezone {
            config.timezone = Some(tz.clone());
        }
    }
}

/// Options of the `visualize` subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct VisualizeArgs {
    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<String>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Directory holding uploaded CSV files
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,
}

impl VisualizeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.bind = Some(bind.clone());
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = Some(dir.clone());
        }
    }
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect metrics into a CSV file until interrupted (default)
    Collect(CollectArgs),

    /// Serve recorded CSV files through the JSON API
    Visualize(VisualizeArgs),

    /// List disks and network interfaces usable in filters
    ListDevices,

    /// Check that every counter source is readable
    Check,

    /// Run a few sampling ticks and print the snapshots
    Test {
        /// Number of sampling ticks after the baseline
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,

        /// Time between ticks (e.g. 1, 2s)
        #[arg(short = 'i', long, value_parser = parse_duration_secs, default_value = "1")]
        interval: u64,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}

/// Builds the effective configuration: CLI flag > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref()).context("Failed to load configuration")?
    };

    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if let Some(path) = &args.log_file {
        config.log_file = Some(path.clone());
    }

    match &args.command {
        Some(Commands::Collect(collect)) => collect.apply(&mut config),
        Some(Commands::Visualize(visualize)) => visualize.apply(&mut config),
        _ => {}
    }

    // Defaults are fixed here once; the generated output name embeds the time.
    Ok(config.fill_defaults())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_collect_overrides() {
        let args = parse(&[
            "unostat",
            "--no-config",
            "collect",
            "--interval",
            "5m",
            "--include-disks",
            "sda, ,nvme0n1",
            "--timezone",
            "UTC",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.interval, Some(300));
        assert_eq!(
            config.include_disks,
            Some(vec!["sda".to_string(), "nvme0n1".to_string()])
        );
        assert_eq!(config.timezone(), "UTC");
        assert!(config.output.is_some());
    }

    #[test]
    fn test_defaults_without_subcommand() {
        let args = parse(&["unostat", "--no-config", "--log-level", "debug"]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.interval, Some(30));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        assert!(Args::try_parse_from(["unostat", "collect", "--interval", "soon"]).is_err());
    }

    #[test]
    fn test_visualize_overrides() {
        let args = parse(&["unostat", "--no-config", "visualize", "-p", "9000"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.port(), 9000);
    }
}
