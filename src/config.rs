//! Configuration management for unostat.
//!
//! This module handles loading and validating configuration files and turning
//! the effective values into collector, exporter and store settings. It
//! supports YAML, JSON, and TOML formats. Every field is optional; unset
//! fields fall back to the built-in defaults below.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::collector::{CollectorSettings, DeviceFilter};
use crate::exporter::{ExportSettings, OutputZone};

// Default configuration constants
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 150;
pub const DEFAULT_TIMEZONE: &str = "Local";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

const MIN_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 3600;
const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Default config file locations, tried in order.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/unostat/unostat.yaml",
    "/etc/unostat/unostat.yml",
    "./unostat.yaml",
    "./unostat.yml",
    "./unostat.json",
];

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Configuration errors. All of them are fatal before collection starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("interval must be between {min}s and {max}s, got {got}s")]
    Interval { got: u64, min: u64, max: u64 },

    #[error("output path must not be empty")]
    EmptyOutput,

    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("output directory is not a directory: {0}")]
    OutputDirNotDir(PathBuf),

    #[error("buffer size must be at least 1")]
    BufferSize,

    #[error("flush interval must be at least 1s")]
    FlushInterval,

    #[error("max file size must be at least 1 MB")]
    MaxFileSize,

    #[error("invalid log level '{0}', expected one of off, error, warn, info, debug, trace")]
    LogLevel(String),

    #[error("invalid timezone '{name}': {reason}")]
    Timezone { name: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Collection
    /// Sampling interval in seconds
    pub interval: Option<u64>,
    /// Device filters; the `/dev/` prefix is optional
    #[serde(alias = "include-disks")]
    pub include_disks: Option<Vec<String>>,
    #[serde(alias = "exclude-disks")]
    pub exclude_disks: Option<Vec<String>>,
    #[serde(alias = "include-networks")]
    pub include_networks: Option<Vec<String>>,
    #[serde(alias = "exclude-networks")]
    pub exclude_networks: Option<Vec<String>>,

    // Export
    pub output: Option<PathBuf>,
    #[serde(alias = "buffer-size")]
    pub buffer_size: Option<usize>,
    /// Flush interval in seconds
    #[serde(alias = "flush-interval")]
    pub flush_interval: Option<u64>,
    #[serde(alias = "max-file-size-mb")]
    pub max_file_size_mb: Option<u64>,
    /// `Local` or an IANA timezone name
    pub timezone: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
    #[serde(alias = "log-file")]
    pub log_file: Option<PathBuf>,

    // Visualization server
    pub bind: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "upload-dir")]
    pub upload_dir: Option<PathBuf>,
}

impl Config {
    /// A config with every field set to its default.
    pub fn with_defaults() -> Self {
        Self {
            interval: Some(DEFAULT_INTERVAL_SECS),
            include_disks: Some(Vec::new()),
            exclude_disks: Some(Vec::new()),
            include_networks: Some(Vec::new()),
            exclude_networks: Some(Vec::new()),
            output: Some(default_output_path()),
            buffer_size: Some(DEFAULT_BUFFER_SIZE),
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL_SECS),
            max_file_size_mb: Some(DEFAULT_MAX_FILE_SIZE_MB),
            timezone: Some(DEFAULT_TIMEZONE.to_string()),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            log_file: None,
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            upload_dir: Some(executable_dir().join(DEFAULT_UPLOAD_DIR)),
        }
    }

    /// Fills every unset field with its default.
    pub fn fill_defaults(mut self) -> Self {
        let d = Self::with_defaults();
        self.interval = self.interval.or(d.interval);
        self.include_disks = self.include_disks.or(d.include_disks);
        self.exclude_disks = self.exclude_disks.or(d.exclude_disks);
        self.include_networks = self.include_networks.or(d.include_networks);
        self.exclude_networks = self.exclude_networks.or(d.exclude_networks);
        self.output = self.output.or(d.output);
        self.buffer_size = self.buffer_size.or(d.buffer_size);
        self.flush_interval = self.flush_interval.or(d.flush_interval);
        self.max_file_size_mb = self.max_file_size_mb.or(d.max_file_size_mb);
        self.timezone = self.timezone.or(d.timezone);
        self.log_level = self.log_level.or(d.log_level);
        self.log_file = self.log_file.or(d.log_file);
        self.bind = self.bind.or(d.bind);
        self.port = self.port.or(d.port);
        self.upload_dir = self.upload_dir.or(d.upload_dir);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS))
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(default_output_path)
    }

    pub fn timezone(&self) -> &str {
        self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| executable_dir().join(DEFAULT_UPLOAD_DIR))
    }

    pub fn disk_filter(&self) -> DeviceFilter {
        DeviceFilter::new(
            self.include_disks.iter().flatten(),
            self.exclude_disks.iter().flatten(),
        )
    }

    pub fn network_filter(&self) -> DeviceFilter {
        DeviceFilter::new(
            self.include_networks.iter().flatten(),
            self.exclude_networks.iter().flatten(),
        )
    }

    /// Collector settings for this configuration on the current platform.
    pub fn collector_settings(&self) -> CollectorSettings {
        let mut settings = CollectorSettings::new(self.interval());
        settings.disk_filter = self.disk_filter();
        settings.network_filter = self.network_filter();
        settings
    }

    pub fn export_settings(&self) -> ExportSettings {
        let mut settings = ExportSettings::new(self.output_path());
        settings.buffer_size = self.buffer_size();
        settings.flush_interval = self.flush_interval();
        settings.rotate_bytes =
            self.max_file_size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB) * 1024 * 1024;
        settings.timezone = self.timezone().to_string();
        settings
    }
}

/// Directory of the running executable, or the current directory when it
/// cannot be determined.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn hostname() -> String {
    fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unostat".to_string())
}

/// `<hostname>_<YYYYMMDDHHMMSS>.csv` next to the executable.
pub fn default_output_path() -> PathBuf {
    let name = format!("{}_{}.csv", hostname(), Local::now().format("%Y%m%d%H%M%S"));
    executable_dir().join(name)
}

/// Splits a comma-separated CLI list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses a duration given as plain seconds (`30`) or with a unit suffix
/// (`30s`, `5m`, `1h`).
pub fn parse_duration_secs(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let (number, multiplier) = match value.chars().last() {
        Some('s') => (&value[..value.len() - 1], 1),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('h') => (&value[..value.len() - 1], 3600),
        _ => (value, 1),
    };

    let n = number
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid duration '{}', expected e.g. 30, 30s, 5m or 1h", value))?;
    n.checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{}' is too large", value))
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    let interval = cfg.interval.unwrap_or(DEFAULT_INTERVAL_SECS);
    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval) {
        return Err(ConfigError::Interval {
            got: interval,
            min: MIN_INTERVAL_SECS,
            max: MAX_INTERVAL_SECS,
        });
    }

    let output = cfg.output_path();
    if output.as_os_str().is_empty() {
        return Err(ConfigError::EmptyOutput);
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        match fs::metadata(parent) {
            Ok(meta) if !meta.is_dir() => {
                return Err(ConfigError::OutputDirNotDir(parent.to_path_buf()))
            }
            Ok(_) => {}
            Err(_) => return Err(ConfigError::OutputDirMissing(parent.to_path_buf())),
        }
    }

    if cfg.buffer_size() < 1 {
        return Err(ConfigError::BufferSize);
    }
    if cfg.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS) < 1 {
        return Err(ConfigError::FlushInterval);
    }
    if cfg.max_file_size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB) < 1 {
        return Err(ConfigError::MaxFileSize);
    }

    let level = cfg.log_level().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::LogLevel(cfg.log_level().to_string()));
    }

    OutputZone::resolve(cfg.timezone()).map_err(|e| ConfigError::Timezone {
        name: cfg.timezone().to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Loads a config file, or the first default location that exists. Returns
/// an empty config (all defaults) when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let parse_err = |reason: String| ConfigError::Parse {
        path: path.clone(),
        reason,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(dir: &Path) -> Config {
        Config {
            output: Some(dir.join("out.csv")),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_effective_config(&valid_config(dir.path())).is_ok());
    }

    #[test]
    fn test_interval_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());

        cfg.interval = Some(0);
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::Interval { got: 0, .. })
        ));
        cfg.interval = Some(3601);
        assert!(validate_effective_config(&cfg).is_err());
        cfg.interval = Some(3600);
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_buffer_and_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.buffer_size = Some(0);
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::BufferSize)
        ));

        let mut cfg = valid_config(dir.path());
        cfg.flush_interval = Some(0);
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::FlushInterval)
        ));
    }

    #[test]
    fn test_log_level_and_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.log_level = Some("verbose".into());
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::LogLevel(_))
        ));

        let mut cfg = valid_config(dir.path());
        cfg.timezone = Some("Europe/Nowhere".into());
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::Timezone { .. })
        ));

        cfg.timezone = Some("Europe/Berlin".into());
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_output_directory_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            output: Some(dir.path().join("missing").join("out.csv")),
            ..Config::default()
        };
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ConfigError::OutputDirMissing(_))
        ));
    }

    #[test]
    fn test_load_formats() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("c.yaml");
        fs::write(&yaml, "interval: 10\nexclude_disks: [sda]\n").unwrap();
        let cfg = load_config(Some(yaml.as_path())).unwrap();
        assert_eq!(cfg.interval, Some(10));
        assert!(!cfg.disk_filter().allows("/dev/sda"));

        let json = dir.path().join("c.json");
        fs::write(&json, r#"{"buffer_size": 7}"#).unwrap();
        assert_eq!(load_config(Some(json.as_path())).unwrap().buffer_size, Some(7));

        let toml_path = dir.path().join("c.toml");
        fs::write(&toml_path, "timezone = \"UTC\"\n").unwrap();
        assert_eq!(
            load_config(Some(toml_path.as_path())).unwrap().timezone.as_deref(),
            Some("UTC")
        );
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("30"), Ok(30));
        assert_eq!(parse_duration_secs("30s"), Ok(30));
        assert_eq!(parse_duration_secs("5m"), Ok(300));
        assert_eq!(parse_duration_secs("1h"), Ok(3600));
        assert!(parse_duration_secs("fast").is_err());
    }

    #[test]
    fn test_parse_duration_secs_overflow() {
        assert!(parse_duration_secs("9999999999999999999h").is_err());
        assert!(parse_duration_secs("5124095576030432h").is_err());
        assert!(parse_duration_secs("307445734561825861m").is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" sda, ,/dev/sdb ,"), vec!["sda", "/dev/sdb"]);
    }

    #[test]
    fn test_export_settings() {
        let cfg = Config {
            max_file_size_mb: Some(2),
            timezone: Some("UTC".into()),
            ..Config::default()
        };
        let settings = cfg.export_settings();
        assert_eq!(settings.rotate_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(settings.timezone, "UTC");
    }
}
