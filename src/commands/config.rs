//! Config command implementation.
//!
//! Generates configuration files in various formats and prints the effective
//! configuration for `--show-config`.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;

use unostat::config::{render_config, Config, ConfigFormat};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::with_defaults();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from(match format {
            ConfigFormat::Yaml => "unostat.yaml",
            ConfigFormat::Json => "unostat.json",
            ConfigFormat::Toml => "unostat.toml",
        }),
    };

    let mut content = render_config(&config, format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Prints the effective merged configuration.
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    print!("{}", render_config(config, format)?);
    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# unostat Configuration
# =====================
#
# Collection
# ----------
# interval: 30                 # Seconds between samples (1-3600)
# include_disks: []            # Only record these disks (empty = all)
# exclude_disks: []            # Never record these disks
# include_networks: []         # Only record these interfaces (empty = all)
# exclude_networks: []         # Never record these interfaces
#
# Output
# ------
# output: null                 # CSV path (null = <hostname>_<timestamp>.csv)
# buffer_size: 100             # Rows buffered before a flush
# flush_interval: 5            # Maximum seconds between flushes
# max_file_size_mb: 150        # Rotate to <name>_1.csv, <name>_2.csv, ...
# timezone: "Local"            # "Local" or an IANA name such as "Europe/Berlin"
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
# log_file: null               # Log file path (null = stdout)
#
# Visualization Server
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 8080                   # HTTP port
# upload_dir: null             # Upload directory (null = uploads/ next to the binary)
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_config_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unostat.yaml");

        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# unostat Configuration"));
        let loaded = unostat::config::load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded.interval, Some(30));
        assert_eq!(loaded.port, Some(8080));
    }

    #[test]
    fn test_command_config_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unostat.toml");

        command_config(Some(path.clone()), ConfigFormat::Toml, false).unwrap();

        let loaded = unostat::config::load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded.buffer_size, Some(100));
    }
}
