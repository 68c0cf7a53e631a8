//! Tracing subscriber setup.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

/// Maps a configured level name to a filter. Unknown names fall back to info;
/// config validation rejects them before this runs.
pub fn level_filter(level: &str) -> LevelFilter {
    level
        .trim()
        .to_ascii_lowercase()
        .parse()
        .unwrap_or(LevelFilter::INFO)
}

/// Initializes tracing logging subsystem with configured log level.
///
/// With `log_file` set, output is appended to that file without ANSI colors
/// instead of going to stdout.
pub fn setup_logging(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = level_filter(level);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            let subscriber = tracing_subscriber::fmt()
                .with_max_level(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
        }
    }

    info!("Logging initialized with level: {}", filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug"), LevelFilter::DEBUG);
        assert_eq!(level_filter("WARN"), LevelFilter::WARN);
        assert_eq!(level_filter("off"), LevelFilter::OFF);
        assert_eq!(level_filter("loud"), LevelFilter::INFO);
    }
}
