//! Startup requirement validation for unostat.
//!
//! This module validates that every counter source can be read and that the
//! output location is usable before collection starts.

use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use unostat::CounterSource;

/// Validate all runtime requirements
pub fn validate_requirements(
    source: &dyn CounterSource,
    output: &Path,
) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_counter_sources(source)?;
    check_output_location(output)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// CPU and memory are required; disks and interfaces may legitimately be
/// absent, so those only warn.
fn check_counter_sources(source: &dyn CounterSource) -> Result<(), ValidationError> {
    if let Err(e) = source.cpu_times() {
        error!("❌ Cannot read CPU counters: {}", e);
        return Err(ValidationError::SourceUnreadable {
            resource: "CPU",
            reason: e.to_string(),
        });
    }
    info!("✅ CPU counters readable");

    match source.memory().and_then(|m| m.utilization()) {
        Ok(_) => info!("✅ Memory counters readable"),
        Err(e) => {
            error!("❌ Cannot read memory counters: {}", e);
            return Err(ValidationError::SourceUnreadable {
                resource: "memory",
                reason: e.to_string(),
            });
        }
    }

    match source.disk_counters() {
        Ok(disks) => info!("✅ Disk counters readable ({} devices)", disks.len()),
        Err(e) => warn!("⚠️  Cannot read disk counters: {} - disk columns will be empty", e),
    }

    match source.net_counters() {
        Ok(nets) => info!("✅ Network counters readable ({} interfaces)", nets.len()),
        Err(e) => warn!(
            "⚠️  Cannot read network counters: {} - network columns will be empty",
            e
        ),
    }

    Ok(())
}

/// Check the output directory accepts new files
fn check_output_location(output: &Path) -> Result<(), ValidationError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match fs::metadata(dir) {
        Ok(meta) if meta.permissions().readonly() => {
            error!("❌ Output directory {} is read-only", dir.display());
            Err(ValidationError::OutputNotWritable(dir.display().to_string()))
        }
        Ok(_) => {
            info!("✅ Output directory {} is writable", dir.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Cannot access output directory {}: {}", dir.display(), e);
            Err(ValidationError::OutputNotWritable(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Cannot read {resource} counters: {reason}")]
    SourceUnreadable {
        resource: &'static str,
        reason: String,
    },

    #[error("Output directory not writable: {0}")]
    OutputNotWritable(String),
}
