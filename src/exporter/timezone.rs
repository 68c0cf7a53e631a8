//! Output timezone for record timestamps.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

use super::ExportError;

/// Timestamp format used in record files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timezone that row timestamps are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputZone {
    /// The host's local timezone.
    Local,
    /// A named IANA timezone.
    Named(Tz),
}

impl OutputZone {
    /// Resolves a timezone name. `Local` (any case) and the empty string map
    /// to the host timezone; anything else must be an IANA name.
    pub fn resolve(name: &str) -> Result<Self, ExportError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }

        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|e| ExportError::InvalidTimezone {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Formats `ts` in this zone as `YYYY-MM-DD HH:MM:SS`.
    pub fn format(&self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Local => ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
            Self::Named(tz) => ts.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Local => "Local".to_string(),
            Self::Named(tz) => tz.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolve_local() {
        assert_eq!(OutputZone::resolve("Local").unwrap(), OutputZone::Local);
        assert_eq!(OutputZone::resolve("").unwrap(), OutputZone::Local);
    }

    #[test]
    fn test_resolve_named() {
        let zone = OutputZone::resolve("Asia/Ho_Chi_Minh").unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 5).unwrap();
        assert_eq!(zone.format(ts), "2024-03-02 06:30:05");
        assert_eq!(zone.name(), "Asia/Ho_Chi_Minh");
    }

    #[test]
    fn test_resolve_invalid() {
        let err = OutputZone::resolve("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, ExportError::InvalidTimezone { .. }));
    }
}
