//! Include/exclude filtering for disk devices and network interfaces.

/// Prefix stripped from device names before comparison, so `/dev/sda` and
/// `sda` refer to the same device.
const DEVICE_PREFIX: &str = "/dev/";

/// Normalizes a device name for filter comparison.
pub fn normalize_device(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix(DEVICE_PREFIX).unwrap_or(trimmed)
}

/// Device filter built from user-supplied include and exclude lists.
///
/// Exclusion wins over inclusion; an empty include list admits every device
/// that is not excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl DeviceFilter {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        fn normalized<X: AsRef<str>>(items: impl IntoIterator<Item = X>) -> Vec<String> {
            items
                .into_iter()
                .map(|s| normalize_device(s.as_ref()).to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }

        Self {
            include: normalized(include),
            exclude: normalized(exclude),
        }
    }

    /// A filter that admits every device.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn allows(&self, device: &str) -> bool {
        let device = normalize_device(device);

        if self.exclude.iter().any(|d| d == device) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|d| d == device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = DeviceFilter::allow_all();
        assert!(filter.allows("sda"));
        assert!(filter.allows("eth0"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = DeviceFilter::new(["sda", "sdb"], ["sda"]);
        assert!(!filter.allows("sda"));
        assert!(filter.allows("sdb"));
        assert!(!filter.allows("sdc"));
    }

    #[test]
    fn test_prefix_normalization() {
        let filter = DeviceFilter::new(["/dev/nvme0n1"], Vec::<String>::new());
        assert!(filter.allows("nvme0n1"));
        assert!(filter.allows("/dev/nvme0n1"));

        let filter = DeviceFilter::new(Vec::<String>::new(), ["sda"]);
        assert!(!filter.allows("/dev/sda"));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let filter = DeviceFilter::new([" ", ""], Vec::<&str>::new());
        assert!(filter.allows("sda"));
    }
}
