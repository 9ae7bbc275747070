use std::time::Duration;

/// API level from which the platform hides hotspot clients from applications.
pub const CLIENT_LISTING_RESTRICTED_API_LEVEL: u32 = 33;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectedDevice {
    pub ip_address: String,
    pub mac_address: String,
}

impl ConnectedDevice {
    pub fn new(ip_address: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            mac_address: mac_address.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScreenState {
    pub hotspot_enabled: bool,
    pub connected_devices: Vec<ConnectedDevice>,
    pub own_ip: Option<String>,
}

/// Numeric platform API level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion(pub u32);

impl PlatformVersion {
    /// Reads the leading digits of `raw` as a number, so "100" sorts above
    /// "33" and "13.0" reads as 13. Returns `None` when there are no digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().map(Self)
    }

    pub fn supports_client_listing(self) -> bool {
        self.0 < CLIENT_LISTING_RESTRICTED_API_LEVEL
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

impl NoticeDuration {
    pub fn as_duration(self) -> Duration {
        match self {
            NoticeDuration::Short => Duration::from_millis(2000),
            NoticeDuration::Long => Duration::from_millis(3500),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub duration: NoticeDuration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreenEvent {
    StateChanged(ScreenState),
    Notice(Notice),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreenCommand {
    RequestPermissions,
    SetHotspot(bool),
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_is_numeric() {
        assert_eq!(PlatformVersion::parse("33"), Some(PlatformVersion(33)));
        assert_eq!(PlatformVersion::parse(" 13.0 "), Some(PlatformVersion(13)));
        assert_eq!(PlatformVersion::parse("beta"), None);

        // Lexically "100" < "33" and "9" > "33"; numerically the opposite.
        assert!(!PlatformVersion::parse("100").unwrap().supports_client_listing());
        assert!(PlatformVersion::parse("9").unwrap().supports_client_listing());
    }

    #[test]
    fn test_client_listing_threshold() {
        assert!(PlatformVersion(32).supports_client_listing());
        assert!(!PlatformVersion(33).supports_client_listing());
        assert!(PlatformVersion::default().supports_client_listing());
    }

    #[test]
    fn test_notice_durations() {
        assert_eq!(NoticeDuration::Short.as_duration(), Duration::from_millis(2000));
        assert_eq!(NoticeDuration::Long.as_duration(), Duration::from_millis(3500));
    }
}
