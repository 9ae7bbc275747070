use crate::models::{PlatformVersion, ScreenState};

pub const STATE_ON_CLASS: &str = "tether-on";
pub const STATE_OFF_CLASS: &str = "tether-off";
pub const PERMISSION_HINT: &str =
    "Please press the button below and grant permission if toggles aren't working.";
pub const CLIENT_LISTING_RESTRICTED: &str =
    "Connected devices feature doesn't work on platform API level 33 and above due to security reasons.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRow {
    pub ip_line: String,
    pub mac_line: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSection {
    List(Vec<DeviceRow>),
    Restricted(&'static str),
}

/// Everything the window shows, derived from one state snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenView {
    pub state_label: &'static str,
    pub state_class: &'static str,
    pub ip_line: String,
    pub devices: DeviceSection,
}

impl ScreenView {
    pub fn build(state: &ScreenState, platform: PlatformVersion) -> Self {
        let (state_label, state_class) = if state.hotspot_enabled {
            ("ON", STATE_ON_CLASS)
        } else {
            ("OFF", STATE_OFF_CLASS)
        };

        let devices = if platform.supports_client_listing() {
            DeviceSection::List(
                state
                    .connected_devices
                    .iter()
                    .map(|device| DeviceRow {
                        ip_line: format!("IP: {}", device.ip_address),
                        mac_line: format!("MAC: {}", device.mac_address),
                    })
                    .collect(),
            )
        } else {
            DeviceSection::Restricted(CLIENT_LISTING_RESTRICTED)
        };

        Self {
            state_label,
            state_class,
            ip_line: format!("Device IP: {}", state.own_ip.as_deref().unwrap_or_default()),
            devices,
        }
    }
}
