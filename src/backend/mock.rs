use crate::backend::{BackendResult, HotspotService};
use crate::models::ConnectedDevice;
use async_trait::async_trait;
use std::cell::Cell;

pub const MOCK_GATEWAY_IP: &str = "192.168.43.1";
pub const MOCK_STATION_IP: &str = "10.0.0.23";

/// In-memory stand-in for a hotspot-capable Wi-Fi device.
pub struct MockBackend {
    enabled: Cell<bool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(false),
        }
    }

    pub fn clients(&self) -> Vec<ConnectedDevice> {
        if !self.enabled.get() {
            return Vec::new();
        }
        vec![
            ConnectedDevice::new("192.168.43.27", "3c:22:fb:91:0e:4a"),
            ConnectedDevice::new("192.168.43.114", "a4:83:e7:5d:c2:19"),
            ConnectedDevice::new("192.168.43.208", "f0:18:98:2b:77:e1"),
        ]
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HotspotService for MockBackend {
    async fn is_hotspot_enabled(&self) -> BackendResult<bool> {
        Ok(self.enabled.get())
    }

    async fn connected_devices(&self) -> BackendResult<Vec<ConnectedDevice>> {
        Ok(self.clients())
    }

    async fn my_device_ip(&self) -> BackendResult<String> {
        let ip = if self.enabled.get() {
            MOCK_GATEWAY_IP
        } else {
            MOCK_STATION_IP
        };
        Ok(ip.to_string())
    }

    async fn set_hotspot_enabled(&self, enabled: bool) -> BackendResult<()> {
        self.enabled.set(enabled);
        Ok(())
    }

    async fn open_write_settings(&self) -> BackendResult<()> {
        Ok(())
    }
}
