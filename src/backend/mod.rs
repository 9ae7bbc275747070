pub mod mock;
pub mod nm;

use crate::config::{BackendKind, Config};
use crate::models::ConnectedDevice;
use async_trait::async_trait;
use mock::MockBackend;
use nm::NetworkManagerBackend;
use std::rc::Rc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A failure the service describes itself; the message is shown to the user.
    #[error("{0}")]
    Service(String),
    #[error("unexpected hotspot service failure: {0}")]
    Unknown(String),
}

impl BackendError {
    pub fn service_message(&self) -> Option<&str> {
        match self {
            BackendError::Service(message) => Some(message),
            BackendError::Unknown(_) => None,
        }
    }
}

impl From<zbus::Error> for BackendError {
    fn from(err: zbus::Error) -> Self {
        BackendError::Unknown(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait(?Send)]
pub trait HotspotService {
    async fn is_hotspot_enabled(&self) -> BackendResult<bool>;
    async fn connected_devices(&self) -> BackendResult<Vec<ConnectedDevice>>;
    async fn my_device_ip(&self) -> BackendResult<String>;
    async fn set_hotspot_enabled(&self, enabled: bool) -> BackendResult<()>;
    async fn open_write_settings(&self) -> BackendResult<()>;
}

/// Picks the backend named in the config. `auto` probes NetworkManager and
/// falls back to the mock backend when the system bus or daemon is missing.
pub fn connect(config: &Config) -> Rc<dyn HotspotService> {
    let nm_backend = NetworkManagerBackend::new(config.hotspot.clone());
    match config.backend {
        BackendKind::Mock => {
            info!("Using mock hotspot backend");
            Rc::new(MockBackend::new())
        }
        BackendKind::NetworkManager => {
            info!("Using NetworkManager hotspot backend");
            Rc::new(nm_backend)
        }
        BackendKind::Auto => match nm_backend.probe() {
            Ok(version) => {
                info!(%version, "Using NetworkManager hotspot backend");
                Rc::new(nm_backend)
            }
            Err(err) => {
                warn!(error = %err, "NetworkManager backend unavailable, falling back to mock data");
                Rc::new(MockBackend::new())
            }
        },
    }
}
