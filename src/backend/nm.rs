use crate::backend::{BackendError, BackendResult, HotspotService};
use crate::config::HotspotConfig;
use crate::models::ConnectedDevice;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};
use zbus::blocking::{Connection, Proxy};
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

/// Hotspot control through NetworkManager on the system bus.
///
/// Every call opens its own blocking connection on tokio's blocking pool, so
/// the controller thread never waits on D-Bus.
pub struct NetworkManagerBackend {
    hotspot: HotspotConfig,
}

impl NetworkManagerBackend {
    pub fn new(hotspot: HotspotConfig) -> Self {
        Self { hotspot }
    }

    /// Returns the daemon version if NetworkManager answers on the system bus.
    pub fn probe(&self) -> BackendResult<String> {
        let conn = system_bus()?;
        let nm = nm_proxy(&conn)?;
        Ok(nm.get_property("Version")?)
    }
}

#[async_trait(?Send)]
impl HotspotService for NetworkManagerBackend {
    async fn is_hotspot_enabled(&self) -> BackendResult<bool> {
        blocking(hotspot_active).await
    }

    async fn connected_devices(&self) -> BackendResult<Vec<ConnectedDevice>> {
        blocking(|| {
            let conn = system_bus()?;
            let nm = nm_proxy(&conn)?;
            let wifi_device = first_wifi_device(&conn, &nm)?;
            let interface: String = device_proxy(&conn, &wifi_device)?.get_property("Interface")?;
            let table = std::fs::read_to_string(ARP_TABLE_PATH)
                .map_err(|e| BackendError::Unknown(format!("{ARP_TABLE_PATH}: {e}")))?;
            Ok(parse_arp_table(&table, &interface))
        })
        .await
    }

    async fn my_device_ip(&self) -> BackendResult<String> {
        blocking(|| {
            let conn = system_bus()?;
            let nm = nm_proxy(&conn)?;
            let wifi_device = first_wifi_device(&conn, &nm)?;
            let ip4_path: OwnedObjectPath =
                device_proxy(&conn, &wifi_device)?.get_property("Ip4Config")?;
            if ip4_path.as_str() == "/" {
                return Err(BackendError::Unknown(
                    "Wi-Fi device has no IPv4 configuration".to_string(),
                ));
            }
            let ip4 = Proxy::new(
                &conn,
                nm_consts::BUS_NAME,
                ip4_path.as_str(),
                nm_consts::IP4_CONFIG_INTERFACE,
            )?;
            let address_data: Vec<HashMap<String, OwnedValue>> =
                ip4.get_property("AddressData")?;
            address_data
                .iter()
                .find_map(|entry| entry.get("address").and_then(value_str))
                .map(str::to_string)
                .ok_or_else(|| BackendError::Unknown("no IPv4 address assigned".to_string()))
        })
        .await
    }

    async fn set_hotspot_enabled(&self, enabled: bool) -> BackendResult<()> {
        let hotspot = self.hotspot.clone();
        blocking(move || {
            if enabled {
                start_hotspot(&hotspot)
            } else {
                stop_hotspot()
            }
        })
        .await
    }

    async fn open_write_settings(&self) -> BackendResult<()> {
        blocking(|| {
            let conn = system_bus()?;
            let nm = nm_proxy(&conn)?;
            let permissions: HashMap<String, String> = nm.call("GetPermissions", &())?;
            check_permissions(&permissions)
        })
        .await
    }
}

pub mod nm_consts {
    pub const BUS_NAME: &str = "org.freedesktop.NetworkManager";
    pub const OBJECT_PATH: &str = "/org/freedesktop/NetworkManager";
    pub const INTERFACE: &str = "org.freedesktop.NetworkManager";
    pub const DEVICE_INTERFACE: &str = "org.freedesktop.NetworkManager.Device";
    pub const WIFI_DEVICE_INTERFACE: &str = "org.freedesktop.NetworkManager.Device.Wireless";
    pub const IP4_CONFIG_INTERFACE: &str = "org.freedesktop.NetworkManager.IP4Config";
    pub const SETTINGS_PATH: &str = "/org/freedesktop/NetworkManager/Settings";
    pub const SETTINGS_INTERFACE: &str = "org.freedesktop.NetworkManager.Settings";
    pub const CONNECTION_INTERFACE: &str = "org.freedesktop.NetworkManager.Settings.Connection";
    pub const PERMISSION_WIFI_SHARE: &str = "org.freedesktop.NetworkManager.wifi.share.protected";
    pub const PERMISSION_NETWORK_CONTROL: &str = "org.freedesktop.NetworkManager.network-control";
}

const NM_DEVICE_TYPE_WIFI: u32 = 2;
const NM_DEVICE_STATE_ACTIVATED: u32 = 100;
const NM_802_11_MODE_AP: u32 = 3;
const ARP_TABLE_PATH: &str = "/proc/net/arp";
const ARP_FLAGS_INCOMPLETE: &str = "0x0";
const EMPTY_MAC: &str = "00:00:00:00:00:00";

async fn blocking<T, F>(f: F) -> BackendResult<T>
where
    F: FnOnce() -> BackendResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::Unknown(e.to_string()))?
}

fn system_bus() -> BackendResult<Connection> {
    Ok(Connection::system()?)
}

fn nm_proxy(conn: &Connection) -> BackendResult<Proxy<'_>> {
    Ok(Proxy::new(
        conn,
        nm_consts::BUS_NAME,
        nm_consts::OBJECT_PATH,
        nm_consts::INTERFACE,
    )?)
}

fn device_proxy<'a>(
    conn: &'a Connection,
    path: &'a OwnedObjectPath,
) -> BackendResult<Proxy<'a>> {
    Ok(Proxy::new(
        conn,
        nm_consts::BUS_NAME,
        path.as_str(),
        nm_consts::DEVICE_INTERFACE,
    )?)
}

fn wireless_proxy<'a>(
    conn: &'a Connection,
    path: &'a OwnedObjectPath,
) -> BackendResult<Proxy<'a>> {
    Ok(Proxy::new(
        conn,
        nm_consts::BUS_NAME,
        path.as_str(),
        nm_consts::WIFI_DEVICE_INTERFACE,
    )?)
}

fn first_wifi_device(conn: &Connection, nm: &Proxy<'_>) -> BackendResult<OwnedObjectPath> {
    let devices: Vec<OwnedObjectPath> = nm.call("GetDevices", &())?;

    for path in devices {
        let device_type: u32 = device_proxy(conn, &path)?.get_property("DeviceType")?;
        if device_type == NM_DEVICE_TYPE_WIFI {
            return Ok(path);
        }
    }

    Err(BackendError::Service("No Wi-Fi device found".to_string()))
}

fn hotspot_active() -> BackendResult<bool> {
    let conn = system_bus()?;
    let nm = nm_proxy(&conn)?;

    let wifi_enabled: bool = nm.get_property("WirelessEnabled")?;
    if !wifi_enabled {
        return Ok(false);
    }

    let wifi_device = first_wifi_device(&conn, &nm)?;
    let state: u32 = device_proxy(&conn, &wifi_device)?.get_property("State")?;
    let mode: u32 = wireless_proxy(&conn, &wifi_device)?.get_property("Mode")?;
    debug!(state, mode, "Read Wi-Fi device state");

    Ok(state == NM_DEVICE_STATE_ACTIVATED && mode == NM_802_11_MODE_AP)
}

fn start_hotspot(hotspot: &HotspotConfig) -> BackendResult<()> {
    let conn = system_bus()?;
    let nm = nm_proxy(&conn)?;
    let wifi_device = first_wifi_device(&conn, &nm)?;
    let root = ObjectPath::try_from("/").map_err(|e| BackendError::Unknown(e.to_string()))?;

    if let Some(saved) = saved_hotspot_connection(&conn)? {
        info!(connection = saved.as_str(), "Activating saved hotspot connection");
        let _active: OwnedObjectPath =
            nm.call("ActivateConnection", &(&saved, &wifi_device, root))?;
        return Ok(());
    }

    info!(ssid = %hotspot.ssid, "Creating hotspot connection");
    let settings = hotspot_settings(hotspot);
    let (_connection, _active): (OwnedObjectPath, OwnedObjectPath) = nm.call(
        "AddAndActivateConnection",
        &(settings, &wifi_device, root),
    )?;
    Ok(())
}

fn stop_hotspot() -> BackendResult<()> {
    let conn = system_bus()?;
    let nm = nm_proxy(&conn)?;
    let wifi_device = first_wifi_device(&conn, &nm)?;
    let () = device_proxy(&conn, &wifi_device)?.call("Disconnect", &())?;
    Ok(())
}

fn saved_hotspot_connection(conn: &Connection) -> BackendResult<Option<OwnedObjectPath>> {
    let settings = Proxy::new(
        conn,
        nm_consts::BUS_NAME,
        nm_consts::SETTINGS_PATH,
        nm_consts::SETTINGS_INTERFACE,
    )?;
    let paths: Vec<OwnedObjectPath> = settings.call("ListConnections", &())?;

    for path in paths {
        let values: ConnectionSettings = {
            let connection = Proxy::new(
                conn,
                nm_consts::BUS_NAME,
                path.as_str(),
                nm_consts::CONNECTION_INTERFACE,
            )?;
            connection.call("GetSettings", &())?
        };
        if is_access_point(&values) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

type ConnectionSettings = HashMap<String, HashMap<String, OwnedValue>>;

fn is_access_point(settings: &ConnectionSettings) -> bool {
    settings
        .get("802-11-wireless")
        .and_then(|wireless| wireless.get("mode"))
        .and_then(value_str)
        == Some("ap")
}

fn hotspot_settings(
    hotspot: &HotspotConfig,
) -> HashMap<&'static str, HashMap<&'static str, Value<'_>>> {
    let connection = HashMap::from([
        ("type", Value::from("802-11-wireless")),
        ("id", Value::from(hotspot.ssid.as_str())),
        ("autoconnect", Value::from(false)),
    ]);
    let wireless = HashMap::from([
        ("ssid", Value::from(hotspot.ssid.as_bytes().to_vec())),
        ("mode", Value::from("ap")),
        ("band", Value::from("bg")),
    ]);
    let security = HashMap::from([
        ("key-mgmt", Value::from("wpa-psk")),
        ("psk", Value::from(hotspot.password.as_str())),
    ]);
    let ipv4 = HashMap::from([("method", Value::from("shared"))]);
    let ipv6 = HashMap::from([("method", Value::from("ignore"))]);

    HashMap::from([
        ("connection", connection),
        ("802-11-wireless", wireless),
        ("802-11-wireless-security", security),
        ("ipv4", ipv4),
        ("ipv6", ipv6),
    ])
}

fn value_str(value: &OwnedValue) -> Option<&str> {
    match &**value {
        Value::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

fn check_permissions(permissions: &HashMap<String, String>) -> BackendResult<()> {
    for permission in [
        nm_consts::PERMISSION_WIFI_SHARE,
        nm_consts::PERMISSION_NETWORK_CONTROL,
    ] {
        if permissions.get(permission).map(String::as_str) == Some("no") {
            return Err(BackendError::Service(format!(
                "Permission not granted: {permission}"
            )));
        }
    }
    Ok(())
}

/// Complete ARP entries on `interface`, in table order.
fn parse_arp_table(table: &str, interface: &str) -> Vec<ConnectedDevice> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [ip, _hw_type, flags, mac, _mask, device] => Some((*ip, *flags, *mac, *device)),
                _ => None,
            }
        })
        .filter(|(_, flags, mac, device)| {
            *device == interface && *flags != ARP_FLAGS_INCOMPLETE && *mac != EMPTY_MAC
        })
        .map(|(ip, _, mac, _)| ConnectedDevice::new(ip, mac))
        .collect()
}
