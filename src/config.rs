//! Configuration management

use crate::models::PlatformVersion;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `platform.api_level`.
pub const API_LEVEL_ENV: &str = "TETHER_API_LEVEL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Auto,
    #[serde(alias = "nm")]
    NetworkManager,
    Mock,
}

/// Periodic refresh of connected devices and own address
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,
}

fn default_refresh_interval() -> u64 {
    10_000
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Access point created when NetworkManager has no saved hotspot connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HotspotConfig {
    #[serde(default = "default_ssid")]
    pub ssid: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_ssid() -> String {
    "Tether".to_string()
}

fn default_password() -> String {
    "tether-hotspot".to_string()
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            ssid: default_ssid(),
            password: default_password(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    /// API level of the host platform; client listing is hidden from 33 up.
    #[serde(default)]
    pub api_level: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub hotspot: HotspotConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

impl Config {
    /// Load configuration from the user config directory, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "tether", "Tether")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Platform version from the environment override if it parses, else the
    /// configured API level.
    pub fn platform_version(&self) -> PlatformVersion {
        self.platform_version_with(std::env::var(API_LEVEL_ENV).ok().as_deref())
    }

    fn platform_version_with(&self, override_level: Option<&str>) -> PlatformVersion {
        override_level
            .and_then(PlatformVersion::parse)
            .unwrap_or(PlatformVersion(self.platform.api_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Auto);
        assert_eq!(config.refresh.interval(), Duration::from_secs(10));
        assert_eq!(config.hotspot.ssid, "Tether");
        assert_eq!(config.platform.api_level, 0);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.refresh.interval_ms, 10_000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend = \"mock\"\n\n[refresh]\ninterval_ms = 2500\n\n[platform]\napi_level = 34"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Mock);
        assert_eq!(config.refresh.interval(), Duration::from_millis(2500));
        assert_eq!(config.platform.api_level, 34);
        assert_eq!(config.hotspot, HotspotConfig::default());
    }

    #[test]
    fn test_nm_alias() {
        let config: Config = toml::from_str("backend = \"nm\"").unwrap();
        assert_eq!(config.backend, BackendKind::NetworkManager);
    }

    #[test]
    fn test_api_level_override() {
        let mut config = Config::default();
        config.platform.api_level = 30;

        assert_eq!(config.platform_version_with(None), PlatformVersion(30));
        assert_eq!(config.platform_version_with(Some("34")), PlatformVersion(34));
        assert_eq!(config.platform_version_with(Some("unset")), PlatformVersion(30));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[refresh]\ninterval_ms = \"soon\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
