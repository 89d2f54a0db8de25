//! Configuration file loading.
//!
//! The file is JSON with two sections:
//!
//! ```json
//! {
//!     "SERVER": { "ip_address": "auto" },
//!     "PLUGINS": {
//!         "SimpleHTTPPlugin": {
//!             "DEVICES": [
//!                 { "name": "kitchen light", "port": 12340, "on_cmd": "...", "off_cmd": "..." }
//!             ]
//!         }
//!     }
//! }
//! ```
//!
//! Every key of a plugin section other than `DEVICES` is shared by all devices of that
//! plugin; a device's own keys take precedence. Devices without a `port` get a free one.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use plugshim_device::{build_plugin, Device, PluginError};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::utils::{detect_local_ip, get_unused_port};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "PLUGSHIM_CONFIG";

const DEVICES_KEY: &str = "DEVICES";
const PLUGINS_KEY: &str = "PLUGINS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file found (looked in {})", format_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Obsolete config format: devices must be listed under PLUGINS.<PluginType>.DEVICES")]
    Obsolete,

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Could not detect a local IP address; set SERVER.ip_address")]
    NoHostAddress,

    #[error("Could not find a free port for '{name}': {source}")]
    Port {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device '{name}': {source}")]
    Plugin {
        name: String,
        #[source]
        source: PluginError,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SERVER` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    /// Address advertised to hubs, or `auto`
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "SERVER", default)]
    pub server: ServerSection,

    /// Plugin type tag to its section, in file order
    #[serde(rename = "PLUGINS")]
    pub plugins: Map<String, Value>,
}

/// One device entry with plugin-level variables merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub plugin_type: String,
    pub name: String,
    pub port: u16,
    pub params: Value,
}

impl Config {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse configuration text, rejecting the pre-plugin layout.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: Value = serde_json::from_str(text)?;
        let root = raw
            .as_object()
            .ok_or_else(|| ConfigError::Invalid("top level must be an object".to_string()))?;

        if root.contains_key(DEVICES_KEY) || !root.contains_key(PLUGINS_KEY) {
            return Err(ConfigError::Obsolete);
        }

        Ok(serde_json::from_value(raw)?)
    }

    /// Address hubs should connect to.
    ///
    /// Discovery runs over IPv4 multicast, so an explicit address must be IPv4.
    pub fn host_ip(&self) -> Result<IpAddr, ConfigError> {
        match self.server.ip_address.as_deref().map(str::trim) {
            None | Some("") => detect_local_ip().ok_or(ConfigError::NoHostAddress),
            Some(auto) if auto.eq_ignore_ascii_case("auto") => {
                detect_local_ip().ok_or(ConfigError::NoHostAddress)
            }
            Some(ip) => ip.parse::<Ipv4Addr>().map(IpAddr::V4).map_err(|_| {
                ConfigError::Invalid(format!(
                    "SERVER.ip_address '{}' is not an IPv4 address",
                    ip
                ))
            }),
        }
    }

    /// Flatten the plugin sections into one entry per device.
    pub fn device_specs(&self) -> Result<Vec<DeviceSpec>, ConfigError> {
        let mut specs = Vec::new();

        for (plugin_type, section) in &self.plugins {
            let section = section.as_object().ok_or_else(|| {
                ConfigError::Invalid(format!("PLUGINS.{} must be an object", plugin_type))
            })?;
            let devices = section
                .get(DEVICES_KEY)
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("PLUGINS.{} needs a DEVICES list", plugin_type))
                })?;

            let shared: Map<String, Value> = section
                .iter()
                .filter(|(key, _)| key.as_str() != DEVICES_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            for device in devices {
                let device = device.as_object().ok_or_else(|| {
                    ConfigError::Invalid(format!("PLUGINS.{}.DEVICES entries must be objects", plugin_type))
                })?;
                specs.push(device_spec(plugin_type, &shared, device)?);
            }
        }

        Ok(specs)
    }

    /// Build every configured device with its plugin.
    pub fn build_devices(&self) -> Result<Vec<Device>, ConfigError> {
        self.device_specs()?
            .into_iter()
            .map(|spec| {
                let plugin = build_plugin(&spec.plugin_type, &spec.params).map_err(|source| {
                    ConfigError::Plugin {
                        name: spec.name.clone(),
                        source,
                    }
                })?;
                Ok(Device::new(spec.name, spec.port, plugin))
            })
            .collect()
    }
}

fn device_spec(
    plugin_type: &str,
    shared: &Map<String, Value>,
    device: &Map<String, Value>,
) -> Result<DeviceSpec, ConfigError> {
    let mut params = shared.clone();
    params.extend(device.iter().map(|(key, value)| (key.clone(), value.clone())));

    let name = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ConfigError::Invalid(format!("a {} device has no name", plugin_type))
        })?
        .to_string();

    let declared_port = params.get("port").cloned();
    let port = match declared_port {
        None | Some(Value::Null) => {
            let port = get_unused_port().map_err(|source| ConfigError::Port {
                name: name.clone(),
                source,
            })?;
            debug!("Assigned port {} to '{}'", port, name);
            params.insert("port".to_string(), Value::from(port));
            port
        }
        Some(value) => value
            .as_u64()
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("'{}' has an invalid port {}", name, value))
            })?,
    };

    Ok(DeviceSpec {
        plugin_type: plugin_type.to_string(),
        name,
        port,
        params: Value::Object(params),
    })
}

/// Pick the configuration file.
///
/// An explicit path must exist. Otherwise the first existing file among
/// `./config.json`, `~/.plugshim/config.json` and `/etc/plugshim/config.json` is used.
pub fn find_config(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let candidates = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => default_locations(),
    };

    let found = candidates.iter().find(|path| path.is_file()).cloned();
    found.ok_or(ConfigError::NotFound(candidates))
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.json")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".plugshim").join("config.json"));
    }
    paths.push(PathBuf::from("/etc/plugshim/config.json"));
    paths
}
