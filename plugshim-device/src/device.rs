//! A single emulated outlet.

use std::fmt;

use uuid::Uuid;

use crate::plugin::{Plugin, PluginError, PluginState};

/// Derive the stable serial for a device name.
///
/// Name-based UUID (v3, X.500 namespace), so the same name always yields the same
/// serial across restarts and hubs keep recognising the device.
pub fn make_serial(name: &str) -> String {
    Uuid::new_v3(&Uuid::NAMESPACE_X500, name.as_bytes()).to_string()
}

/// An emulated outlet bound to its backend plugin.
///
/// The device holds no state of its own; every state query goes to the plugin.
pub struct Device {
    name: String,
    serial: String,
    port: u16,
    plugin: Box<dyn Plugin>,
}

impl Device {
    pub fn new(name: impl Into<String>, port: u16, plugin: Box<dyn Plugin>) -> Self {
        let name = name.into();
        let serial = make_serial(&name);
        Self {
            name,
            serial,
            port,
            plugin,
        }
    }

    /// Friendly name announced to hubs
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Unique device name, e.g. `uuid:Socket-1_0-<serial>`
    pub fn udn(&self) -> String {
        format!("uuid:Socket-1_0-{}", self.serial)
    }

    /// TCP port the device's action server listens on
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub async fn on(&self) -> bool {
        self.plugin.on().await
    }

    pub async fn off(&self) -> bool {
        self.plugin.off().await
    }

    pub async fn state(&self) -> PluginState {
        self.plugin.get_state().await
    }

    /// Release the plugin's resources.
    pub async fn close(&self) -> Result<(), PluginError> {
        self.plugin.close().await
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("serial", &self.serial)
            .field("port", &self.port)
            .field("plugin", &self.plugin.name())
            .finish()
    }
}
