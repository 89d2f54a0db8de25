//! Immutable registry of configured devices.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::device::Device;

/// Errors raised while building a registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate device name: {0}")]
    DuplicateName(String),
    #[error("Duplicate device port {port} (device '{name}')")]
    DuplicatePort { name: String, port: u16 },
}

/// Ordered, read-only collection of devices.
///
/// Built once at startup. Names and ports are unique; the registry is shared between
/// listener tasks as `Arc<DeviceRegistry>` and never mutated afterwards.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Arc<Device>>,
}

impl DeviceRegistry {
    /// Build a registry, preserving the given order.
    ///
    /// # Errors
    ///
    /// Fails on the first duplicate name or port. Port `0` is never a duplicate: each
    /// such device gets its own ephemeral port when its server binds.
    pub fn new(devices: Vec<Device>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        let mut ports = HashSet::new();

        for device in &devices {
            if !names.insert(device.name()) {
                return Err(RegistryError::DuplicateName(device.name().to_string()));
            }
            // port 0 asks the OS for an ephemeral port at bind time
            if device.port() != 0 && !ports.insert(device.port()) {
                return Err(RegistryError::DuplicatePort {
                    name: device.name().to_string(),
                    port: device.port(),
                });
            }
        }

        Ok(Self {
            devices: devices.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.name() == name)
    }

    /// Close every device's plugin. Failures are logged and do not stop the rest.
    pub async fn close_all(&self) {
        for device in &self.devices {
            if let Err(e) = device.close().await {
                warn!("Failed to close plugin for '{}': {}", device.name(), e);
            }
        }
    }
}
