//! Devices and backend capabilities for plugshim.
//!
//! This crate holds everything the protocol side needs to know about a configured
//! outlet:
//!
//! - [`Plugin`]: the on/off/state contract a backend implements.
//! - [`plugins`]: built-in backends (HTTP endpoints, shell commands) and the factory
//!   that picks one by its configuration type tag.
//! - [`Device`]: a named outlet with a stable serial, a port and its plugin.
//! - [`DeviceRegistry`]: the immutable set of devices served by one process.
//!
//! # Example
//!
//! ```no_run
//! use plugshim_device::{build_plugin, Device, DeviceRegistry};
//! use serde_json::json;
//!
//! let plugin = build_plugin(
//!     "SimpleHTTPPlugin",
//!     &json!({ "on_cmd": "http://10.0.0.5/on", "off_cmd": "http://10.0.0.5/off" }),
//! )
//! .unwrap();
//!
//! let registry = DeviceRegistry::new(vec![Device::new("desk lamp", 12345, plugin)]).unwrap();
//! assert_eq!(registry.len(), 1);
//! ```

pub mod device;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod wire;

pub use device::{make_serial, Device};
pub use plugin::{Plugin, PluginError, PluginState};
pub use plugins::build_plugin;
pub use registry::{DeviceRegistry, RegistryError};
