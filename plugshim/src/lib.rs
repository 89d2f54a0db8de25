//! Emulated WeMo-style smart plugs.
//!
//! Each configured device shows up on the local network as a Belkin outlet. Voice
//! assistant hubs find it over SSDP and switch it with SOAP calls; the switch is
//! carried out by the device's plugin (an HTTP request, a shell command, ...).
//!
//! This crate ties the workspace together: it reads the configuration, builds the
//! devices, and runs an [`plugshim_server::ActionServer`] per device alongside one
//! [`plugshim_discovery::SsdpResponder`].
//!
//! ```no_run
//! use plugshim::{Config, Shim, ShimOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::load("config.json".as_ref())?;
//! let options = ShimOptions::new(config.host_ip()?);
//! let shim = Shim::start(config.build_devices()?, options).await?;
//!
//! tokio::signal::ctrl_c().await?;
//! shim.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
mod error;
pub mod logging;
mod shim;
pub mod utils;

pub use config::{find_config, Config, ConfigError, DeviceSpec};
pub use error::ShimError;
pub use shim::{Shim, ShimOptions};
pub use utils::{detect_local_ip, get_unused_port};
