//! Per-device control server for plugshim outlets.
//!
//! Every emulated outlet listens on its own TCP port. Hubs fetch `/setup.xml` after
//! discovery, then `POST` SOAP actions to `/upnp/control/basicevent1` to switch the
//! outlet or read its state.
//!
//! # Overview
//!
//! - [`ActionServer`]: accept loop for one device
//! - [`dispatch`]: maps a parsed control request to a plugin call and a SOAP reply
//! - [`http`]: request reading and response framing
//! - [`soap`]: envelopes, faults and `SOAPACTION` parsing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugshim_device::{build_plugin, Device};
//! use plugshim_server::{ActionServer, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plugin = build_plugin("CommandLinePlugin", &serde_json::json!({
//!     "on_cmd": "touch /tmp/lamp",
//!     "off_cmd": "rm -f /tmp/lamp",
//!     "state_cmd": "test -f /tmp/lamp",
//! }))?;
//! let server = ActionServer::start(
//!     Arc::new(Device::new("lamp", 12340, plugin)),
//!     ServerConfig::default(),
//! )
//! .await?;
//!
//! tokio::signal::ctrl_c().await?;
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod dispatcher;
mod error;
pub mod http;
mod server;
pub mod soap;

pub use dispatcher::{dispatch, Action, Response};
pub use error::{RequestError, ServerError};
pub use http::{add_http_headers, ControlRequest, Status};
pub use server::{route, ActionServer, ServerConfig};
