//! SSDP discovery responder for plugshim.
//!
//! Hubs find outlets by multicasting an SSDP `M-SEARCH` probe. This crate listens for
//! those probes and answers with one unicast reply per registered device, each
//! pointing at that device's `/setup.xml` descriptor.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugshim_device::DeviceRegistry;
//! use plugshim_discovery::{SsdpConfig, SsdpResponder};
//!
//! # #[tokio::main]
//! # async fn main() -> plugshim_discovery::Result<()> {
//! let registry = Arc::new(DeviceRegistry::new(Vec::new()).unwrap());
//! let responder = SsdpResponder::start(SsdpConfig::default(), registry, "192.168.1.50".into()).await?;
//! // ... serve until shutdown
//! responder.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod responder;
pub mod ssdp;

pub use error::{DiscoveryError, Result};
pub use responder::{SsdpConfig, SsdpResponder};
pub use ssdp::{discovery_response, match_search_target, SEARCH_TARGETS};
