//! Running set of emulated outlets: one action server per device plus the shared
//! SSDP responder.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use plugshim_device::{Device, DeviceRegistry};
use plugshim_discovery::{SsdpConfig, SsdpResponder};
use plugshim_server::{ActionServer, ServerConfig};
use tracing::{info, warn};

use crate::error::ShimError;

/// Network settings for [`Shim::start`].
#[derive(Debug, Clone)]
pub struct ShimOptions {
    /// Address advertised in discovery replies
    pub host: IpAddr,
    pub ssdp: SsdpConfig,
    pub server: ServerConfig,
}

impl ShimOptions {
    /// Serve on `host`, answering multicast probes on the standard SSDP port.
    pub fn new(host: IpAddr) -> Self {
        let mut ssdp = SsdpConfig::default();
        if let IpAddr::V4(interface) = host {
            ssdp.interface = interface;
        }

        Self {
            host,
            ssdp,
            server: ServerConfig {
                bind_ip: host,
                ..Default::default()
            },
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.server.read_timeout = read_timeout;
        self
    }
}

/// All servers for one configuration.
pub struct Shim {
    registry: Arc<DeviceRegistry>,
    servers: Vec<ActionServer>,
    responder: SsdpResponder,
}

impl Shim {
    /// Register `devices`, bind every device port, then start answering discovery.
    ///
    /// Servers are up before the responder so a hub never learns about a port that is
    /// not listening yet. On failure everything already started is stopped and the
    /// plugins are closed.
    pub async fn start(devices: Vec<Device>, options: ShimOptions) -> Result<Self, ShimError> {
        let registry = Arc::new(DeviceRegistry::new(devices)?);

        let mut servers = Vec::with_capacity(registry.len());
        for device in registry.iter() {
            match ActionServer::start(device.clone(), options.server.clone()).await {
                Ok(server) => servers.push(server),
                Err(e) => {
                    stop_servers(servers).await;
                    registry.close_all().await;
                    return Err(e.into());
                }
            }
        }

        let responder = match SsdpResponder::start(
            options.ssdp.clone(),
            registry.clone(),
            options.host.to_string(),
        )
        .await
        {
            Ok(responder) => responder,
            Err(e) => {
                stop_servers(servers).await;
                registry.close_all().await;
                return Err(e.into());
            }
        };

        info!(
            "Emulating {} device(s), advertised at {}",
            registry.len(),
            options.host
        );

        Ok(Self {
            registry,
            servers,
            responder,
        })
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn responder_addr(&self) -> SocketAddr {
        self.responder.local_addr()
    }

    /// Bound address of each device's action server, in registry order.
    pub fn server_addrs(&self) -> Vec<(&str, SocketAddr)> {
        self.servers
            .iter()
            .map(|server| (server.device().name(), server.local_addr()))
            .collect()
    }

    /// Stop discovery, then the action servers, then close every plugin.
    ///
    /// Every step runs even if an earlier one fails; the first error is returned.
    pub async fn shutdown(self) -> Result<(), ShimError> {
        let mut first_error: Option<ShimError> = None;

        if let Err(e) = self.responder.shutdown().await {
            warn!("SSDP responder did not stop cleanly: {}", e);
            first_error.get_or_insert(e.into());
        }

        for server in self.servers {
            if let Err(e) = server.shutdown().await {
                warn!("Action server did not stop cleanly: {}", e);
                first_error.get_or_insert(e.into());
            }
        }

        self.registry.close_all().await;
        info!("All devices stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn stop_servers(servers: Vec<ActionServer>) {
    for server in servers {
        if let Err(e) = server.shutdown().await {
            warn!("Action server did not stop cleanly: {}", e);
        }
    }
}
