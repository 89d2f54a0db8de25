//! UDP listener answering discovery probes for every registered device.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use plugshim_device::DeviceRegistry;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, Result};
use crate::ssdp::{discovery_response, match_search_target, SSDP_MULTICAST_ADDR, SSDP_PORT};

/// Pause after a failed receive so a broken socket cannot spin the loop
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Socket settings for the responder.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Local address to bind
    /// Default: 0.0.0.0:1900
    pub bind_addr: SocketAddrV4,

    /// Multicast group to join, `None` to listen for unicast probes only
    /// Default: 239.255.255.250
    pub multicast_group: Option<Ipv4Addr>,

    /// Interface used for the multicast membership
    /// Default: 0.0.0.0 (let the OS pick)
    pub interface: Ipv4Addr,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT),
            multicast_group: Some(SSDP_MULTICAST_ADDR),
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl SsdpConfig {
    /// Unicast-only config on an explicit address, mostly useful for tests.
    pub fn unicast(bind_addr: SocketAddrV4) -> Self {
        Self {
            bind_addr,
            multicast_group: None,
            interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Process-wide SSDP responder.
///
/// Binds one UDP socket (with address reuse so co-located responders can share the
/// port), joins the multicast group and answers each matching probe with one unicast
/// reply per registered device.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use plugshim_device::DeviceRegistry;
/// use plugshim_discovery::{SsdpConfig, SsdpResponder};
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = Arc::new(DeviceRegistry::new(Vec::new()).unwrap());
/// let responder = SsdpResponder::start(SsdpConfig::default(), registry, "192.168.1.50".into())
///     .await
///     .expect("Failed to start SSDP responder");
///
/// println!("Answering probes on {}", responder.local_addr());
/// responder.shutdown().await.unwrap();
/// # }
/// ```
pub struct SsdpResponder {
    local_addr: SocketAddr,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Responder task handle
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl SsdpResponder {
    /// Bind the socket and start answering probes.
    ///
    /// `host` is the address hubs are told to connect to in `LOCATION` headers.
    ///
    /// # Errors
    ///
    /// Fails if the socket cannot be created, bound or joined to the multicast group.
    pub async fn start(
        config: SsdpConfig,
        registry: Arc<DeviceRegistry>,
        host: String,
    ) -> Result<Self> {
        let socket = bind_socket(&config)?;
        let local_addr = socket.local_addr().map_err(|source| DiscoveryError::Bind {
            addr: config.bind_addr.to_string(),
            source,
        })?;

        info!(
            "SSDP responder listening on {} for {} device(s)",
            local_addr,
            registry.len()
        );

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(run(socket, registry, host, shutdown_rx));

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop answering probes and close the socket.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| DiscoveryError::Task(e.to_string()))?;
        }

        info!("SSDP responder stopped");
        Ok(())
    }
}

impl Drop for SsdpResponder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn bind_socket(config: &SsdpConfig) -> Result<UdpSocket> {
    let bind_err = |source: std::io::Error| DiscoveryError::Bind {
        addr: config.bind_addr.to_string(),
        source,
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket
        .bind(&SocketAddr::V4(config.bind_addr).into())
        .map_err(bind_err)?;

    if let Some(group) = config.multicast_group {
        socket
            .join_multicast_v4(&group, &config.interface)
            .map_err(|source| DiscoveryError::Multicast {
                group: group.to_string(),
                source,
            })?;
    }

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}

async fn run(
    socket: UdpSocket,
    registry: Arc<DeviceRegistry>,
    host: String,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut buffer = [0u8; 4096];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = socket.recv_from(&mut buffer) => match result {
                Ok((size, src)) => {
                    handle_datagram(&socket, &buffer[..size], src, &registry, &host).await;
                }
                Err(e) => {
                    warn!("SSDP receive error: {}", e);
                    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

async fn handle_datagram(
    socket: &UdpSocket,
    data: &[u8],
    src: SocketAddr,
    registry: &DeviceRegistry,
    host: &str,
) {
    let Ok(probe) = std::str::from_utf8(data) else {
        debug!("Ignoring non-UTF-8 datagram from {}", src);
        return;
    };

    let Some(search_target) = match_search_target(probe) else {
        return;
    };

    debug!(
        "Discovery probe from {} for {}, answering for {} device(s)",
        src,
        search_target,
        registry.len()
    );

    for device in registry.iter() {
        let response = discovery_response(device, host, search_target);
        match socket.send_to(response.as_bytes(), src).await {
            Ok(_) => debug!("Sent discovery reply for '{}' to {}", device.name(), src),
            Err(e) => warn!(
                "Failed to send discovery reply for '{}' to {}: {}",
                device.name(),
                src,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_joins_ssdp_group() {
        let config = SsdpConfig::default();
        assert_eq!(config.multicast_group, Some(SSDP_MULTICAST_ADDR));
        assert_eq!(config.bind_addr.port(), SSDP_PORT);
        assert!(SsdpConfig::unicast(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .multicast_group
            .is_none());
    }

    #[test]
    fn test_receive_errors_back_off() {
        assert!(RECV_ERROR_BACKOFF >= Duration::from_millis(10));
        assert!(RECV_ERROR_BACKOFF <= Duration::from_secs(1));
    }
}
