//! Per-device TCP server for hub control traffic.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use plugshim_device::wire::{CONTROL_PATH, EVENT_SERVICE_PATH, SETUP_PATH};
use plugshim_device::Device;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::descriptor::{event_service_xml, setup_xml};
use crate::dispatcher::{dispatch, Response};
use crate::error::{RequestError, ServerError};
use crate::http::{read_request, ControlRequest};
use crate::soap::UpnpError;

/// Action server settings shared by all devices.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; the port comes from the device
    /// Default: 0.0.0.0
    pub bind_ip: IpAddr,

    /// Time allowed for a hub to send its request, and for us to write the reply
    /// Default: 5 seconds
    pub read_timeout: Duration,

    /// Largest request (headers or body) accepted
    /// Default: 64 KiB
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            read_timeout: Duration::from_secs(5),
            max_request_size: 64 * 1024,
        }
    }
}

/// HTTP server for a single emulated outlet.
///
/// Serves `/setup.xml`, `/eventservice.xml` and the basicevent control endpoint on
/// the device's own port. Each connection carries one request and is closed after the
/// reply. A device with port `0` gets an ephemeral port; see [`ActionServer::local_addr`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use plugshim_device::{build_plugin, Device};
/// use plugshim_server::{ActionServer, ServerConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let plugin = build_plugin("SimpleHTTPPlugin", &serde_json::json!({
///     "on_cmd": "http://127.0.0.1:8000/on",
///     "off_cmd": "http://127.0.0.1:8000/off",
/// })).unwrap();
/// let device = Arc::new(Device::new("desk lamp", 12340, plugin));
///
/// let server = ActionServer::start(device, ServerConfig::default())
///     .await
///     .expect("Failed to start action server");
/// println!("Serving on {}", server.local_addr());
/// server.shutdown().await.unwrap();
/// # }
/// ```
pub struct ActionServer {
    device: Arc<Device>,
    local_addr: SocketAddr,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Accept loop handle
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ActionServer {
    /// Bind the device's port and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port is unavailable.
    pub async fn start(device: Arc<Device>, config: ServerConfig) -> Result<Self, ServerError> {
        let addr = SocketAddr::new(config.bind_ip, device.port());
        let bind_err = |source: std::io::Error| ServerError::Bind {
            device: device.name().to_string(),
            addr,
            source,
        };

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        info!("Serving '{}' on {}", device.name(), local_addr);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(accept_loop(listener, device.clone(), config, shutdown_rx));

        Ok(Self {
            device,
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, abort in-flight connections and release the port.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|e| ServerError::Task(e.to_string()))?;
        }

        info!("Stopped serving '{}'", self.device.name());
        Ok(())
    }
}

impl Drop for ActionServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    device: Arc<Device>,
    config: ServerConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let config = Arc::new(config);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(handle_connection(stream, peer, device.clone(), config.clone()));
                }
                Err(e) => {
                    warn!("Accept failed for '{}': {}", device.name(), e);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!("Connection task for '{}' panicked", device.name());
                    }
                }
            }
        }
    }

    connections.shutdown().await;
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    device: Arc<Device>,
    config: Arc<ServerConfig>,
) {
    let request = match timeout(
        config.read_timeout,
        read_request(&mut stream, config.max_request_size),
    )
    .await
    {
        Ok(Ok(request)) => request,
        Ok(Err(RequestError::Closed)) => return,
        Ok(Err(e)) => {
            debug!("Dropping request from {} to '{}': {}", peer, device.name(), e);
            return;
        }
        Err(_) => {
            debug!("Timed out reading request from {}", peer);
            return;
        }
    };

    debug!("{} {} from {} for '{}'", request.method, request.path, peer, device.name());

    let response = match AssertUnwindSafe(route(&device, &request)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!("Handler for '{}' panicked on {}", device.name(), request.path);
            Response::fault(UpnpError::ActionFailed)
        }
    };

    let wire = response.to_wire();
    match timeout(config.read_timeout, stream.write_all(wire.as_bytes())).await {
        Ok(Ok(())) => {
            let _ = stream.shutdown().await;
        }
        Ok(Err(e)) => debug!("Failed to reply to {}: {}", peer, e),
        Err(_) => debug!("Timed out replying to {}", peer),
    }
}

/// Pick the handler for a request.
pub async fn route(device: &Device, request: &ControlRequest) -> Response {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", SETUP_PATH) => Response::ok(setup_xml(device)),
        ("GET", EVENT_SERVICE_PATH) => Response::ok(event_service_xml()),
        ("POST", CONTROL_PATH) => dispatch(device, request).await,
        (method, path) => {
            debug!("No route for {} {}", method, path);
            Response::not_found()
        }
    }
}
