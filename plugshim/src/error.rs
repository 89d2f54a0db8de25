//! Top-level errors for running a set of emulated outlets.

use plugshim_device::RegistryError;
use plugshim_discovery::DiscoveryError;
use plugshim_server::ServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Invalid device set: {0}")]
    Registry(#[from] RegistryError),

    #[error("SSDP responder failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Server(#[from] ServerError),
}
