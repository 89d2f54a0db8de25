//! Error types for the discovery responder.

use std::io;

use thiserror::Error;

/// Error type for discovery operations.
///
/// Only socket setup can fail; per-datagram problems are logged and skipped by the
/// responder loop.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Creating, configuring or binding the UDP socket failed
    #[error("Failed to bind SSDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Joining the multicast group failed
    #[error("Failed to join multicast group {group}: {source}")]
    Multicast {
        group: String,
        #[source]
        source: io::Error,
    },
    /// The responder task ended abnormally
    #[error("Responder task failed: {0}")]
    Task(String),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
