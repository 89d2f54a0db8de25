//! Error types for the action server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop an action server from starting or stopping cleanly.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind action server for '{device}' on {addr}: {source}")]
    Bind {
        device: String,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Server task failed: {0}")]
    Task(String),
}

/// Errors while reading a request off a connection.
///
/// None of these reach the hub: the connection is simply closed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Peer closed the connection before sending anything
    #[error("Connection closed before a request was received")]
    Closed,

    /// Peer closed the connection before the header terminator
    #[error("Connection closed mid-request")]
    Incomplete,

    #[error("Request exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
