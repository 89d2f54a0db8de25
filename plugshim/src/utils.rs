//! Network helpers.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};

/// Ask the OS for a free TCP port.
///
/// The port is released before returning, so another process could grab it first;
/// callers bind it soon after.
pub fn get_unused_port() -> io::Result<u16> {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))?;
    Ok(listener.local_addr()?.port())
}

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a route.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unused_port_is_bindable() {
        let port = get_unused_port().unwrap();
        assert_ne!(port, 0);

        let listener = TcpListener::bind(("0.0.0.0", port)).unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }
}
