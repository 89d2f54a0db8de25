//! Integration tests for the SSDP responder.
//!
//! These bind a real UDP socket on loopback (unicast only, so no multicast routing is
//! needed), send probes and check the replies.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plugshim_device::{Device, DeviceRegistry, Plugin, PluginState};
use plugshim_discovery::{SsdpConfig, SsdpResponder};
use tokio::net::UdpSocket;
use tokio::time::timeout;

struct NullPlugin;

#[async_trait]
impl Plugin for NullPlugin {
    fn name(&self) -> &'static str {
        "NullPlugin"
    }
    async fn on(&self) -> bool {
        true
    }
    async fn off(&self) -> bool {
        true
    }
    async fn get_state(&self) -> PluginState {
        PluginState::Unknown
    }
}

fn registry(devices: &[(&str, u16)]) -> Arc<DeviceRegistry> {
    let devices = devices
        .iter()
        .map(|(name, port)| Device::new(*name, *port, Box::new(NullPlugin)))
        .collect();
    Arc::new(DeviceRegistry::new(devices).unwrap())
}

async fn start(registry: Arc<DeviceRegistry>) -> SsdpResponder {
    let config = SsdpConfig::unicast(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
    SsdpResponder::start(config, registry, "127.0.0.1".to_string())
        .await
        .expect("Failed to start responder")
}

async fn recv_string(socket: &UdpSocket, wait: Duration) -> Option<String> {
    let mut buffer = [0u8; 4096];
    match timeout(wait, socket.recv(&mut buffer)).await {
        Ok(Ok(size)) => Some(String::from_utf8_lossy(&buffer[..size]).into_owned()),
        _ => None,
    }
}

#[tokio::test]
async fn test_probe_gets_one_reply_per_device() {
    let responder = start(registry(&[("fake switch one", 12345), ("fake switch two", 12346)])).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(
            b"MAN: \"ssdp:discover\"ST: urn:Belkin:device:**",
            responder.local_addr(),
        )
        .await
        .unwrap();

    let mut replies = Vec::new();
    while let Some(reply) = recv_string(&client, Duration::from_secs(1)).await {
        replies.push(reply);
        if replies.len() == 2 {
            break;
        }
    }

    assert_eq!(replies.len(), 2);
    for reply in &replies {
        assert!(reply.contains("LOCATION: http://"));
        assert!(reply.contains("/setup.xml"));
        assert!(reply.ends_with("\r\n\r\n"));
    }
    assert!(replies.iter().any(|r| r.contains(":12345/setup.xml")));
    assert!(replies.iter().any(|r| r.contains(":12346/setup.xml")));

    responder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unrelated_and_malformed_datagrams_are_ignored() {
    let responder = start(registry(&[("lamp", 12345)])).await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // not a probe for us
    client
        .send_to(
            b"M-SEARCH * HTTP/1.1\r\nMAN: \"ssdp:discover\"\r\nST: urn:dial-multiscreen-org:service:dial:1\r\n\r\n",
            responder.local_addr(),
        )
        .await
        .unwrap();
    // invalid UTF-8
    client
        .send_to(&[0xff, 0xfe, 0xfd], responder.local_addr())
        .await
        .unwrap();

    assert!(recv_string(&client, Duration::from_millis(200)).await.is_none());

    // the responder is still alive afterwards
    client
        .send_to(
            b"M-SEARCH * HTTP/1.1\r\nMAN: \"ssdp:discover\"\r\nST: upnp:rootdevice\r\n\r\n",
            responder.local_addr(),
        )
        .await
        .unwrap();

    let reply = recv_string(&client, Duration::from_secs(1))
        .await
        .expect("No reply after malformed datagrams");
    assert!(reply.contains("ST: upnp:rootdevice\r\n"));
    assert!(reply.contains("::upnp:rootdevice\r\n"));

    responder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_releases_socket() {
    let responder = start(registry(&[("lamp", 12345)])).await;
    let addr = responder.local_addr();
    responder.shutdown().await.unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"MAN: \"ssdp:discover\"ST: ssdp:all", addr)
        .await
        .unwrap();
    assert!(recv_string(&client, Duration::from_millis(200)).await.is_none());
}
