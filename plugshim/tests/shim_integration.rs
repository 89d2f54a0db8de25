//! End-to-end tests: configuration file to discovery, descriptor and control.

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use plugshim::{get_unused_port, Config, Shim, ShimOptions};
use plugshim_discovery::SsdpConfig;
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn loopback_options() -> ShimOptions {
    let mut options = ShimOptions::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
    options.ssdp = SsdpConfig::unicast(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
    options
}

#[test]
fn test_sample_config_loads() {
    let config = Config::load(&data_file("test_config.json")).unwrap();
    let specs = config.device_specs().unwrap();

    let names: Vec<_> = specs.iter().map(|spec| spec.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "fake switch one",
            "fake switch two",
            "fake switch three",
            "fake command switch"
        ]
    );
    assert_eq!(specs[0].port, 12345);
    assert_ne!(specs[3].port, 0);
    assert_eq!(specs[3].params["use_fake_state"], true);

    assert_eq!(config.build_devices().unwrap().len(), 4);
    assert_eq!(config.host_ip().unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[test]
fn test_obsolete_config_exits_nonzero() {
    let output = Command::new(env!("CARGO_BIN_EXE_plugshim"))
        .arg("--config")
        .arg(data_file("old-config-sample.json"))
        .env_remove("PLUGSHIM_CONFIG")
        .output()
        .expect("Failed to run plugshim");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Obsolete config format"), "{}", stderr);
}

#[test]
fn test_missing_config_exits_nonzero() {
    let output = Command::new(env!("CARGO_BIN_EXE_plugshim"))
        .arg("-c")
        .arg(data_file("does-not-exist.json"))
        .output()
        .expect("Failed to run plugshim");

    assert!(!output.status.success());
}

#[tokio::test]
async fn test_discover_describe_and_switch() {
    let mut target = mockito::Server::new_async().await;
    let on = target
        .mock("GET", "/on")
        .with_status(200)
        .create_async()
        .await;
    let state = target
        .mock("GET", "/state")
        .with_status(200)
        .with_body("relay is on")
        .create_async()
        .await;

    let config = Config::from_json(
        &serde_json::json!({
            "SERVER": {"ip_address": "127.0.0.1"},
            "PLUGINS": {
                "SimpleHTTPPlugin": {
                    "on_cmd": format!("{}/on", target.url()),
                    "off_cmd": format!("{}/off", target.url()),
                    "state_cmd": format!("{}/state", target.url()),
                    "state_response_on": "is on",
                    "state_response_off": "is off",
                    "DEVICES": [
                        {"name": "fake switch one", "port": get_unused_port().unwrap()},
                        {"name": "fake switch two", "port": get_unused_port().unwrap()}
                    ]
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let shim = Shim::start(config.build_devices().unwrap(), loopback_options())
        .await
        .expect("Failed to start shim");

    // discovery
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(
            b"M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nMX: 1\r\nST: urn:Belkin:device:**\r\n\r\n",
            shim.responder_addr(),
        )
        .await
        .unwrap();

    let mut locations = Vec::new();
    let mut buffer = [0u8; 4096];
    while locations.len() < 2 {
        let size = timeout(Duration::from_secs(2), client.recv(&mut buffer))
            .await
            .expect("Timed out waiting for discovery reply")
            .unwrap();
        let reply = String::from_utf8_lossy(&buffer[..size]).into_owned();
        let location = reply
            .lines()
            .find_map(|line| line.strip_prefix("LOCATION: "))
            .expect("Reply without LOCATION")
            .to_string();
        locations.push(location);
    }

    // descriptor
    let mut names = Vec::new();
    for location in &locations {
        let body = reqwest::get(location).await.unwrap().text().await.unwrap();
        let name = body
            .split("<friendlyName>")
            .nth(1)
            .and_then(|rest| rest.split("</friendlyName>").next())
            .unwrap()
            .to_string();
        names.push(name);
    }
    names.sort();
    assert_eq!(names, vec!["fake switch one", "fake switch two"]);

    // control, with the action line in the body
    let (_, addr) = shim.server_addrs()[0];
    let control_url = format!("http://{}/upnp/control/basicevent1", addr);
    let client = reqwest::Client::new();

    let response = client
        .post(&control_url)
        .body(r#"SOAPACTION: "urn:Belkin:service:basicevent:1#SetBinaryState"<BinaryState>1</BinaryState>"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(&control_url)
        .body(r#"Soapaction: "urn:Belkin:service:basicevent:1#GetBinaryState""#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("<BinaryState>1</BinaryState>"));

    on.assert_async().await;
    state.assert_async().await;

    shim.shutdown().await.unwrap();
}
