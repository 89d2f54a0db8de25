//! Identifiers shared by the discovery and control sides of the protocol.

use chrono::Utc;

/// `SERVER` banner used in discovery replies and HTTP responses
pub const SERVER_BANNER: &str = "Unspecified, UPnP/1.0, Unspecified";

pub const DEVICE_TYPE: &str = "urn:Belkin:device:controllee:1";

pub const SERVICE_TYPE: &str = "urn:Belkin:service:basicevent:1";

pub const SERVICE_ID: &str = "urn:Belkin:serviceId:basicevent1";

pub const SETUP_PATH: &str = "/setup.xml";

pub const EVENT_SERVICE_PATH: &str = "/eventservice.xml";

pub const CONTROL_PATH: &str = "/upnp/control/basicevent1";

pub const EVENT_SUB_PATH: &str = "/upnp/event/basicevent1";

/// Current time as an RFC 1123 date, e.g. `Sun, 18 Oct 2026 10:00:00 GMT`.
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Descriptor URL a hub is pointed at for a device.
///
/// IPv6 literals are bracketed.
pub fn setup_location(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}{}", host, port, SETUP_PATH)
    } else {
        format!("http://{}:{}{}", host, port, SETUP_PATH)
    }
}
