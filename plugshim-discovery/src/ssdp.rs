//! SSDP message handling: recognising search probes and composing replies.
//!
//! Pure functions only; the socket loop lives in [`crate::responder`].

use std::net::Ipv4Addr;

use plugshim_device::wire::{http_date, setup_location, SERVER_BANNER};
use plugshim_device::Device;

/// Standard SSDP multicast group
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Standard SSDP port
pub const SSDP_PORT: u16 = 1900;

/// Seconds a hub may cache a discovery reply
pub const MAX_AGE: u32 = 86400;

/// Search targets that get a reply, in priority order.
///
/// Every target is answered for every device; a probe naming a more specific
/// device type is not filtered.
pub const SEARCH_TARGETS: &[&str] = &["urn:Belkin:device:**", "upnp:rootdevice", "ssdp:all"];

const DISCOVER_MARKER: &str = "ssdp:discover";

/// Return the search target a probe asks for, if it is one we answer.
///
/// The probe must carry the `ssdp:discover` marker. Matching is case-insensitive and
/// does not depend on line structure, since some hubs pack headers loosely.
pub fn match_search_target(probe: &str) -> Option<&'static str> {
    let lowered = probe.to_ascii_lowercase();
    if !lowered.contains(DISCOVER_MARKER) {
        return None;
    }

    // prefer the ST header when it is on a line of its own
    if let Some(st) = probe
        .lines()
        .find_map(|line| extract_header_value(line.trim(), "ST:"))
    {
        if let Some(target) = SEARCH_TARGETS
            .iter()
            .find(|t| st.eq_ignore_ascii_case(t))
        {
            return Some(target);
        }
    }

    SEARCH_TARGETS
        .iter()
        .find(|t| lowered.contains(&t.to_ascii_lowercase()))
        .copied()
}

/// Compose the unicast reply announcing one device.
///
/// Every line ends with `\r\n` and the message ends with an empty line.
pub fn discovery_response(device: &Device, host: &str, search_target: &str) -> String {
    let lines = [
        "HTTP/1.1 200 OK".to_string(),
        format!("CACHE-CONTROL: max-age={}", MAX_AGE),
        format!("DATE: {}", http_date()),
        "EXT:".to_string(),
        format!("LOCATION: {}", setup_location(host, device.port())),
        r#"OPT: "http://schemas.upnp.org/upnp/1/0/"; ns=01"#.to_string(),
        format!("01-NLS: {}", uuid::Uuid::new_v4()),
        format!("SERVER: {}", SERVER_BANNER),
        format!("ST: {}", search_target),
        format!("USN: {}::{}", device.udn(), search_target),
    ];

    let mut response = lines.join("\r\n");
    response.push_str("\r\n\r\n");
    response
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len()
        && line.is_char_boundary(header.len())
        && line[..header.len()].eq_ignore_ascii_case(header)
    {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}
