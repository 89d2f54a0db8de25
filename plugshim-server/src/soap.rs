//! SOAP envelope rendering and the small parsers the control endpoint needs.

use plugshim_device::wire::SERVICE_TYPE;
use quick_xml::escape::escape;

use crate::http::Status;

const ENVELOPE_OPEN: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body>"#;
const ENVELOPE_CLOSE: &str = "</s:Body></s:Envelope>";

/// UPnP control errors reported in a SOAP fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpnpError {
    InvalidAction,
    InvalidArgs,
    ActionFailed,
}

impl UpnpError {
    pub fn code(&self) -> u16 {
        match self {
            UpnpError::InvalidAction => 401,
            UpnpError::InvalidArgs => 402,
            UpnpError::ActionFailed => 501,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UpnpError::InvalidAction => "Invalid Action",
            UpnpError::InvalidArgs => "Invalid Args",
            UpnpError::ActionFailed => "Action Failed",
        }
    }

    /// HTTP status the fault is sent with
    pub fn status(&self) -> Status {
        match self {
            UpnpError::InvalidAction | UpnpError::InvalidArgs => Status::BadRequest,
            UpnpError::ActionFailed => Status::InternalServerError,
        }
    }
}

/// Extract the action name from a `SOAPACTION` value.
///
/// `"urn:Belkin:service:basicevent:1#SetBinaryState"` yields `SetBinaryState`. When
/// the value starts with a quote only the quoted part is considered, so trailing
/// junk on the same line is ignored. Returns `None` without a `#` or with an empty
/// action.
pub fn parse_soap_action(value: &str) -> Option<&str> {
    let value = value.trim();
    let quoted = match value.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(rest),
        None => value,
    };

    let (_, action) = quoted.rsplit_once('#')?;
    let action = action.trim_end_matches('"').trim();
    if action.is_empty() {
        None
    } else {
        Some(action)
    }
}

/// Find a `SOAPACTION:` line inside a body.
///
/// Some clients put the action line in the payload instead of the headers.
pub fn find_inline_soap_action(body: &str) -> Option<&str> {
    const PREFIX: &str = "soapaction:";
    body.lines().map(str::trim_start).find_map(|line| {
        let head = line.get(..PREFIX.len())?;
        if head.eq_ignore_ascii_case(PREFIX) {
            Some(&line[PREFIX.len()..])
        } else {
            None
        }
    })
}

/// Value of the first `<BinaryState>` element in a body.
pub fn extract_binary_state(body: &str) -> Option<&str> {
    const OPEN: &str = "<BinaryState>";
    const CLOSE: &str = "</BinaryState>";

    let start = body.find(OPEN)? + OPEN.len();
    let len = body[start..].find(CLOSE)?;
    Some(body[start..start + len].trim())
}

/// Envelope for a successful action: `<u:{action}Response><{element}>value</{element}>`.
///
/// `value` is escaped here.
pub fn action_response(action: &str, element: &str, value: &str) -> String {
    format!(
        r#"{open}<u:{action}Response xmlns:u="{service}"><{element}>{value}</{element}></u:{action}Response>{close}"#,
        open = ENVELOPE_OPEN,
        close = ENVELOPE_CLOSE,
        action = action,
        service = SERVICE_TYPE,
        element = element,
        value = escape(value),
    )
}

/// Envelope carrying a UPnP fault.
pub fn fault(error: UpnpError) -> String {
    let fault_code = match error.status() {
        Status::InternalServerError => "s:Server",
        _ => "s:Client",
    };

    format!(
        r#"{open}<s:Fault><faultcode>{fault_code}</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>{code}</errorCode><errorDescription>{description}</errorDescription></UPnPError></detail></s:Fault>{close}"#,
        open = ENVELOPE_OPEN,
        close = ENVELOPE_CLOSE,
        fault_code = fault_code,
        code = error.code(),
        description = error.description(),
    )
}
