//! Maps a control request to a plugin operation and a SOAP reply.

use plugshim_device::Device;
use tracing::{debug, info, warn};

use crate::http::{add_http_headers, ControlRequest, Status};
use crate::soap::{
    action_response, extract_binary_state, fault, find_inline_soap_action, parse_soap_action,
    UpnpError,
};

/// Actions understood on the basicevent control endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetBinaryState,
    GetBinaryState,
    GetFriendlyName,
    Unknown(String),
}

impl Action {
    pub fn from_name(name: &str) -> Self {
        match name {
            "SetBinaryState" => Action::SetBinaryState,
            "GetBinaryState" => Action::GetBinaryState,
            "GetFriendlyName" => Action::GetFriendlyName,
            other => Action::Unknown(other.to_string()),
        }
    }

    /// Resolve the action of a request.
    ///
    /// The `SOAPACTION` header wins; otherwise a `SOAPACTION:` line in the body is used.
    pub fn from_request(request: &ControlRequest) -> Option<Self> {
        request
            .header("soapaction")
            .or_else(|| find_inline_soap_action(&request.body))
            .and_then(parse_soap_action)
            .map(Action::from_name)
    }
}

/// A response ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: String,
}

impl Response {
    pub fn ok(body: String) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            body: String::new(),
        }
    }

    pub fn fault(error: UpnpError) -> Self {
        Self {
            status: error.status(),
            body: fault(error),
        }
    }

    /// Full HTTP message for the wire.
    pub fn to_wire(&self) -> String {
        add_http_headers(self.status, &self.body)
    }
}

/// Perform the action named in a control request against `device`.
pub async fn dispatch(device: &Device, request: &ControlRequest) -> Response {
    let Some(action) = Action::from_request(request) else {
        debug!("Control request for '{}' without a SOAPACTION", device.name());
        return Response::fault(UpnpError::InvalidAction);
    };

    match action {
        Action::SetBinaryState => set_binary_state(device, &request.body).await,
        Action::GetBinaryState => {
            let state = device.state().await;
            debug!("'{}' reports state {}", device.name(), state);
            Response::ok(action_response(
                "GetBinaryState",
                "BinaryState",
                state.as_binary_state(),
            ))
        }
        Action::GetFriendlyName => Response::ok(action_response(
            "GetFriendlyName",
            "FriendlyName",
            device.name(),
        )),
        Action::Unknown(name) => {
            info!("Unsupported action '{}' for '{}'", name, device.name());
            Response::fault(UpnpError::InvalidAction)
        }
    }
}

async fn set_binary_state(device: &Device, body: &str) -> Response {
    let value = match extract_binary_state(body) {
        Some(value @ ("0" | "1")) => value,
        other => {
            info!(
                "Rejecting SetBinaryState for '{}' with value {:?}",
                device.name(),
                other
            );
            return Response::fault(UpnpError::InvalidArgs);
        }
    };

    let succeeded = if value == "1" {
        device.on().await
    } else {
        device.off().await
    };

    if succeeded {
        info!(
            "Turned '{}' {}",
            device.name(),
            if value == "1" { "on" } else { "off" }
        );
        Response::ok(action_response("SetBinaryState", "BinaryState", value))
    } else {
        warn!("Plugin {} failed to switch '{}'", device.plugin().name(), device.name());
        Response::fault(UpnpError::ActionFailed)
    }
}
