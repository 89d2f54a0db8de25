//! Plugin that switches a device by calling HTTP endpoints.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::plugin::{Plugin, PluginError, PluginState};

/// Request payload: sent verbatim when a string, form-encoded when an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestData {
    Text(String),
    Form(serde_json::Map<String, Value>),
}

impl RequestData {
    fn form_pairs(map: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
        map.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }
}

/// Per-device parameters for [`SimpleHttpPlugin`].
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleHttpConfig {
    pub on_cmd: String,
    pub off_cmd: String,
    #[serde(default)]
    pub state_cmd: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_method")]
    pub state_method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub on_data: Option<RequestData>,
    #[serde(default)]
    pub off_data: Option<RequestData>,
    #[serde(default)]
    pub state_data: Option<RequestData>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub state_response_on: Option<String>,
    #[serde(default)]
    pub state_response_off: Option<String>,
    #[serde(default)]
    pub use_fake_state: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> u64 {
    3
}

/// Turns a device on and off by sending HTTP requests.
///
/// `on` and `off` succeed when the endpoint answers with a 2xx status. State is read
/// from `state_cmd` by looking for `state_response_on` / `state_response_off` in the
/// response body.
pub struct SimpleHttpPlugin {
    config: SimpleHttpConfig,
    method: Method,
    state_method: Method,
    client: reqwest::Client,
    fake_state: Mutex<PluginState>,
}

impl SimpleHttpPlugin {
    pub const TYPE: &'static str = "SimpleHTTPPlugin";

    pub fn new(config: SimpleHttpConfig) -> Result<Self, PluginError> {
        let method = parse_method(&config.method)?;
        let state_method = parse_method(&config.state_method)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| PluginError::InitializationFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            method,
            state_method,
            client,
            fake_state: Mutex::new(PluginState::Off),
        })
    }

    /// Build the plugin from a device's JSON parameters.
    pub fn from_value(value: &Value) -> Result<Self, PluginError> {
        let config: SimpleHttpConfig =
            serde_json::from_value(value.clone()).map_err(|e| PluginError::InvalidConfig {
                plugin: Self::TYPE,
                reason: e.to_string(),
            })?;
        Self::new(config)
    }

    pub fn config(&self) -> &SimpleHttpConfig {
        &self.config
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        data: Option<&RequestData>,
    ) -> Option<reqwest::Response> {
        let mut request = self.client.request(method.clone(), url);

        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        if let Some(ref user) = self.config.user {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        request = match data {
            Some(RequestData::Text(body)) => request.body(body.clone()),
            Some(RequestData::Form(map)) => request.form(&RequestData::form_pairs(map)),
            None => request,
        };

        match request.send().await {
            Ok(response) => {
                debug!("{} {} -> {}", method, url, response.status());
                Some(response)
            }
            Err(e) => {
                warn!("HTTP request to {} failed: {}", url, e);
                None
            }
        }
    }

    async fn set_state(&self, url: &str, data: Option<&RequestData>, new_state: PluginState) -> bool {
        let success = match self.send(&self.method, url, data).await {
            Some(response) => response.status().is_success(),
            None => false,
        };

        if success && self.config.use_fake_state {
            *self.fake_state.lock() = new_state;
        }

        success
    }
}

fn parse_method(method: &str) -> Result<Method, PluginError> {
    Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| PluginError::InvalidConfig {
        plugin: SimpleHttpPlugin::TYPE,
        reason: format!("invalid HTTP method '{}'", method),
    })
}

#[async_trait]
impl Plugin for SimpleHttpPlugin {
    fn name(&self) -> &'static str {
        Self::TYPE
    }

    async fn on(&self) -> bool {
        self.set_state(&self.config.on_cmd, self.config.on_data.as_ref(), PluginState::On)
            .await
    }

    async fn off(&self) -> bool {
        self.set_state(&self.config.off_cmd, self.config.off_data.as_ref(), PluginState::Off)
            .await
    }

    async fn get_state(&self) -> PluginState {
        let Some(ref state_cmd) = self.config.state_cmd else {
            if self.config.use_fake_state {
                return *self.fake_state.lock();
            }
            return PluginState::Unknown;
        };

        let Some(response) = self
            .send(&self.state_method, state_cmd, self.config.state_data.as_ref())
            .await
        else {
            return PluginState::Unknown;
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read state response from {}: {}", state_cmd, e);
                return PluginState::Unknown;
            }
        };

        let contains = |marker: &Option<String>| {
            marker.as_deref().is_some_and(|m| !m.is_empty() && body.contains(m))
        };

        if contains(&self.config.state_response_on) {
            PluginState::On
        } else if contains(&self.config.state_response_off) {
            PluginState::Off
        } else {
            PluginState::Unknown
        }
    }
}
