//! Plugin that switches a device by running shell commands.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::plugin::{Plugin, PluginError, PluginState};

#[derive(Debug, Clone, Deserialize)]
pub struct CommandLineConfig {
    pub on_cmd: String,
    pub off_cmd: String,
    #[serde(default)]
    pub state_cmd: Option<String>,
    #[serde(default)]
    pub use_fake_state: bool,
    /// Command timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    10
}

/// Runs `on_cmd` / `off_cmd` through `sh -c`; exit status 0 means success.
///
/// With a `state_cmd`, the device is `on` when that command exits 0 and `off`
/// otherwise.
pub struct CommandLinePlugin {
    config: CommandLineConfig,
    fake_state: Mutex<PluginState>,
}

impl CommandLinePlugin {
    pub const TYPE: &'static str = "CommandLinePlugin";

    pub fn new(config: CommandLineConfig) -> Self {
        Self {
            config,
            fake_state: Mutex::new(PluginState::Off),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, PluginError> {
        let config: CommandLineConfig =
            serde_json::from_value(value.clone()).map_err(|e| PluginError::InvalidConfig {
                plugin: Self::TYPE,
                reason: e.to_string(),
            })?;
        Ok(Self::new(config))
    }

    /// Run a command, returning whether it exited successfully.
    ///
    /// Spawn failures and timeouts count as failure.
    async fn run(&self, cmd: &str) -> bool {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd).kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout);
        match tokio::time::timeout(timeout, command.status()).await {
            Ok(Ok(status)) => {
                debug!("Command `{}` exited with {}", cmd, status);
                status.success()
            }
            Ok(Err(e)) => {
                warn!("Failed to run command `{}`: {}", cmd, e);
                false
            }
            Err(_) => {
                warn!("Command `{}` timed out after {:?}", cmd, timeout);
                false
            }
        }
    }

    async fn set_state(&self, cmd: &str, new_state: PluginState) -> bool {
        let success = self.run(cmd).await;
        if success && self.config.use_fake_state {
            *self.fake_state.lock() = new_state;
        }
        success
    }
}

#[async_trait]
impl Plugin for CommandLinePlugin {
    fn name(&self) -> &'static str {
        Self::TYPE
    }

    async fn on(&self) -> bool {
        self.set_state(&self.config.on_cmd, PluginState::On).await
    }

    async fn off(&self) -> bool {
        self.set_state(&self.config.off_cmd, PluginState::Off).await
    }

    async fn get_state(&self) -> PluginState {
        match self.config.state_cmd {
            Some(ref state_cmd) => {
                if self.run(state_cmd).await {
                    PluginState::On
                } else {
                    PluginState::Off
                }
            }
            None if self.config.use_fake_state => *self.fake_state.lock(),
            None => PluginState::Unknown,
        }
    }
}
