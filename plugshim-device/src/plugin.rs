//! Capability contract for backend devices.
//!
//! A [`Plugin`] is whatever actually flips the switch: an HTTP endpoint, a shell
//! command, or anything else that can answer "on", "off" and "what state are you in".
//! Each configured device owns exactly one plugin instance for the lifetime of the
//! process. Plugins are selected by a type tag from configuration, see
//! [`crate::plugins::build_plugin`].

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while constructing or tearing down a plugin.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Unknown plugin type: {0}")]
    UnknownType(String),
    #[error("Invalid configuration for {plugin}: {reason}")]
    InvalidConfig {
        plugin: &'static str,
        reason: String,
    },
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),
    #[error("Plugin shutdown failed: {0}")]
    ShutdownFailed(String),
}

/// State reported by a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    On,
    Off,
    /// The backend cannot (or will not) report its state.
    Unknown,
}

impl PluginState {
    /// Value used inside a `BinaryState` element.
    ///
    /// `Unknown` keeps its name so a hub can tell it apart from `0` and `1`.
    pub fn as_binary_state(&self) -> &'static str {
        match self {
            PluginState::On => "1",
            PluginState::Off => "0",
            PluginState::Unknown => "unknown",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::On => "on",
            PluginState::Off => "off",
            PluginState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait implemented by every backend capability.
///
/// Implementations must be `Send + Sync`: a device's action server may call into the
/// same plugin from several connection tasks at once. If a backend cannot tolerate
/// concurrent calls, the implementation serializes them itself.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Type tag this plugin was registered under (e.g. `"SimpleHTTPPlugin"`).
    fn name(&self) -> &'static str;

    /// Turn the backend on. Returns `true` on success.
    async fn on(&self) -> bool;

    /// Turn the backend off. Returns `true` on success.
    async fn off(&self) -> bool;

    /// Query the backend's current state.
    async fn get_state(&self) -> PluginState;

    /// Release any resources held by the plugin.
    ///
    /// Called once when the owning device is torn down.
    async fn close(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TestPlugin {
        state: AtomicBool,
        should_fail: bool,
    }

    impl TestPlugin {
        fn new() -> Self {
            Self {
                state: AtomicBool::new(false),
                should_fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &'static str {
            "TestPlugin"
        }

        async fn on(&self) -> bool {
            if self.should_fail {
                return false;
            }
            self.state.store(true, Ordering::SeqCst);
            true
        }

        async fn off(&self) -> bool {
            if self.should_fail {
                return false;
            }
            self.state.store(false, Ordering::SeqCst);
            true
        }

        async fn get_state(&self) -> PluginState {
            if self.state.load(Ordering::SeqCst) {
                PluginState::On
            } else {
                PluginState::Off
            }
        }
    }

    #[test]
    fn test_binary_state_values() {
        assert_eq!(PluginState::On.as_binary_state(), "1");
        assert_eq!(PluginState::Off.as_binary_state(), "0");
        assert_eq!(PluginState::Unknown.as_binary_state(), "unknown");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PluginState::On.to_string(), "on");
        assert_eq!(PluginState::Unknown.to_string(), "unknown");
    }

    #[tokio::test]
    async fn test_plugin_trait_object() {
        let plugin: Box<dyn Plugin> = Box::new(TestPlugin::new());
        assert_eq!(plugin.get_state().await, PluginState::Off);
        assert!(plugin.on().await);
        assert_eq!(plugin.get_state().await, PluginState::On);
        assert!(plugin.off().await);
        assert_eq!(plugin.get_state().await, PluginState::Off);
        assert!(plugin.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_plugin() {
        let plugin = TestPlugin::failing();
        assert!(!plugin.on().await);
        assert!(!plugin.off().await);
    }
}
