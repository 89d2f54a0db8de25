//! Built-in plugin implementations and the factory that selects them.

mod command_line;
mod simple_http;

pub use command_line::{CommandLineConfig, CommandLinePlugin};
pub use simple_http::{RequestData, SimpleHttpConfig, SimpleHttpPlugin};

use serde_json::Value;

use crate::plugin::{Plugin, PluginError};

/// Construct a plugin from its configuration type tag and device parameters.
///
/// # Errors
///
/// Returns `PluginError::UnknownType` for an unrecognised tag and
/// `PluginError::InvalidConfig` when the parameters do not fit the plugin.
pub fn build_plugin(type_tag: &str, params: &Value) -> Result<Box<dyn Plugin>, PluginError> {
    match type_tag {
        SimpleHttpPlugin::TYPE => Ok(Box::new(SimpleHttpPlugin::from_value(params)?)),
        CommandLinePlugin::TYPE => Ok(Box::new(CommandLinePlugin::from_value(params)?)),
        other => Err(PluginError::UnknownType(other.to_string())),
    }
}
