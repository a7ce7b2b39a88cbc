//! Service configuration loader.
//!
//! The service's identity (name, display name, file extension) comes from a
//! small YAML file; broker addressing comes from the environment (see
//! `nats::BrokerConfig`). The sub-parser name list is not configured here;
//! it is read off the compiled-in plugin set at startup.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::descriptor::ServiceDescriptor;

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    Read(String),
    Parse(String),
    MissingName,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::MissingName => write!(f, "Config 'name' must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Service identity loaded from a YAML file.
///
/// `display_name` falls back to `name` when absent; `extension` is
/// optional.
///
/// # Example
/// ```yaml
/// name: threats
/// display_name: Threat Parser
/// extension: .threat
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl ServiceConfig {
    /// Load service configuration from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid YAML, or has
    /// an empty `name`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&contents)
    }

    /// Parse service configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.name.is_empty() {
            return Err(ConfigError::MissingName);
        }
        Ok(config)
    }

    /// Build the service descriptor from this config and the plugin set's
    /// registered sub-parser names
    pub fn descriptor(&self, sub_parsers: Vec<String>) -> ServiceDescriptor {
        ServiceDescriptor::new(
            self.name.clone(),
            self.display_name
                .clone()
                .unwrap_or_else(|| self.name.clone()),
            self.extension.clone(),
            sub_parsers,
        )
    }
}
