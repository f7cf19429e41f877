//! Configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod plugin;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::plugin::PluginManagerConfig;

use crate::error::ChromaError;

/// Root configuration for an application embedding Chroma.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChromaConfig {
    /// Plugin manager settings.
    #[serde(default)]
    pub plugins: PluginManagerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ChromaConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CHROMA_`.
    pub fn load(env: &str) -> Result<Self, ChromaError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CHROMA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ChromaError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| ChromaError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
