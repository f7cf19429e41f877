//! Tracing subscriber installation.
//!
//! Chroma is a library: its crates only emit through `tracing` macros and
//! never install a subscriber themselves. Embedding applications call
//! [`init`] once at startup to build a subscriber from configuration.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::ChromaConfig;
use crate::error::ChromaError;
use crate::result::ChromaResult;

/// Install the global tracing subscriber from configuration.
///
/// The base level comes from `logging.level`; plugin manager output is
/// additionally gated to `plugins.log_level`. A `RUST_LOG` environment
/// variable overrides both. Returns an error if a subscriber is already
/// installed.
pub fn init(config: &ChromaConfig) -> ChromaResult<()> {
    let directive = format!(
        "{},chroma_plugin={}",
        config.logging.level,
        config.plugins.log_level.filter_directive()
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let result = match config.logging.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    result
        .map_err(|e| ChromaError::configuration(format!("Failed to install subscriber: {e}")))
}
