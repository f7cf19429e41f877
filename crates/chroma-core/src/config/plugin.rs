//! Plugin manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How hook failures are escalated during sequential execution.
///
/// Under [`ErrorPolicy::Warn`] a failing hook is logged and recorded in the
/// result map, and the remaining plugins still run. Under
/// [`ErrorPolicy::Throw`] the first failure aborts the run and is returned
/// to the caller as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log and record hook failures; keep executing remaining plugins.
    #[default]
    Warn,
    /// Propagate the first hook failure to the caller.
    Throw,
}

/// Log verbosity gate for plugin manager output.
///
/// The manager emits through `tracing`; this level is turned into a
/// subscriber filter directive by [`LogLevel::filter_directive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Suppress all plugin manager output.
    None,
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and informational messages.
    Info,
    /// Everything, including per-hook detail.
    Debug,
}

impl LogLevel {
    /// Returns the `tracing` filter directive equivalent for this level.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::None => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Plugin manager configuration.
///
/// Read once at manager construction; not hot-reloadable mid-call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManagerConfig {
    /// Whether the manager starts initialized, so enabled plugins run their
    /// init hook as soon as they are registered.
    #[serde(default)]
    pub auto_initialize: bool,
    /// Whether newly registered plugins are enabled when registration does
    /// not say otherwise.
    #[serde(default = "default_true")]
    pub enabled_by_default: bool,
    /// Whether validation warnings reject registration instead of merely
    /// being logged.
    #[serde(default)]
    pub strict_mode: bool,
    /// Whether hooks may run asynchronously. Enables timeout racing and
    /// parallel execution; when false, hooks are awaited directly with no
    /// time budget and are expected to behave synchronously.
    #[serde(default = "default_true")]
    pub allow_async_hooks: bool,
    /// Default per-hook execution budget in milliseconds.
    #[serde(default = "default_max_execution_time_ms")]
    pub max_execution_time_ms: u64,
    /// Hook failure escalation policy.
    #[serde(default)]
    pub error_handling: ErrorPolicy,
    /// Log verbosity for manager operations.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl PluginManagerConfig {
    /// Returns the default hook execution budget as a [`Duration`].
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            auto_initialize: false,
            enabled_by_default: default_true(),
            strict_mode: false,
            allow_async_hooks: default_true(),
            max_execution_time_ms: default_max_execution_time_ms(),
            error_handling: ErrorPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_execution_time_ms() -> u64 {
    5000
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginManagerConfig::default();
        assert!(!config.auto_initialize);
        assert!(config.enabled_by_default);
        assert!(config.allow_async_hooks);
        assert_eq!(config.max_execution_time(), Duration::from_millis(5000));
        assert_eq!(config.error_handling, ErrorPolicy::Warn);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PluginManagerConfig =
            serde_json::from_str(r#"{"error_handling": "throw", "max_execution_time_ms": 250}"#)
                .expect("deserialize");
        assert_eq!(config.error_handling, ErrorPolicy::Throw);
        assert_eq!(config.max_execution_time_ms, 250);
        assert!(config.enabled_by_default);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(LogLevel::None.filter_directive(), "off");
        assert_eq!(LogLevel::Debug.filter_directive(), "debug");
    }
}
