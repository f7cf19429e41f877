//! The plugin manager: registration, lifecycle transitions, and hook
//! dispatch over one shared registry.
//!
//! A manager is constructed explicitly and owned by the embedding
//! application; there is no global instance. Every operation takes `&self`
//! and is safe to call concurrently. The only operation that can return
//! `Err` is [`PluginManager::execute_hooks`] under the throw escalation
//! policy; every other anomaly is absorbed into events and logs.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use chroma_core::config::plugin::{ErrorPolicy, PluginManagerConfig};
use chroma_core::error::ChromaError;
use chroma_core::result::ChromaResult;

use crate::context::ExecutionContext;
use crate::events::{EventChannel, PluginEvent};
use crate::executor::{self, ExecuteOptions, SelectedPlugin};
use crate::hooks::{ConfigMap, HookResult, Lifecycle};
use crate::plugin::ThemePlugin;
use crate::registry::{PluginRecord, PluginStatus, RegistryState};
use crate::stats::PluginStats;
use crate::validation;

/// Options for one registration.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Configuration overrides merged over the descriptor's defaults.
    pub config: Option<ConfigMap>,
    /// Whether the plugin starts enabled, overriding the manager's
    /// `enabled_by_default`.
    pub auto_enable: Option<bool>,
}

impl RegisterOptions {
    /// Sets configuration overrides for this registration.
    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the initial enabled state for this registration.
    pub fn with_auto_enable(mut self, auto_enable: bool) -> Self {
        self.auto_enable = Some(auto_enable);
        self
    }
}

/// Orchestrates a set of theme plugins.
///
/// Owns the registry behind one `RwLock`; all mutations (including
/// execution-order recomputation) happen under the write guard, so the
/// cached order is always consistent with the records between calls.
#[derive(Debug)]
pub struct PluginManager {
    /// Behavior knobs, read once at construction.
    config: PluginManagerConfig,
    /// Registered plugins and the cached execution order.
    state: RwLock<RegistryState>,
    /// Lifecycle event channel.
    events: Arc<EventChannel>,
    /// Whether `initialize` has run (or `auto_initialize` was set).
    initialized: AtomicBool,
}

impl PluginManager {
    /// Creates a manager with the given configuration.
    ///
    /// With `auto_initialize` set the manager is born initialized: the
    /// registry is empty at this point, so plugins run their init hook as
    /// they are registered instead of waiting for [`Self::initialize`].
    pub fn new(config: PluginManagerConfig) -> Self {
        let initialized = AtomicBool::new(config.auto_initialize);
        Self {
            config,
            state: RwLock::new(RegistryState::default()),
            events: Arc::new(EventChannel::new()),
            initialized,
        }
    }

    /// Creates a manager with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PluginManagerConfig::default())
    }

    // ── Registration ──

    /// Registers a plugin with default options.
    pub async fn register(&self, plugin: impl ThemePlugin + 'static) -> bool {
        self.register_with(plugin, RegisterOptions::default()).await
    }

    /// Registers a plugin.
    ///
    /// The descriptor is validated first; errors (and, in strict mode,
    /// warnings) reject the registration with a `plugin:error` event and
    /// leave the registry untouched. On success the stored configuration is
    /// the descriptor's defaults shallow-merged with the registration
    /// overrides, and the execution order is recomputed. If the manager is
    /// initialized and the plugin starts enabled, its init hook runs before
    /// `plugin:registered` is emitted.
    pub async fn register_with(
        &self,
        plugin: impl ThemePlugin + 'static,
        options: RegisterOptions,
    ) -> bool {
        let descriptor = plugin.descriptor();
        let name = descriptor.name.clone();
        let mut state = self.state.write().await;

        if state.records.contains_key(&name) {
            warn!(plugin = %name, "Plugin is already registered");
            self.events.emit(PluginEvent::Error {
                plugin: name,
                error: ChromaError::conflict(format!(
                    "Plugin '{}' is already registered",
                    descriptor.name
                )),
            });
            return false;
        }

        let report = {
            let known: HashSet<&str> = state.records.keys().map(String::as_str).collect();
            validation::validate(&descriptor, &known)
        };
        for warning in &report.warnings {
            warn!(plugin = %name, warning = %warning, "Descriptor warning");
        }
        let rejection = if !report.errors.is_empty() {
            Some(report.errors.join("; "))
        } else if self.config.strict_mode && !report.warnings.is_empty() {
            Some(report.warnings.join("; "))
        } else {
            None
        };
        if let Some(reason) = rejection {
            warn!(plugin = %name, reason = %reason, "Plugin registration rejected");
            self.events.emit(PluginEvent::Error {
                plugin: name.clone(),
                error: ChromaError::validation(format!(
                    "Plugin '{name}' failed validation: {reason}"
                )),
            });
            return false;
        }

        let mut config = descriptor.default_config.clone();
        if let Some(overrides) = options.config {
            config.extend(overrides);
        }
        let enabled = options.auto_enable.unwrap_or(self.config.enabled_by_default);
        let version = descriptor.version.clone();

        state.insert(PluginRecord {
            descriptor,
            instance: Arc::new(plugin),
            config,
            enabled,
            initialized: false,
            registered_at: Utc::now(),
        });
        state.recompute_order();

        if enabled && self.is_initialized() {
            self.init_plugin(&mut state, &name).await;
        }

        info!(plugin = %name, version = %version, enabled, "Plugin registered");
        self.events.emit(PluginEvent::Registered { plugin: name });
        true
    }

    /// Unregisters a plugin, running its destroy hook first if it was
    /// initialized.
    pub async fn unregister(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.records.contains_key(name) {
            self.warn_unknown(name, "unregister");
            return false;
        }

        self.destroy_plugin(&mut state, name).await;
        state.remove(name);
        state.recompute_order();

        info!(plugin = %name, "Plugin unregistered");
        self.events.emit(PluginEvent::Unregistered {
            plugin: name.to_string(),
        });
        true
    }

    // ── Enable / disable ──

    /// Enables a plugin so it participates in lifecycle runs.
    ///
    /// Runs the init hook first when the manager is initialized and the
    /// plugin never was, then the plugin's own enable hook. Hook failures
    /// are logged and evented but do not prevent the state change.
    pub async fn enable(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get(name) else {
            self.warn_unknown(name, "enable");
            return false;
        };
        if record.enabled {
            warn!(plugin = %name, "Plugin is already enabled");
            return false;
        }

        if self.is_initialized() && !record.initialized {
            self.init_plugin(&mut state, name).await;
        }
        self.run_transition_logged(&state, name, Lifecycle::Enable)
            .await;
        if let Some(record) = state.records.get_mut(name) {
            record.enabled = true;
        }

        info!(plugin = %name, "Plugin enabled");
        self.events.emit(PluginEvent::Enabled {
            plugin: name.to_string(),
        });
        true
    }

    /// Disables a plugin. Disabled plugins keep their state and
    /// configuration but are skipped by lifecycle runs.
    pub async fn disable(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get(name) else {
            self.warn_unknown(name, "disable");
            return false;
        };
        if !record.enabled {
            warn!(plugin = %name, "Plugin is already disabled");
            return false;
        }

        self.run_transition_logged(&state, name, Lifecycle::Disable)
            .await;
        if let Some(record) = state.records.get_mut(name) {
            record.enabled = false;
        }

        info!(plugin = %name, "Plugin disabled");
        self.events.emit(PluginEvent::Disabled {
            plugin: name.to_string(),
        });
        true
    }

    // ── Initialization ──

    /// Runs the init hook for every enabled, uninitialized plugin in
    /// execution order, then leaves the manager initialized so later
    /// registrations initialize on arrival.
    ///
    /// Idempotent: a second call warns and changes nothing.
    pub async fn initialize(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("Plugin manager is already initialized");
            return false;
        }

        let mut state = self.state.write().await;
        for name in state.ordered_names() {
            let pending = state
                .records
                .get(&name)
                .map(|record| record.enabled && !record.initialized)
                .unwrap_or(false);
            if pending {
                self.init_plugin(&mut state, &name).await;
            }
        }
        info!(plugins = state.records.len(), "Plugin manager initialized");
        true
    }

    /// Whether the manager has been initialized, explicitly or at
    /// construction via `auto_initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    // ── Hook execution ──

    /// Runs one lifecycle across the registered plugins.
    ///
    /// The plugin set is snapshotted up front under a read lock, so
    /// registrations during the run do not affect it. Returns the
    /// per-plugin result map for every attempted plugin. `Err` is possible
    /// only in sequential mode with `error_handling = Throw` and
    /// `ignore_errors` unset, in which case the first failure aborts the
    /// remaining plugins.
    pub async fn execute_hooks(
        &self,
        lifecycle: Lifecycle,
        context: &ExecutionContext,
        options: ExecuteOptions,
    ) -> ChromaResult<HashMap<String, HookResult>> {
        if lifecycle.is_transition() {
            warn!(
                lifecycle = %lifecycle,
                "Transition lifecycles are normally driven by the manager itself"
            );
        }

        let selected = {
            let state = self.state.read().await;
            executor::select_plugins(&state, lifecycle, &options)
        };
        let names: Vec<String> = selected.iter().map(|plugin| plugin.name.clone()).collect();
        debug!(lifecycle = %lifecycle, plugins = names.len(), "Executing hooks");
        self.events.emit(PluginEvent::HookBefore {
            lifecycle,
            plugins: names,
        });

        let timeout = self.hook_timeout(options.timeout);
        let results = if options.parallel && self.config.allow_async_hooks {
            executor::run_parallel(&selected, lifecycle, context, timeout, &self.events).await
        } else {
            if options.parallel {
                warn!(
                    lifecycle = %lifecycle,
                    "Parallel execution requested but async hooks are disabled; running sequentially"
                );
            }
            let escalate =
                !options.ignore_errors && self.config.error_handling == ErrorPolicy::Throw;
            executor::run_sequential(&selected, lifecycle, context, timeout, escalate, &self.events)
                .await?
        };

        self.events.emit(PluginEvent::HookAfter {
            lifecycle,
            results: results.clone(),
        });
        Ok(results)
    }

    // ── Configuration ──

    /// Shallow-merges a patch over a plugin's stored configuration.
    pub async fn update_config(&self, name: &str, patch: ConfigMap) -> bool {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get_mut(name) else {
            self.warn_unknown(name, "update_config");
            return false;
        };
        record.config.extend(patch);
        debug!(plugin = %name, "Plugin configuration updated");
        true
    }

    /// Returns a plugin's current merged configuration.
    pub async fn config(&self, name: &str) -> Option<ConfigMap> {
        let state = self.state.read().await;
        state.records.get(name).map(|record| record.config.clone())
    }

    // ── Introspection ──

    /// Whether a plugin with this name is registered.
    pub async fn is_registered(&self, name: &str) -> bool {
        self.state.read().await.records.contains_key(name)
    }

    /// Whether this plugin is currently enabled.
    pub async fn is_enabled(&self, name: &str) -> bool {
        let state = self.state.read().await;
        state
            .records
            .get(name)
            .map(|record| record.enabled)
            .unwrap_or(false)
    }

    /// Returns the read view of one plugin.
    pub async fn status(&self, name: &str) -> Option<PluginStatus> {
        let state = self.state.read().await;
        state.records.get(name).map(PluginRecord::status)
    }

    /// Read views of every plugin, in registration order.
    pub async fn list(&self) -> Vec<PluginStatus> {
        self.state.read().await.list()
    }

    /// Names of every plugin in the order hooks will run.
    pub async fn execution_order(&self) -> Vec<String> {
        self.state.read().await.ordered_names()
    }

    /// Number of registered plugins.
    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Aggregated counts over the registry.
    pub async fn stats(&self) -> PluginStats {
        self.state.read().await.stats()
    }

    /// The event channel, for subscribing to lifecycle events.
    pub fn events(&self) -> &Arc<EventChannel> {
        &self.events
    }

    // ── Teardown ──

    /// Unregisters every plugin with full per-plugin teardown.
    ///
    /// Teardown runs in reverse execution order so dependents are destroyed
    /// before the plugins they depend on.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let mut names = state.ordered_names();
        names.reverse();
        for name in names {
            self.destroy_plugin(&mut state, &name).await;
            state.remove(&name);
            self.events.emit(PluginEvent::Unregistered { plugin: name });
        }
        state.execution_order.clear();
        info!("Plugin registry cleared");
    }

    // ── Internals ──

    /// Runs a plugin's init hook; success marks it initialized and emits
    /// `plugin:initialized`, failure emits `plugin:error`.
    async fn init_plugin(&self, state: &mut RegistryState, name: &str) {
        let result = self.run_transition(state, name, Lifecycle::Init).await;
        if result.success {
            if let Some(record) = state.records.get_mut(name) {
                record.initialized = true;
            }
            debug!(plugin = %name, "Plugin initialized");
            self.events.emit(PluginEvent::Initialized {
                plugin: name.to_string(),
            });
        } else {
            let error = executor::failure_error(name, Lifecycle::Init, &result);
            warn!(plugin = %name, error = %error, "Init hook failed");
            self.events.emit(PluginEvent::Error {
                plugin: name.to_string(),
                error,
            });
        }
    }

    /// Runs a plugin's destroy hook if it was initialized, clears the
    /// initialized flag, and emits `plugin:destroyed`. Hook failures are
    /// evented, never fatal.
    async fn destroy_plugin(&self, state: &mut RegistryState, name: &str) {
        let initialized = state
            .records
            .get(name)
            .map(|record| record.initialized)
            .unwrap_or(false);
        if !initialized {
            return;
        }

        let result = self.run_transition(state, name, Lifecycle::Destroy).await;
        if !result.success {
            let error = executor::failure_error(name, Lifecycle::Destroy, &result);
            warn!(plugin = %name, error = %error, "Destroy hook failed");
            self.events.emit(PluginEvent::Error {
                plugin: name.to_string(),
                error,
            });
        }
        if let Some(record) = state.records.get_mut(name) {
            record.initialized = false;
        }
        debug!(plugin = %name, "Plugin destroyed");
        self.events.emit(PluginEvent::Destroyed {
            plugin: name.to_string(),
        });
    }

    /// Runs one transition lifecycle through the hook runner with an empty
    /// context and the manager's default time budget.
    async fn run_transition(
        &self,
        state: &RegistryState,
        name: &str,
        lifecycle: Lifecycle,
    ) -> HookResult {
        let Some(record) = state.records.get(name) else {
            return HookResult::ok();
        };
        let selected = SelectedPlugin {
            name: name.to_string(),
            instance: Arc::clone(&record.instance),
            config: record.config.clone(),
            declares: record.descriptor.declares(lifecycle),
        };
        let context = ExecutionContext::empty();
        executor::run_hook(&selected, lifecycle, &context, self.hook_timeout(None)).await
    }

    /// Like [`Self::run_transition`] but logs and events failures instead
    /// of returning them. For enable/disable hooks, which never block the
    /// state change.
    async fn run_transition_logged(&self, state: &RegistryState, name: &str, lifecycle: Lifecycle) {
        let result = self.run_transition(state, name, lifecycle).await;
        if !result.success {
            let error = executor::failure_error(name, lifecycle, &result);
            warn!(plugin = %name, lifecycle = %lifecycle, error = %error, "Transition hook failed");
            self.events.emit(PluginEvent::Error {
                plugin: name.to_string(),
                error,
            });
        }
    }

    /// Effective time budget for one hook: the per-call override, else the
    /// configured default; `None` when async hooks are disabled (hooks are
    /// then awaited directly with no race).
    fn hook_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        if self.config.allow_async_hooks {
            Some(requested.unwrap_or_else(|| self.config.max_execution_time()))
        } else {
            None
        }
    }

    /// Warns about an operation on an unregistered name and emits the
    /// matching `plugin:error`.
    fn warn_unknown(&self, name: &str, operation: &str) {
        warn!(plugin = %name, operation, "Plugin is not registered");
        self.events.emit(PluginEvent::Error {
            plugin: name.to_string(),
            error: ChromaError::not_found(format!("Plugin '{name}' is not registered")),
        });
    }
}
