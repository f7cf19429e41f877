//! Hook execution: selection, timeout wrapping, and the two run policies.
//!
//! Nothing in this module escapes as a panic or an unexpected error. A hook
//! that returns `Err`, panics, or exceeds its time budget becomes a failure
//! [`HookResult`]; escalation to the caller happens only in the sequential
//! driver, and only under the throw policy.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use chroma_core::error::ChromaError;
use chroma_core::result::ChromaResult;

use crate::context::ExecutionContext;
use crate::descriptor::PluginCategory;
use crate::events::{EventChannel, PluginEvent, panic_message};
use crate::hooks::{ConfigMap, HookResult, Lifecycle};
use crate::plugin::ThemePlugin;
use crate::registry::RegistryState;

/// Options for one `execute_hooks` call.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Run all selected hooks concurrently instead of in order. Honored
    /// only when the manager allows asynchronous hooks.
    pub parallel: bool,
    /// Per-hook time budget for this call, overriding the manager default.
    pub timeout: Option<Duration>,
    /// Keep only plugins in one of these categories.
    pub filter_by_category: Option<Vec<PluginCategory>>,
    /// Keep only plugins carrying at least one of these tags.
    pub filter_by_tags: Option<Vec<String>>,
    /// Drop these plugins from the run.
    pub exclude_plugins: Vec<String>,
    /// Keep only these plugins.
    pub include_only: Option<Vec<String>>,
    /// Record failures without escalating, regardless of the manager's
    /// error policy.
    pub ignore_errors: bool,
}

impl ExecuteOptions {
    /// Requests parallel execution.
    pub fn with_parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Overrides the per-hook time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Keeps only plugins in the given categories.
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = PluginCategory>) -> Self {
        self.filter_by_category = Some(categories.into_iter().collect());
        self
    }

    /// Keeps only plugins carrying at least one of the given tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_by_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Drops a plugin from the run.
    pub fn with_exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude_plugins.push(name.into());
        self
    }

    /// Keeps only the named plugins.
    pub fn with_include_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Records failures without escalating.
    pub fn with_ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }
}

/// Snapshot of one plugin taken under the registry lock for a run.
#[derive(Debug, Clone)]
pub(crate) struct SelectedPlugin {
    /// Plugin name.
    pub name: String,
    /// The plugin instance.
    pub instance: Arc<dyn ThemePlugin>,
    /// Merged configuration at snapshot time.
    pub config: ConfigMap,
    /// Whether the plugin declares a hook for the lifecycle being run.
    pub declares: bool,
}

/// Computes the effective plugin subset for a lifecycle run.
///
/// Enabled plugins only, ordered by the cached execution order (names
/// missing from the order are appended last), then narrowed by the
/// include/exclude/category/tag filters. Filter names that reference
/// unknown plugins are logged and ignored.
pub(crate) fn select_plugins(
    state: &RegistryState,
    lifecycle: Lifecycle,
    options: &ExecuteOptions,
) -> Vec<SelectedPlugin> {
    if let Some(include) = &options.include_only {
        for name in include {
            if !state.records.contains_key(name) {
                warn!(plugin = %name, "include_only references an unknown plugin");
            }
        }
    }
    for name in &options.exclude_plugins {
        if !state.records.contains_key(name) {
            warn!(plugin = %name, "exclude_plugins references an unknown plugin");
        }
    }

    let mut selected = Vec::new();
    for name in state.ordered_names() {
        let Some(record) = state.records.get(&name) else {
            continue;
        };
        if !record.enabled {
            continue;
        }
        if let Some(include) = &options.include_only {
            if !include.contains(&name) {
                continue;
            }
        }
        if options.exclude_plugins.contains(&name) {
            continue;
        }
        if let Some(categories) = &options.filter_by_category {
            if !categories.contains(&record.descriptor.category) {
                continue;
            }
        }
        if let Some(tags) = &options.filter_by_tags {
            if !record.descriptor.tags.iter().any(|tag| tags.contains(tag)) {
                continue;
            }
        }
        selected.push(SelectedPlugin {
            name: name.clone(),
            instance: Arc::clone(&record.instance),
            config: record.config.clone(),
            declares: record.descriptor.declares(lifecycle),
        });
    }
    selected
}

/// Invokes one plugin's hook for a lifecycle.
///
/// A plugin that does not declare the lifecycle yields an immediate
/// success with no timeout machinery. Otherwise the invocation is raced
/// against `timeout` when one is given; on expiry the hook future is
/// dropped (cancelled at its next suspension point) and a failure naming
/// the plugin and the budget is returned. `Err` returns and panics are
/// converted to failure results; nothing escapes this function.
pub(crate) async fn run_hook(
    selected: &SelectedPlugin,
    lifecycle: Lifecycle,
    context: &ExecutionContext,
    timeout: Option<Duration>,
) -> HookResult {
    if !selected.declares {
        return HookResult::ok();
    }

    debug!(plugin = %selected.name, lifecycle = %lifecycle, "Running hook");

    let invocation = AssertUnwindSafe(selected.instance.handle(lifecycle, context, &selected.config))
        .catch_unwind();

    let outcome = match timeout {
        Some(budget) => match tokio::time::timeout(budget, invocation).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    plugin = %selected.name,
                    lifecycle = %lifecycle,
                    timeout_ms = budget.as_millis() as u64,
                    "Hook timed out"
                );
                return HookResult::failure(ChromaError::timeout(format!(
                    "Plugin '{}' timed out after {}ms in {}",
                    selected.name,
                    budget.as_millis(),
                    lifecycle
                )));
            }
        },
        None => invocation.await,
    };

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => HookResult::failure(error),
        Err(panic) => {
            let message = panic_message(&panic);
            HookResult::failure(ChromaError::hook(format!(
                "Plugin '{}' panicked in {}: {}",
                selected.name, lifecycle, message
            )))
        }
    }
}

/// Runs the selected plugins strictly in order, awaiting each before the
/// next starts.
///
/// A failure emits `plugin:error`; with `escalate` set, the first failure
/// aborts the remaining plugins and propagates as `Err`. Otherwise it is
/// recorded and the run continues.
pub(crate) async fn run_sequential(
    selected: &[SelectedPlugin],
    lifecycle: Lifecycle,
    context: &ExecutionContext,
    timeout: Option<Duration>,
    escalate: bool,
    events: &EventChannel,
) -> ChromaResult<HashMap<String, HookResult>> {
    let mut results = HashMap::with_capacity(selected.len());
    for plugin in selected {
        let result = run_hook(plugin, lifecycle, context, timeout).await;
        if !result.success {
            let error = failure_error(&plugin.name, lifecycle, &result);
            warn!(plugin = %plugin.name, lifecycle = %lifecycle, error = %error, "Hook failed");
            events.emit(PluginEvent::Error {
                plugin: plugin.name.clone(),
                error: error.clone(),
            });
            if escalate {
                return Err(error);
            }
        }
        results.insert(plugin.name.clone(), result);
    }
    Ok(results)
}

/// Starts every selected plugin's hook concurrently and waits for all of
/// them to settle.
///
/// Failures are recorded independently and never abort sibling plugins.
pub(crate) async fn run_parallel(
    selected: &[SelectedPlugin],
    lifecycle: Lifecycle,
    context: &ExecutionContext,
    timeout: Option<Duration>,
    events: &EventChannel,
) -> HashMap<String, HookResult> {
    let invocations = selected.iter().map(|plugin| async move {
        let result = run_hook(plugin, lifecycle, context, timeout).await;
        (plugin, result)
    });
    let settled = futures::future::join_all(invocations).await;

    let mut results = HashMap::with_capacity(settled.len());
    for (plugin, result) in settled {
        if !result.success {
            let error = failure_error(&plugin.name, lifecycle, &result);
            warn!(plugin = %plugin.name, lifecycle = %lifecycle, error = %error, "Hook failed");
            events.emit(PluginEvent::Error {
                plugin: plugin.name.clone(),
                error,
            });
        }
        results.insert(plugin.name.clone(), result);
    }
    results
}

/// Extracts the error from a failure result, synthesizing one for hooks
/// that reported failure without an error value.
pub(crate) fn failure_error(name: &str, lifecycle: Lifecycle, result: &HookResult) -> ChromaError {
    result.error.clone().unwrap_or_else(|| {
        ChromaError::hook(format!("Plugin '{name}' reported failure in {lifecycle}"))
    })
}
