//! # chroma-plugin
//!
//! Plugin framework for theme pipelines. Provides:
//!
//! - Named, versioned, configurable plugins with lifecycle hooks
//! - Dependency-resolved, priority-aware execution ordering
//! - Hook execution with per-plugin timeouts, sequential or parallel
//! - Enable/disable, init/destroy state management per plugin
//! - Typed lifecycle event channel for observability

pub mod context;
pub mod descriptor;
pub mod events;
pub mod executor;
pub mod hooks;
pub mod manager;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod stats;
pub mod validation;

pub use context::{ExecutionContext, Viewport};
pub use descriptor::{DescriptorBuilder, PluginCategory, PluginDescriptor, PluginPriority};
pub use events::{EventChannel, EventKind, EventRecord, ListenerId, PluginEvent};
pub use executor::ExecuteOptions;
pub use hooks::{ConfigMap, HookResult, Lifecycle};
pub use manager::{PluginManager, RegisterOptions};
pub use plugin::{FnPlugin, FnPluginBuilder, ThemePlugin};
pub use registry::PluginStatus;
pub use resolver::CycleError;
pub use stats::PluginStats;
pub use validation::ValidationReport;
