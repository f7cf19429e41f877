//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use chroma_core::error::ChromaError;
pub use chroma_core::result::ChromaResult;

pub use crate::context::{ExecutionContext, Viewport};
pub use crate::descriptor::{PluginCategory, PluginDescriptor, PluginPriority};
pub use crate::events::{EventKind, PluginEvent};
pub use crate::executor::ExecuteOptions;
pub use crate::hooks::{ConfigMap, HookResult, Lifecycle};
pub use crate::manager::{PluginManager, RegisterOptions};
pub use crate::plugin::{FnPlugin, ThemePlugin};
