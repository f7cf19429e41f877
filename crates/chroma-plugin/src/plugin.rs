//! The plugin trait and a closure-backed implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use chroma_core::result::ChromaResult;

use crate::context::ExecutionContext;
use crate::descriptor::PluginDescriptor;
use crate::hooks::{BoxHookFuture, ConfigMap, HookResult, Lifecycle};

/// Trait that all theme plugins implement.
///
/// `handle` is called once per lifecycle invocation with the shared run
/// context and this plugin's merged configuration. The default body is a
/// no-op success, so implementations only match the lifecycles they
/// declared in their descriptor. Returning `Err` marks the invocation as
/// failed; the hook runner converts it into a failure result.
#[async_trait]
pub trait ThemePlugin: Send + Sync + std::fmt::Debug {
    /// Returns this plugin's descriptor.
    fn descriptor(&self) -> PluginDescriptor;

    /// Handles one lifecycle invocation.
    async fn handle(
        &self,
        lifecycle: Lifecycle,
        context: &ExecutionContext,
        config: &ConfigMap,
    ) -> ChromaResult<HookResult> {
        let _ = (lifecycle, context, config);
        Ok(HookResult::ok())
    }
}

/// Stored hook closure: borrows the context and config for the duration of
/// the returned future.
type HookFn = Arc<
    dyn for<'a> Fn(&'a ExecutionContext, &'a ConfigMap) -> BoxHookFuture<'a> + Send + Sync,
>;

/// A plugin assembled from closures, one per declared lifecycle.
///
/// Convenient for plugins that do not warrant a dedicated type, and for
/// tests. Built via [`FnPlugin::builder`].
pub struct FnPlugin {
    /// Static descriptor.
    descriptor: PluginDescriptor,
    /// Lifecycle to handler closure.
    handlers: HashMap<Lifecycle, HookFn>,
}

impl std::fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPlugin")
            .field("name", &self.descriptor.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl FnPlugin {
    /// Starts building a closure plugin around a descriptor.
    pub fn builder(descriptor: PluginDescriptor) -> FnPluginBuilder {
        FnPluginBuilder {
            descriptor,
            handlers: HashMap::new(),
        }
    }
}

#[async_trait]
impl ThemePlugin for FnPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        self.descriptor.clone()
    }

    async fn handle(
        &self,
        lifecycle: Lifecycle,
        context: &ExecutionContext,
        config: &ConfigMap,
    ) -> ChromaResult<HookResult> {
        match self.handlers.get(&lifecycle) {
            Some(handler) => handler(context, config).await,
            None => Ok(HookResult::ok()),
        }
    }
}

/// Builder for [`FnPlugin`].
pub struct FnPluginBuilder {
    /// Descriptor under construction.
    descriptor: PluginDescriptor,
    /// Accumulated handlers.
    handlers: HashMap<Lifecycle, HookFn>,
}

impl std::fmt::Debug for FnPluginBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPluginBuilder")
            .field("name", &self.descriptor.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl FnPluginBuilder {
    /// Registers a handler closure for a lifecycle.
    ///
    /// The closure receives the shared run context and the plugin's merged
    /// configuration; the future it returns must own whatever it needs
    /// beyond that call (clone values out of the borrowed arguments).
    pub fn on<F, Fut>(mut self, lifecycle: Lifecycle, handler: F) -> Self
    where
        F: Fn(&ExecutionContext, &ConfigMap) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ChromaResult<HookResult>> + Send + 'static,
    {
        let hook: HookFn = Arc::new(move |context, config| {
            let fut = handler(context, config);
            Box::pin(fut)
        });
        self.handlers.insert(lifecycle, hook);
        self
    }

    /// Builds the final plugin.
    ///
    /// Lifecycles with a registered closure are added to the descriptor's
    /// declared hooks so the executor dispatches to them.
    pub fn build(mut self) -> FnPlugin {
        for lifecycle in Lifecycle::ALL {
            if self.handlers.contains_key(&lifecycle)
                && !self.descriptor.hooks.contains(&lifecycle)
            {
                self.descriptor.hooks.push(lifecycle);
            }
        }
        FnPlugin {
            descriptor: self.descriptor,
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginCategory;
    use serde_json::json;

    fn make_descriptor(name: &str) -> PluginDescriptor {
        PluginDescriptor::builder(name, "1.0.0")
            .with_description("test plugin")
            .with_category(PluginCategory::Utility)
            .build()
    }

    #[tokio::test]
    async fn test_fn_plugin_dispatches_to_closure() {
        let plugin = FnPlugin::builder(make_descriptor("echo"))
            .on(Lifecycle::AfterThemeBuild, |context, _config| {
                let theme = context.theme.clone();
                async move { Ok(HookResult::ok_with_modifications(theme)) }
            })
            .build();

        let context = ExecutionContext::new(json!({"accent": "#10b981"}));
        let result = plugin
            .handle(Lifecycle::AfterThemeBuild, &context, &ConfigMap::new())
            .await
            .expect("hook runs");
        assert!(result.success);
        assert_eq!(result.modifications, Some(json!({"accent": "#10b981"})));
    }

    #[tokio::test]
    async fn test_missing_lifecycle_is_noop_success() {
        let plugin = FnPlugin::builder(make_descriptor("quiet"))
            .on(Lifecycle::OnThemeChange, |_context, _config| async {
                Ok(HookResult::ok())
            })
            .build();

        let context = ExecutionContext::empty();
        let result = plugin
            .handle(Lifecycle::AfterThemeBuild, &context, &ConfigMap::new())
            .await
            .expect("no-op");
        assert!(result.success);
        assert!(result.modifications.is_none());
    }

    #[test]
    fn test_build_declares_registered_lifecycles() {
        let plugin = FnPlugin::builder(make_descriptor("declared"))
            .on(Lifecycle::Init, |_context, _config| async {
                Ok(HookResult::ok())
            })
            .on(Lifecycle::OnCssGenerate, |_context, _config| async {
                Ok(HookResult::ok())
            })
            .build();

        let descriptor = plugin.descriptor();
        assert!(descriptor.declares(Lifecycle::Init));
        assert!(descriptor.declares(Lifecycle::OnCssGenerate));
        assert!(!descriptor.declares(Lifecycle::Destroy));
    }

    #[tokio::test]
    async fn test_closure_reads_config() {
        let descriptor = PluginDescriptor::builder("configured", "1.0.0")
            .with_description("reads its configuration")
            .with_default_option("scale", json!(2))
            .build();
        let plugin = FnPlugin::builder(descriptor)
            .on(Lifecycle::AfterThemeBuild, |_context, config| {
                let scale = config.get("scale").cloned();
                async move {
                    Ok(HookResult::ok().with_data(json!({"scale": scale})))
                }
            })
            .build();

        let mut config = ConfigMap::new();
        config.insert("scale".to_string(), json!(3));
        let context = ExecutionContext::empty();
        let result = plugin
            .handle(Lifecycle::AfterThemeBuild, &context, &config)
            .await
            .expect("hook runs");
        assert_eq!(result.data, Some(json!({"scale": 3})));
    }
}
