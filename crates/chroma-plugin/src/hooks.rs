//! Lifecycle definitions and hook results.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use chroma_core::error::ChromaError;
use chroma_core::result::ChromaResult;

/// Per-plugin configuration: option name to value.
pub type ConfigMap = HashMap<String, serde_json::Value>;

/// Boxed future returned by a hook invocation.
pub type BoxHookFuture<'a> = Pin<Box<dyn Future<Output = ChromaResult<HookResult>> + Send + 'a>>;

/// Enumeration of all lifecycles a plugin may hook into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    // ── Plugin transitions (manager driven) ──
    /// Fired once when a plugin is initialized.
    Init,
    /// Fired when a plugin is destroyed, before unregistration.
    Destroy,
    /// Fired when a plugin is enabled.
    Enable,
    /// Fired when a plugin is disabled.
    Disable,

    // ── Theme pipeline ──
    /// Fired before a theme build starts.
    BeforeThemeBuild,
    /// Fired after a theme build completes.
    AfterThemeBuild,
    /// Fired when the active theme changes.
    OnThemeChange,
    /// Fired when CSS variables are generated from the theme.
    OnCssGenerate,
    /// Fired when an animation is created from theme tokens.
    OnAnimationCreate,
}

impl Lifecycle {
    /// All lifecycles, transitions first, in pipeline order.
    pub const ALL: [Lifecycle; 9] = [
        Self::Init,
        Self::Destroy,
        Self::Enable,
        Self::Disable,
        Self::BeforeThemeBuild,
        Self::AfterThemeBuild,
        Self::OnThemeChange,
        Self::OnCssGenerate,
        Self::OnAnimationCreate,
    ];

    /// Returns the string name of this lifecycle.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Destroy => "destroy",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::BeforeThemeBuild => "before_theme_build",
            Self::AfterThemeBuild => "after_theme_build",
            Self::OnThemeChange => "on_theme_change",
            Self::OnCssGenerate => "on_css_generate",
            Self::OnAnimationCreate => "on_animation_create",
        }
    }

    /// Returns whether this is a plugin-transition lifecycle that the
    /// manager drives itself (init/destroy/enable/disable), as opposed to
    /// a theme-pipeline lifecycle run through `execute_hooks`.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Self::Init | Self::Destroy | Self::Enable | Self::Disable
        )
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result returned from one hook invocation.
///
/// Produced fresh per invocation; never persisted beyond the caller's
/// aggregate result map for that call.
#[derive(Debug, Clone)]
pub struct HookResult {
    /// Whether the hook completed successfully.
    pub success: bool,
    /// Non-fatal notes the hook wants surfaced.
    pub warnings: Vec<String>,
    /// Theme modifications the hook requests (opaque to the core).
    pub modifications: Option<serde_json::Value>,
    /// Arbitrary output data from the hook.
    pub data: Option<serde_json::Value>,
    /// The failure, when `success` is false.
    pub error: Option<ChromaError>,
}

impl HookResult {
    /// Creates a success result with no modifications.
    pub fn ok() -> Self {
        Self {
            success: true,
            warnings: Vec::new(),
            modifications: None,
            data: None,
            error: None,
        }
    }

    /// Creates a success result carrying theme modifications.
    pub fn ok_with_modifications(modifications: serde_json::Value) -> Self {
        Self {
            modifications: Some(modifications),
            ..Self::ok()
        }
    }

    /// Creates a failure result from an error.
    pub fn failure(error: ChromaError) -> Self {
        Self {
            success: false,
            warnings: Vec::new(),
            modifications: None,
            data: None,
            error: Some(error),
        }
    }

    /// Attaches output data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Appends a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_as_str() {
        assert_eq!(Lifecycle::AfterThemeBuild.as_str(), "after_theme_build");
        assert_eq!(Lifecycle::Init.as_str(), "init");
        assert_eq!(Lifecycle::OnCssGenerate.to_string(), "on_css_generate");
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(Lifecycle::Init.is_transition());
        assert!(Lifecycle::Disable.is_transition());
        assert!(!Lifecycle::AfterThemeBuild.is_transition());
        assert!(!Lifecycle::OnAnimationCreate.is_transition());
    }

    #[test]
    fn test_lifecycle_serde_names() {
        let json = serde_json::to_string(&Lifecycle::OnThemeChange).expect("serialize");
        assert_eq!(json, "\"on_theme_change\"");
        let parsed: Lifecycle = serde_json::from_str("\"before_theme_build\"").expect("deserialize");
        assert_eq!(parsed, Lifecycle::BeforeThemeBuild);
    }

    #[test]
    fn test_result_constructors() {
        let ok = HookResult::ok();
        assert!(ok.success);
        assert!(ok.error.is_none());

        let modified = HookResult::ok_with_modifications(serde_json::json!({"spacing": 8}));
        assert!(modified.success);
        assert!(modified.modifications.is_some());

        let failed = HookResult::failure(ChromaError::hook("boom"));
        assert!(!failed.success);
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_result_chaining() {
        let result = HookResult::ok()
            .with_data(serde_json::json!({"frames": 12}))
            .with_warning("contrast ratio is low");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.data.is_some());
    }
}
