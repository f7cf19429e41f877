//! Execution context passed to every hook invocation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Viewport dimensions hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
}

/// Read-mostly bundle of theme and environment data for one lifecycle run.
///
/// Built once per `execute_hooks` call and shared by reference across all
/// plugins invoked in that call. Hooks receive `&ExecutionContext` and must
/// not mutate it; desired effects travel back through
/// [`HookResult::modifications`](crate::hooks::HookResult).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Current theme snapshot (opaque to the core).
    pub theme: serde_json::Value,
    /// Previous theme snapshot, for change-detection hooks.
    pub previous_theme: Option<serde_json::Value>,
    /// Viewport dimensions, when known.
    pub viewport: Option<Viewport>,
    /// Whether the user prefers reduced motion.
    pub reduced_motion: bool,
    /// Whether dark mode is active.
    pub dark_mode: bool,
    /// Arbitrary environment data keyed by string.
    pub data: HashMap<String, serde_json::Value>,
    /// When this context was built.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    /// Creates a context around a theme snapshot.
    pub fn new(theme: serde_json::Value) -> Self {
        Self {
            theme,
            previous_theme: None,
            viewport: None,
            reduced_motion: false,
            dark_mode: false,
            data: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a context with no theme, used for plugin transition hooks.
    pub fn empty() -> Self {
        Self::new(serde_json::Value::Null)
    }

    /// Sets the previous theme snapshot.
    pub fn with_previous_theme(mut self, theme: serde_json::Value) -> Self {
        self.previous_theme = Some(theme);
        self
    }

    /// Sets the viewport hint.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Some(Viewport { width, height });
        self
    }

    /// Sets the reduced-motion flag.
    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    /// Sets the dark-mode flag.
    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    /// Inserts an environment data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Gets an environment data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string environment value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets a boolean environment value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }
}
