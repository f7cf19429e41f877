//! Plugin descriptors: static, declarative metadata about one plugin.

use serde::{Deserialize, Serialize};

use crate::hooks::{ConfigMap, Lifecycle};

/// Functional category a plugin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    /// Accessibility adjustments (contrast, reduced motion, focus rings).
    Accessibility,
    /// Performance tuning (token pruning, payload trimming).
    Performance,
    /// Animation and motion behavior.
    Animation,
    /// General-purpose helpers.
    Utility,
    /// Bridges to external systems.
    Integration,
    /// Visual enhancements layered onto a base theme.
    Enhancement,
}

impl PluginCategory {
    /// Returns the string name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Performance => "performance",
            Self::Animation => "animation",
            Self::Utility => "utility",
            Self::Integration => "integration",
            Self::Enhancement => "enhancement",
        }
    }
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution priority, used as the tie-break and fallback ordering when
/// dependency resolution is not decisive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginPriority {
    /// Runs last among fallback-ordered plugins.
    Low,
    /// The default priority.
    #[default]
    Normal,
    /// Runs before normal-priority plugins.
    High,
    /// Runs first.
    Critical,
}

impl PluginPriority {
    /// Returns the sort rank for this priority (lower runs first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
        }
    }

    /// Returns the string name of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for PluginPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one plugin.
///
/// Pure data. The registry references descriptors but never mutates them
/// structurally; runtime state (enabled, initialized) lives in the registry
/// record, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin name. Registering the same name twice is rejected.
    pub name: String,
    /// Plugin version string (informational, no semver enforcement).
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Author or maintainer.
    #[serde(default)]
    pub author: String,
    /// Functional category.
    pub category: PluginCategory,
    /// Execution priority for fallback ordering.
    #[serde(default)]
    pub priority: PluginPriority,
    /// Names of plugins that must run before this one. May reference names
    /// that are not (yet) registered; that is a warning, not an error.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Free-form labels used by tag-based execution filters.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Default configuration, merged with registration-time overrides.
    #[serde(default)]
    pub default_config: ConfigMap,
    /// Lifecycles this plugin declares a hook for.
    #[serde(default)]
    pub hooks: Vec<Lifecycle>,
}

impl PluginDescriptor {
    /// Starts building a descriptor with the given name and version.
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(name, version)
    }

    /// Returns whether this plugin declares a hook for the given lifecycle.
    pub fn declares(&self, lifecycle: Lifecycle) -> bool {
        self.hooks.contains(&lifecycle)
    }
}

/// Builder for constructing plugin descriptors incrementally.
///
/// Category defaults to [`PluginCategory::Utility`] and priority to
/// [`PluginPriority::Normal`] unless overridden.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: PluginDescriptor,
}

impl DescriptorBuilder {
    /// Creates a new builder with the given name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            descriptor: PluginDescriptor {
                name: name.into(),
                version: version.into(),
                description: String::new(),
                author: String::new(),
                category: PluginCategory::Utility,
                priority: PluginPriority::Normal,
                dependencies: Vec::new(),
                tags: Vec::new(),
                default_config: ConfigMap::new(),
                hooks: Vec::new(),
            },
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.descriptor.author = author.into();
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: PluginCategory) -> Self {
        self.descriptor.category = category;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: PluginPriority) -> Self {
        self.descriptor.priority = priority;
        self
    }

    /// Adds a dependency on another plugin by name.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.descriptor.dependencies.push(name.into());
        self
    }

    /// Adds multiple dependencies.
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .dependencies
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.descriptor.tags.push(tag.into());
        self
    }

    /// Sets a default configuration option.
    pub fn with_default_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.descriptor.default_config.insert(key.into(), value);
        self
    }

    /// Declares a hook for a lifecycle.
    pub fn with_hook(mut self, lifecycle: Lifecycle) -> Self {
        if !self.descriptor.hooks.contains(&lifecycle) {
            self.descriptor.hooks.push(lifecycle);
        }
        self
    }

    /// Builds the final descriptor.
    pub fn build(self) -> PluginDescriptor {
        self.descriptor
    }
}
