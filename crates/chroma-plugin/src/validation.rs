//! Descriptor validation, run at registration time.

use std::collections::HashSet;

use crate::descriptor::PluginDescriptor;

/// Outcome of validating a descriptor.
///
/// Errors reject registration; warnings are logged and registration
/// proceeds (unless the manager runs in strict mode, which promotes
/// warnings to rejection).
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Problems that reject registration.
    pub errors: Vec<String>,
    /// Suspicious but legal conditions.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Returns whether the descriptor passed validation.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a plugin descriptor.
///
/// Side-effect-free. `known_names` is the set of currently registered
/// plugin names, needed only for the unknown-dependency warning; category
/// and priority membership is enforced by their enum types and needs no
/// runtime check.
pub fn validate(descriptor: &PluginDescriptor, known_names: &HashSet<&str>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if descriptor.name.trim().is_empty() {
        report.errors.push("plugin name is required".to_string());
    }
    if descriptor.version.trim().is_empty() {
        report.errors.push("plugin version is required".to_string());
    }
    if descriptor.description.trim().is_empty() {
        report
            .errors
            .push("plugin description is required".to_string());
    }

    if descriptor.hooks.is_empty() {
        report
            .warnings
            .push("plugin declares no hooks and will never run".to_string());
    }

    let mut seen = HashSet::new();
    for dependency in &descriptor.dependencies {
        if !seen.insert(dependency.as_str()) {
            report
                .warnings
                .push(format!("dependency '{dependency}' is declared more than once"));
            continue;
        }
        if !known_names.contains(dependency.as_str()) {
            report
                .warnings
                .push(format!("dependency '{dependency}' is not registered"));
        }
    }

    report
}
