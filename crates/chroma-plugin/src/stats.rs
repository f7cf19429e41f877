//! Registry statistics snapshot.

use std::collections::HashMap;

use serde::Serialize;

use crate::registry::PluginRecord;

/// Counts over the registered plugin set at one point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginStats {
    /// Total registered plugins.
    pub total: usize,
    /// Plugins currently enabled.
    pub enabled: usize,
    /// Plugins whose init hook has completed.
    pub initialized: usize,
    /// Plugin counts per category name.
    pub by_category: HashMap<String, usize>,
    /// Plugin counts per priority name.
    pub by_priority: HashMap<String, usize>,
}

impl PluginStats {
    /// Aggregates a snapshot over registry records.
    pub(crate) fn collect<'a>(records: impl Iterator<Item = &'a PluginRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            if record.enabled {
                stats.enabled += 1;
            }
            if record.initialized {
                stats.initialized += 1;
            }
            *stats
                .by_category
                .entry(record.descriptor.category.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_priority
                .entry(record.descriptor.priority.as_str().to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}
