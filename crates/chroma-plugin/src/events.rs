//! Typed event channel for plugin lifecycle announcements.
//!
//! The manager emits an [`EventRecord`] for every observable transition;
//! observers (logging, devtools) subscribe per [`EventKind`]. Listeners
//! run synchronously in subscription order, and each listener is isolated:
//! a panicking listener is logged and does not stop delivery to the rest.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use chroma_core::error::ChromaError;

use crate::hooks::{HookResult, Lifecycle};

/// The closed set of event names the manager can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A plugin entered the registry.
    Registered,
    /// A plugin left the registry.
    Unregistered,
    /// A plugin was enabled.
    Enabled,
    /// A plugin was disabled.
    Disabled,
    /// A plugin's init hook completed.
    Initialized,
    /// A plugin's destroy hook ran.
    Destroyed,
    /// A plugin operation or hook failed.
    Error,
    /// A lifecycle run is about to start.
    HookBefore,
    /// A lifecycle run finished.
    HookAfter,
}

impl EventKind {
    /// Returns the wire name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "plugin:registered",
            Self::Unregistered => "plugin:unregistered",
            Self::Enabled => "plugin:enabled",
            Self::Disabled => "plugin:disabled",
            Self::Initialized => "plugin:initialized",
            Self::Destroyed => "plugin:destroyed",
            Self::Error => "plugin:error",
            Self::HookBefore => "hook:before",
            Self::HookAfter => "hook:after",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of one lifecycle event.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    /// A plugin entered the registry.
    Registered {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin left the registry.
    Unregistered {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin was enabled.
    Enabled {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin was disabled.
    Disabled {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin's init hook completed.
    Initialized {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin's destroy hook ran.
    Destroyed {
        /// Plugin name.
        plugin: String,
    },
    /// A plugin operation or hook failed.
    Error {
        /// Plugin name.
        plugin: String,
        /// What went wrong.
        error: ChromaError,
    },
    /// A lifecycle run is about to start.
    HookBefore {
        /// The lifecycle being run.
        lifecycle: Lifecycle,
        /// Names of the plugins about to run, in execution order.
        plugins: Vec<String>,
    },
    /// A lifecycle run finished.
    HookAfter {
        /// The lifecycle that ran.
        lifecycle: Lifecycle,
        /// Per-plugin results for every attempted plugin.
        results: HashMap<String, HookResult>,
    },
}

impl PluginEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Registered { .. } => EventKind::Registered,
            Self::Unregistered { .. } => EventKind::Unregistered,
            Self::Enabled { .. } => EventKind::Enabled,
            Self::Disabled { .. } => EventKind::Disabled,
            Self::Initialized { .. } => EventKind::Initialized,
            Self::Destroyed { .. } => EventKind::Destroyed,
            Self::Error { .. } => EventKind::Error,
            Self::HookBefore { .. } => EventKind::HookBefore,
            Self::HookAfter { .. } => EventKind::HookAfter,
        }
    }
}

/// Envelope for an emitted event.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub event: PluginEvent,
}

impl EventRecord {
    /// Wraps an event in a new envelope.
    pub fn new(event: PluginEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Handle returned by [`EventChannel::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = std::sync::Arc<dyn Fn(&EventRecord) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    listener: Listener,
}

/// Synchronous publish/subscribe channel for plugin events.
pub struct EventChannel {
    /// Event kind to listeners, in subscription order.
    listeners: RwLock<HashMap<EventKind, Vec<ListenerEntry>>>,
    /// Next listener ID.
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total: usize = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(Vec::len)
            .sum();
        f.debug_struct("EventChannel")
            .field("listeners", &total)
            .finish()
    }
}

impl EventChannel {
    /// Creates a new channel with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes a listener to an event kind.
    ///
    /// Listeners for one kind are invoked in subscription order.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.entry(kind).or_default().push(ListenerEntry {
            id,
            listener: std::sync::Arc::new(listener),
        });
        id
    }

    /// Removes a listener. Returns whether anything was removed.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }

    /// Returns the number of listeners for an event kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Removes all listeners.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Emits an event to every listener subscribed to its kind.
    ///
    /// Listener invocation happens outside the listener lock, so listeners
    /// may subscribe or unsubscribe from within a callback. A panicking
    /// listener is caught and logged; delivery continues with the next.
    pub fn emit(&self, event: PluginEvent) {
        let record = EventRecord::new(event);
        let kind = record.event.kind();

        let snapshot: Vec<Listener> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match listeners.get(&kind) {
                Some(entries) => entries.iter().map(|e| e.listener.clone()).collect(),
                None => return,
            }
        };

        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(&record))) {
                let message = panic_message(&panic);
                error!(
                    event = %kind,
                    panic = %message,
                    "Event listener panicked; continuing with remaining listeners"
                );
            }
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
