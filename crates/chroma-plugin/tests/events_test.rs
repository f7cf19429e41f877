//! Integration tests for the lifecycle event channel as driven by the
//! manager.

use std::sync::{Arc, Mutex};

use chroma_core::config::plugin::PluginManagerConfig;
use chroma_core::error::ErrorKind;
use chroma_plugin::prelude::*;

type EventLog = Arc<Mutex<Vec<String>>>;
type Captured = Arc<Mutex<Vec<PluginEvent>>>;

#[tokio::test]
async fn test_registration_emits_initialized_then_registered() {
    let manager = PluginManager::new(PluginManagerConfig {
        auto_initialize: true,
        ..PluginManagerConfig::default()
    });
    let log = observe(&manager, &[EventKind::Initialized, EventKind::Registered]);

    assert!(manager.register(make_plugin("eager")).await);

    assert_eq!(
        entries(&log),
        vec!["plugin:initialized", "plugin:registered"]
    );
}

#[tokio::test]
async fn test_unregister_emits_destroyed_then_unregistered() {
    let manager = PluginManager::new(PluginManagerConfig {
        auto_initialize: true,
        ..PluginManagerConfig::default()
    });
    assert!(manager.register(make_plugin("doomed")).await);
    let log = observe(&manager, &[EventKind::Destroyed, EventKind::Unregistered]);

    assert!(manager.unregister("doomed").await);

    assert_eq!(
        entries(&log),
        vec!["plugin:destroyed", "plugin:unregistered"]
    );
}

#[tokio::test]
async fn test_duplicate_registration_emits_single_conflict_error() {
    let manager = PluginManager::with_defaults();
    let captured = capture(&manager, EventKind::Error);

    assert!(manager.register(make_plugin("alpha")).await);
    assert!(!manager.register(make_plugin("alpha")).await);

    let events = captured.lock().unwrap();
    assert_eq!(events.len(), 1);
    let PluginEvent::Error { plugin, error } = &events[0] else {
        panic!("expected an error event");
    };
    assert_eq!(plugin, "alpha");
    assert_eq!(error.kind, ErrorKind::Conflict);
    assert!(error.to_string().contains("already registered"));
}

#[tokio::test]
async fn test_unknown_name_operations_emit_not_found() {
    let manager = PluginManager::with_defaults();
    let captured = capture(&manager, EventKind::Error);

    assert!(!manager.enable("ghost").await);
    assert!(!manager.disable("ghost").await);
    assert!(!manager.unregister("ghost").await);
    assert!(!manager.update_config("ghost", ConfigMap::new()).await);

    let events = captured.lock().unwrap();
    assert_eq!(events.len(), 4);
    for event in events.iter() {
        let PluginEvent::Error { plugin, error } = event else {
            panic!("expected an error event");
        };
        assert_eq!(plugin, "ghost");
        assert_eq!(error.kind, ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_enable_disable_events_fire_once() {
    let manager = PluginManager::with_defaults();
    assert!(manager.register(make_plugin("toggle")).await);
    let log = observe(&manager, &[EventKind::Enabled, EventKind::Disabled]);

    assert!(manager.disable("toggle").await);
    assert!(!manager.disable("toggle").await);
    assert!(manager.enable("toggle").await);
    assert!(!manager.enable("toggle").await);

    assert_eq!(entries(&log), vec!["plugin:disabled", "plugin:enabled"]);
}

#[tokio::test]
async fn test_hook_before_and_after_payloads() {
    let manager = PluginManager::with_defaults();
    assert!(manager.register(make_plugin("a")).await);
    assert!(manager.register(make_plugin("b")).await);

    let before = capture(&manager, EventKind::HookBefore);
    let after = capture(&manager, EventKind::HookAfter);

    let results = manager
        .execute_hooks(
            Lifecycle::OnCssGenerate,
            &ExecutionContext::empty(),
            ExecuteOptions::default(),
        )
        .await
        .expect("execute");
    assert_eq!(results.len(), 2);

    let before = before.lock().unwrap();
    assert_eq!(before.len(), 1);
    let PluginEvent::HookBefore { lifecycle, plugins } = &before[0] else {
        panic!("expected hook:before");
    };
    assert_eq!(*lifecycle, Lifecycle::OnCssGenerate);
    assert_eq!(plugins, &vec!["a".to_string(), "b".to_string()]);

    let after = after.lock().unwrap();
    assert_eq!(after.len(), 1);
    let PluginEvent::HookAfter { lifecycle, results } = &after[0] else {
        panic!("expected hook:after");
    };
    assert_eq!(*lifecycle, Lifecycle::OnCssGenerate);
    assert_eq!(results.len(), 2);
    assert!(results.values().all(|result| result.success));
}

#[tokio::test]
async fn test_hook_failure_emits_plugin_error() {
    let manager = PluginManager::with_defaults();
    let descriptor = PluginDescriptor::builder("fragile", "1.0.0")
        .with_description("fails during css generation")
        .build();
    let plugin = FnPlugin::builder(descriptor)
        .on(Lifecycle::OnCssGenerate, |_context, _config| async {
            Err(ChromaError::hook("no stylesheet target"))
        })
        .build();
    assert!(manager.register(plugin).await);
    let captured = capture(&manager, EventKind::Error);

    let results = manager
        .execute_hooks(
            Lifecycle::OnCssGenerate,
            &ExecutionContext::empty(),
            ExecuteOptions::default(),
        )
        .await
        .expect("execute");
    assert!(!results["fragile"].success);

    let events = captured.lock().unwrap();
    assert_eq!(events.len(), 1);
    let PluginEvent::Error { plugin, error } = &events[0] else {
        panic!("expected an error event");
    };
    assert_eq!(plugin, "fragile");
    assert_eq!(error.kind, ErrorKind::Hook);
}

#[tokio::test]
async fn test_init_failure_emits_plugin_error() {
    let manager = PluginManager::new(PluginManagerConfig {
        auto_initialize: true,
        ..PluginManagerConfig::default()
    });
    let captured = capture(&manager, EventKind::Error);

    let descriptor = PluginDescriptor::builder("broken", "1.0.0")
        .with_description("fails its init hook")
        .build();
    let plugin = FnPlugin::builder(descriptor)
        .on(Lifecycle::Init, |_context, _config| async {
            Err(ChromaError::hook("missing palette"))
        })
        .build();
    assert!(manager.register(plugin).await);

    let events = captured.lock().unwrap();
    assert_eq!(events.len(), 1);
    let PluginEvent::Error { plugin, error } = &events[0] else {
        panic!("expected an error event");
    };
    assert_eq!(plugin, "broken");
    assert!(error.to_string().contains("missing palette"));
}

#[tokio::test]
async fn test_listener_removal_stops_delivery() {
    let manager = PluginManager::with_defaults();
    let log = new_log();

    let id = {
        let log = Arc::clone(&log);
        manager.events().on(EventKind::Registered, move |record| {
            log.lock().unwrap().push(record.event.kind().to_string());
        })
    };

    assert!(manager.register(make_plugin("first")).await);
    assert!(manager.events().off(EventKind::Registered, id));
    assert!(manager.register(make_plugin("second")).await);

    assert_eq!(entries(&log), vec!["plugin:registered"]);
    assert_eq!(manager.events().listener_count(EventKind::Registered), 0);
}

#[tokio::test]
async fn test_event_records_carry_unique_envelopes() {
    let manager = PluginManager::with_defaults();
    let ids = Arc::new(Mutex::new(Vec::new()));

    {
        let ids = Arc::clone(&ids);
        manager.events().on(EventKind::Registered, move |record| {
            ids.lock().unwrap().push(record.id);
        });
    }

    assert!(manager.register(make_plugin("first")).await);
    assert!(manager.register(make_plugin("second")).await);

    let ids = ids.lock().unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Subscribes a kind-name recorder to each of the given event kinds.
fn observe(manager: &PluginManager, kinds: &[EventKind]) -> EventLog {
    let log = new_log();
    for kind in kinds {
        let log = Arc::clone(&log);
        manager.events().on(*kind, move |record| {
            log.lock().unwrap().push(record.event.kind().to_string());
        });
    }
    log
}

/// Captures full event payloads for one kind.
fn capture(manager: &PluginManager, kind: EventKind) -> Captured {
    let captured = Arc::new(Mutex::new(Vec::new()));
    {
        let captured = Arc::clone(&captured);
        manager.events().on(kind, move |record| {
            captured.lock().unwrap().push(record.event.clone());
        });
    }
    captured
}

fn make_plugin(name: &str) -> FnPlugin {
    let descriptor = PluginDescriptor::builder(name, "1.0.0")
        .with_description("event probe")
        .build();
    FnPlugin::builder(descriptor).build()
}
