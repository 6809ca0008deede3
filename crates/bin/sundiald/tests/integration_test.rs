//! End-to-end smoke tests for the full sundiald stack.
//!
//! Each test spins up the complete application (file-backed `SQLite`,
//! real definition store, real engine) with small in-test fakes standing
//! in for the external action engine and monitor runtime, then drives it
//! through the admin API and the event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sundial_adapter_storage_sqlite_sqlx::{Config, SqliteDefinitionStore};
use sundial_domain::error::SundialError;
use sundial_domain::filter::Filter;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::payload::{EventPayload, Notification};
use sundial_domain::privilege::Privilege;
use sundial_domain::schedule::Schedule;
use sundial_domain::scheduled::ScheduledEvent;
use sundial_domain::triggered::TriggeredEvent;
use sundial_engine::event_bus::EventBus;
use sundial_engine::ports::{
    ActionEngine, Invocation, MonitorHandle, MonitorRuntime, NotificationPublisher,
};
use sundial_engine::runtime::{Engine, EngineConfig};
use tokio::time::timeout;

/// A fresh throwaway database file; `sqlite::memory:` would hand each
/// pooled connection its own empty database.
fn database_url(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("sundial-it-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    format!("sqlite:{}?mode=rwc", path.display())
}

async fn store(url: &str) -> SqliteDefinitionStore {
    let db = Config {
        database_url: url.to_string(),
    }
    .build()
    .await
    .expect("database should initialise");
    SqliteDefinitionStore::new(db.pool().clone())
}

fn config() -> EngineConfig {
    EngineConfig {
        workers: 2,
        scan_interval: Duration::from_millis(100),
        shutdown_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    }
}

fn path(raw: &str) -> EventPath {
    EventPath::parse(raw).unwrap()
}

#[derive(Default)]
struct CountingEngine {
    invoked: AtomicUsize,
}

impl ActionEngine for CountingEngine {
    async fn invoke(
        &self,
        _path: &EventPath,
        _invocation: Invocation,
        _payload: Option<&EventPayload>,
    ) -> Result<(), SundialError> {
        self.invoked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct IdleRuntime;

impl MonitorRuntime for IdleRuntime {
    async fn start(&self, _monitor: &EventMonitor) -> Result<MonitorHandle, SundialError> {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(async move {
            let _ = shutdown_rx.changed().await;
        });
        Ok(MonitorHandle::new(shutdown_tx, task))
    }
}

async fn wait_for_invocations(action_engine: &CountingEngine, at_least: usize) {
    timeout(Duration::from_secs(5), async {
        while action_engine.invoked.load(Ordering::SeqCst) < at_least {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("action engine should have been invoked in time");
}

// ---------------------------------------------------------------------------
// Scheduled path: admin add, fire through the real store
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn should_fire_periodic_event_added_through_admin() {
    let url = database_url("periodic");
    let action_engine = Arc::new(CountingEngine::default());
    let bus = EventBus::new(16);
    let engine = Engine::open(
        config(),
        store(&url).await,
        Arc::clone(&action_engine),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();

    let event = ScheduledEvent::builder()
        .path(path("/lights/porch"))
        .schedule(Schedule::Periodic { period_secs: 1 })
        .build()
        .unwrap();
    engine
        .admin()
        .add_scheduled(Privilege::Operator, event)
        .await
        .unwrap();

    wait_for_invocations(&action_engine, 1).await;
    assert!(engine.stats().executed >= 1);

    engine.close().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn should_fire_one_shot_once_and_forget_it() {
    let url = database_url("one-shot");
    let action_engine = Arc::new(CountingEngine::default());
    let bus = EventBus::new(16);
    let engine = Engine::open(
        config(),
        store(&url).await,
        Arc::clone(&action_engine),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();

    let event = ScheduledEvent::builder()
        .path(path("/alarm/wake-up"))
        .schedule(Schedule::OneShot {
            at: sundial_domain::time::now() + chrono::Duration::milliseconds(300),
        })
        .build()
        .unwrap();
    engine
        .admin()
        .add_scheduled(Privilege::Operator, event)
        .await
        .unwrap();

    wait_for_invocations(&action_engine, 1).await;

    // gone from the registry once fired
    timeout(Duration::from_secs(2), async {
        while engine.registry().get_scheduled(&path("/alarm/wake-up")).is_some() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("fired one-shot should be removed");
    engine.close().await;

    // and gone from the store, so a restart does not resurrect it
    let reopened = Engine::open(
        config(),
        store(&url).await,
        CountingEngine::default(),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();
    assert!(reopened.registry().scheduled_events().is_empty());
    reopened.close().await;
}

// ---------------------------------------------------------------------------
// Triggered path: bus notification through the filter
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn should_fire_triggered_event_from_bus_notification() {
    let url = database_url("triggered");
    let action_engine = Arc::new(CountingEngine::default());
    let bus = EventBus::new(16);
    let engine = Engine::open(
        config(),
        store(&url).await,
        Arc::clone(&action_engine),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();

    let event = TriggeredEvent::builder()
        .path(path("/siren/main"))
        .filter(Filter::FieldEquals {
            field: "state".to_string(),
            value: serde_json::json!("open"),
        })
        .build()
        .unwrap();
    engine
        .admin()
        .add_triggered(Privilege::Operator, event)
        .await
        .unwrap();

    bus.publish(Notification::new(
        None,
        EventPayload::new().with("state", "open"),
    ));

    wait_for_invocations(&action_engine, 1).await;
    assert!(engine.stats().matched >= 1);

    engine.close().await;
}

// ---------------------------------------------------------------------------
// Persistence: definitions survive an engine restart
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn should_reload_definitions_after_restart() {
    let url = database_url("restart");
    let bus = EventBus::new(16);
    let engine = Engine::open(
        config(),
        store(&url).await,
        CountingEngine::default(),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();

    let admin = engine.admin();
    admin
        .add_scheduled(
            Privilege::Operator,
            ScheduledEvent::builder()
                .path(path("/lights/porch"))
                .schedule(Schedule::TimeOfDay {
                    hour: 7,
                    minute: 30,
                    days: sundial_domain::schedule::DayMask::all(),
                })
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    admin
        .add_triggered(
            Privilege::Operator,
            TriggeredEvent::builder()
                .path(path("/siren/main"))
                .filter(Filter::FieldExists {
                    field: "motion".to_string(),
                })
                .serialized(true)
                .build()
                .unwrap(),
        )
        .await
        .unwrap();
    admin
        .add_monitor(
            Privilege::Operator,
            EventMonitor::new(
                path("/monitors/water-leak"),
                serde_json::json!({"poll_secs": 5}),
            ),
        )
        .await
        .unwrap();
    engine.close().await;

    let reopened = Engine::open(
        config(),
        store(&url).await,
        CountingEngine::default(),
        IdleRuntime,
        &bus,
    )
    .await
    .unwrap();

    assert!(reopened.registry().get_scheduled(&path("/lights/porch")).is_some());
    let triggered = reopened
        .registry()
        .get_triggered(&path("/siren/main"))
        .expect("triggered event should survive the restart");
    assert!(triggered.serialized);
    assert!(reopened.registry().get_monitor(&path("/monitors/water-leak")).is_some());

    reopened.close().await;
}
