//! Queuer — periodic scan of the next-fire view.
//!
//! Every scan interval the queuer takes one registry pass (scan,
//! recompute, one-shot removal, view rebuild all under the registry
//! lock) and then, outside the lock, submits the emitted work items to
//! the dispatcher and deletes fired one-shots from the store. Store
//! deletion is best-effort; a failure is logged and the engine moves on.

use std::sync::Arc;
use std::time::Duration;

use sundial_domain::list::ListKind;
use tokio::sync::{mpsc, watch};

use crate::ports::DefinitionStore;
use crate::registry::Registry;
use crate::stats::EngineStats;

pub(crate) struct Queuer<S> {
    registry: Arc<Registry>,
    store: Arc<S>,
    work_tx: mpsc::Sender<sundial_domain::work_item::WorkItem>,
    stats: Arc<EngineStats>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S: DefinitionStore + Send + Sync> Queuer<S> {
    pub(crate) fn new(
        registry: Arc<Registry>,
        store: Arc<S>,
        work_tx: mpsc::Sender<sundial_domain::work_item::WorkItem>,
        stats: Arc<EngineStats>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            store,
            work_tx,
            stats,
            interval,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.pass().await,
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("queuer exited");
    }

    async fn pass(&mut self) {
        let pass = self.registry.scan_due(sundial_domain::time::now());
        for item in pass.items {
            self.stats.record_scheduled_fired();
            if self.work_tx.send(item).await.is_err() {
                tracing::warn!("dispatcher gone, discarding remaining scheduled items");
                return;
            }
        }
        for path in pass.removed {
            if let Err(error) = self.store.delete(ListKind::Scheduled, &path).await {
                tracing::warn!(%path, %error, "failed to delete fired one-shot from store");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use sundial_domain::error::SundialError;
    use sundial_domain::list::ListKind;
    use sundial_domain::location::GeoLocation;
    use sundial_domain::monitor::EventMonitor;
    use sundial_domain::path::EventPath;
    use sundial_domain::schedule::Schedule;
    use sundial_domain::scheduled::ScheduledEvent;
    use sundial_domain::triggered::TriggeredEvent;
    use tokio::sync::{mpsc, watch};
    use tokio::time::timeout;

    use crate::ports::DefinitionStore;
    use crate::registry::Registry;
    use crate::stats::EngineStats;

    use super::Queuer;

    #[derive(Default)]
    struct FakeStore {
        deleted: AtomicUsize,
    }

    impl DefinitionStore for FakeStore {
        async fn load_scheduled(&self) -> Result<Vec<ScheduledEvent>, SundialError> {
            Ok(Vec::new())
        }

        async fn load_triggered(&self) -> Result<Vec<TriggeredEvent>, SundialError> {
            Ok(Vec::new())
        }

        async fn load_monitors(&self) -> Result<Vec<EventMonitor>, SundialError> {
            Ok(Vec::new())
        }

        async fn save_scheduled(&self, _event: &ScheduledEvent) -> Result<(), SundialError> {
            Ok(())
        }

        async fn save_triggered(&self, _event: &TriggeredEvent) -> Result<(), SundialError> {
            Ok(())
        }

        async fn save_monitor(&self, _monitor: &EventMonitor) -> Result<(), SundialError> {
            Ok(())
        }

        async fn delete(&self, _kind: ListKind, _path: &EventPath) -> Result<(), SundialError> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        registry: Arc<Registry>,
        store: Arc<FakeStore>,
        stats: Arc<EngineStats>,
        work_rx: mpsc::Receiver<sundial_domain::work_item::WorkItem>,
        shutdown_tx: watch::Sender<bool>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_queuer(registry: Arc<Registry>) -> Harness {
        let store = Arc::new(FakeStore::default());
        let stats = Arc::new(EngineStats::default());
        let (work_tx, work_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queuer = Queuer::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            work_tx,
            Arc::clone(&stats),
            Duration::from_millis(100),
            shutdown_rx,
        );
        let task = tokio::spawn(queuer.run());
        Harness {
            registry,
            store,
            stats,
            work_rx,
            shutdown_tx,
            task,
        }
    }

    fn path(raw: &str) -> EventPath {
        EventPath::parse(raw).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_emit_exactly_one_item_when_period_elapses() {
        let registry = Arc::new(Registry::new(GeoLocation::default()));
        registry
            .add_scheduled(
                ScheduledEvent::builder()
                    .path(path("/tick"))
                    .schedule(Schedule::Periodic { period_secs: 1 })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mut harness = spawn_queuer(registry);

        let item = timeout(Duration::from_secs(3), harness.work_rx.recv())
            .await
            .expect("first window should fire")
            .unwrap();
        assert_eq!(item.path, path("/tick"));
        // the next window is a full period away
        assert!(
            timeout(Duration::from_millis(300), harness.work_rx.recv())
                .await
                .is_err()
        );
        assert_eq!(harness.stats.snapshot().scheduled_fired, 1);

        harness.shutdown_tx.send(true).unwrap();
        harness.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_delete_fired_one_shot_from_store() {
        let registry = Arc::new(Registry::new(GeoLocation::default()));
        registry
            .add_scheduled(
                ScheduledEvent::builder()
                    .path(path("/once"))
                    .schedule(Schedule::OneShot {
                        at: sundial_domain::time::now() + ChronoDuration::milliseconds(50),
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let mut harness = spawn_queuer(registry);

        let item = timeout(Duration::from_secs(2), harness.work_rx.recv())
            .await
            .expect("one-shot should fire")
            .unwrap();
        assert_eq!(item.path, path("/once"));

        timeout(Duration::from_secs(2), async {
            while harness.store.deleted.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("one-shot should be deleted from the store");
        assert!(harness.registry.get_scheduled(&path("/once")).is_none());

        harness.shutdown_tx.send(true).unwrap();
        harness.task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_exit_promptly_on_shutdown() {
        let registry = Arc::new(Registry::new(GeoLocation::default()));
        let harness = spawn_queuer(registry);
        harness.shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(1), harness.task)
            .await
            .expect("queuer should exit on shutdown")
            .unwrap();
    }
}
