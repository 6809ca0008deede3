//! Engine lifecycle — construction, background tasks, shutdown.
//!
//! `Engine::open` loads the definitions, populates the registry, and
//! spawns the background tasks: N workers, the dispatcher, the queuer,
//! the trigger listener, and one supervised task per active monitor.
//! `Engine::close` stops producers first, then the dispatcher, then the
//! workers, then the monitor tasks, each join bounded by a timeout; a
//! task that misses its timeout is logged, never escalated into a crash.

use std::sync::Arc;
use std::time::Duration;

use sundial_domain::error::SundialError;
use sundial_domain::location::GeoLocation;
use tokio::sync::{mpsc, watch};

use crate::admin::Admin;
use crate::dispatcher::Dispatcher;
use crate::event_bus::EventBus;
use crate::listener::Listener;
use crate::ports::{ActionEngine, DefinitionStore, MonitorRuntime};
use crate::queuer::Queuer;
use crate::registry::Registry;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::supervisor::MonitorSupervisor;
use crate::worker::Worker;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed worker pool size.
    pub workers: usize,
    /// Delay between queuer scan passes.
    pub scan_interval: Duration,
    /// Capacity of the producers-to-dispatcher channel.
    pub dispatch_queue: usize,
    /// Capacity of each worker's private queue.
    pub worker_queue: usize,
    /// Solar coordinates used for sunrise/sunset schedules.
    pub location: GeoLocation,
    /// Bound on each task join during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            scan_interval: Duration::from_secs(2),
            dispatch_queue: 64,
            worker_queue: 16,
            location: GeoLocation::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns [`SundialError::Engine`] when a pool or queue size is
    /// zero or the scan interval is zero.
    pub fn validate(&self) -> Result<(), SundialError> {
        if self.workers == 0 {
            return Err(SundialError::Engine("worker pool size must be at least 1".to_string()));
        }
        if self.dispatch_queue == 0 || self.worker_queue == 0 {
            return Err(SundialError::Engine("queue capacities must be at least 1".to_string()));
        }
        if self.scan_interval.is_zero() {
            return Err(SundialError::Engine("scan interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// A running automation-event engine.
pub struct Engine<S, M> {
    registry: Arc<Registry>,
    store: Arc<S>,
    supervisor: Arc<MonitorSupervisor<M>>,
    stats: Arc<EngineStats>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_timeout: Duration,
    listener: tokio::task::JoinHandle<()>,
    queuer: tokio::task::JoinHandle<()>,
    dispatcher: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl<S, M> Engine<S, M>
where
    S: DefinitionStore + Send + Sync + 'static,
    M: MonitorRuntime + Send + Sync + 'static,
{
    /// Load definitions, spawn the background tasks, and start every
    /// active monitor. A monitor that fails during startup is marked
    /// failed and left paused; the engine still opens.
    ///
    /// # Errors
    ///
    /// Returns configuration validation failures and store load errors.
    pub async fn open<A>(
        config: EngineConfig,
        store: S,
        action_engine: A,
        monitor_runtime: M,
        bus: &EventBus,
    ) -> Result<Self, SundialError>
    where
        A: ActionEngine + Send + Sync + 'static,
    {
        config.validate()?;
        let store = Arc::new(store);
        let registry = Arc::new(Registry::new(config.location));
        let scheduled = store.load_scheduled().await?;
        let triggered = store.load_triggered().await?;
        let monitors = store.load_monitors().await?;
        tracing::info!(
            scheduled = scheduled.len(),
            triggered = triggered.len(),
            monitors = monitors.len(),
            "definitions loaded",
        );
        registry.load(scheduled, triggered, monitors);

        let stats = Arc::new(EngineStats::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (work_tx, work_rx) = mpsc::channel(config.dispatch_queue);
        let (completion_tx, completion_rx) = mpsc::channel(config.workers * config.worker_queue);

        let action_engine = Arc::new(action_engine);
        let mut queues = Vec::with_capacity(config.workers);
        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let (queue_tx, queue_rx) = mpsc::channel(config.worker_queue);
            let worker = Worker::new(index, Arc::clone(&action_engine), Arc::clone(&stats));
            workers.push(tokio::spawn(worker.run(queue_rx, completion_tx.clone())));
            queues.push(queue_tx);
        }
        drop(completion_tx);

        let dispatcher = Dispatcher::new(work_rx, completion_rx, queues, Arc::clone(&stats));
        let dispatcher = tokio::spawn(dispatcher.run());

        let queuer = Queuer::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            work_tx.clone(),
            Arc::clone(&stats),
            config.scan_interval,
            shutdown_rx.clone(),
        );
        let queuer = tokio::spawn(queuer.run());

        let listener = Listener::new(
            Arc::clone(&registry),
            work_tx,
            Arc::clone(&stats),
            shutdown_rx,
        );
        let listener = tokio::spawn(listener.run(bus.subscribe()));

        let supervisor = Arc::new(MonitorSupervisor::new(
            monitor_runtime,
            config.shutdown_timeout,
        ));
        for monitor in registry.monitors() {
            if monitor.paused {
                continue;
            }
            if let Err(error) = supervisor.start(&monitor).await {
                tracing::warn!(path = %monitor.path, %error, "monitor failed during startup");
                if let Err(error) = registry.set_monitor_failed(&monitor.path) {
                    tracing::warn!(path = %monitor.path, %error, "failed to mark monitor failed");
                }
            }
        }

        tracing::info!(workers = config.workers, "engine started");
        Ok(Self {
            registry,
            store,
            supervisor,
            stats,
            shutdown_tx,
            shutdown_timeout: config.shutdown_timeout,
            listener,
            queuer,
            dispatcher,
            workers,
        })
    }

    /// The administrative surface bound to this engine's registry,
    /// store, and monitor supervisor.
    #[must_use]
    pub fn admin(&self) -> Admin<S, M> {
        Admin::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.supervisor),
        )
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Orderly shutdown: producers, then dispatcher, then workers, then
    /// monitor tasks. Each join is bounded; stragglers are logged.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        join_bounded(self.listener, "listener", self.shutdown_timeout).await;
        join_bounded(self.queuer, "queuer", self.shutdown_timeout).await;
        // producers have dropped their senders; the dispatcher drains
        // and closes the worker queues behind it
        join_bounded(self.dispatcher, "dispatcher", self.shutdown_timeout).await;
        for worker in self.workers {
            join_bounded(worker, "worker", self.shutdown_timeout).await;
        }
        self.supervisor.stop_all().await;
        let snapshot = self.stats.snapshot();
        tracing::info!(
            executed = snapshot.executed,
            failed = snapshot.failed,
            dropped = snapshot.dropped,
            "engine stopped",
        );
    }
}

async fn join_bounded(task: tokio::task::JoinHandle<()>, name: &'static str, timeout: Duration) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => {}
        Ok(Err(join_error)) => {
            tracing::warn!(task = name, %join_error, "task failed during shutdown");
        }
        Err(_) => {
            tracing::warn!(task = name, "task did not stop within the shutdown timeout");
        }
    }
}
