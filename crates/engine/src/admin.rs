//! Administrative mutation API.
//!
//! Responsibilities:
//!
//! - privilege checks: queries require observer, definition mutations
//!   operator, structural operations (rename, reload, location) admin;
//! - write-through: every successful mutation updates the registry and
//!   the definition store, rolling the registry back when the store
//!   write fails so both stay consistent;
//! - monitor lifecycle: starting, stopping, and re-keying supervised
//!   tasks in lock-step with their definitions.
//!
//! Every mutation returns the new global change serial so callers can
//! detect whether their cached view is stale.

use std::sync::Arc;

use serde::Serialize;
use sundial_domain::error::{NotFoundError, SundialError};
use sundial_domain::list::ListKind;
use sundial_domain::location::GeoLocation;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::privilege::Privilege;
use sundial_domain::schedule::Schedule;
use sundial_domain::scheduled::ScheduledEvent;
use sundial_domain::solar::{SolarDay, solar_day};
use sundial_domain::time::Timestamp;
use sundial_domain::triggered::TriggeredEvent;

use crate::ports::{DefinitionStore, MonitorRuntime};
use crate::registry::{ListVersions, Registry};
use crate::supervisor::MonitorSupervisor;

/// Answer to a solar-event query for one scheduled event.
#[derive(Debug, Clone, Serialize)]
pub struct SolarEventInfo {
    pub path: EventPath,
    pub schedule: Schedule,
    pub next_fire: Timestamp,
    /// Today's sunrise/sunset at the configured location.
    pub today: SolarDay,
}

/// Administrative surface over the engine's registries.
pub struct Admin<S, M> {
    registry: Arc<Registry>,
    store: Arc<S>,
    supervisor: Arc<MonitorSupervisor<M>>,
}

impl<S, M> Admin<S, M>
where
    S: DefinitionStore + Send + Sync,
    M: MonitorRuntime,
{
    pub(crate) fn new(
        registry: Arc<Registry>,
        store: Arc<S>,
        supervisor: Arc<MonitorSupervisor<M>>,
    ) -> Self {
        Self {
            registry,
            store,
            supervisor,
        }
    }

    // --- queries ---

    /// Current list and global version counters.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below observer.
    pub fn versions(&self, privilege: Privilege) -> Result<ListVersions, SundialError> {
        privilege.require(Privilege::Observer)?;
        Ok(self.registry.versions())
    }

    /// Full schedule state of one event.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below observer,
    /// [`SundialError::NotFound`] for an unknown path.
    pub fn schedule_info(
        &self,
        privilege: Privilege,
        path: &EventPath,
    ) -> Result<ScheduledEvent, SundialError> {
        privilege.require(Privilege::Observer)?;
        self.registry
            .get_scheduled(path)
            .ok_or_else(|| not_found("scheduled event", path).into())
    }

    /// Solar-event state of one sunrise/sunset-scheduled event, plus
    /// today's solar times at the configured location.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below observer,
    /// [`SundialError::NotFound`] when the path is unknown or not
    /// solar-scheduled.
    pub fn solar_event_info(
        &self,
        privilege: Privilege,
        path: &EventPath,
    ) -> Result<SolarEventInfo, SundialError> {
        privilege.require(Privilege::Observer)?;
        let event = self
            .registry
            .get_scheduled(path)
            .ok_or_else(|| not_found("scheduled event", path))?;
        if !event.schedule.is_solar() {
            return Err(not_found("solar event", path).into());
        }
        let now = sundial_domain::time::now();
        Ok(SolarEventInfo {
            path: event.path,
            schedule: event.schedule,
            next_fire: event.next_fire,
            today: solar_day(now.date_naive(), self.registry.location()),
        })
    }

    // --- scheduled events ---

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn add_scheduled(
        &self,
        privilege: Privilege,
        event: ScheduledEvent,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        event.validate()?;
        let path = event.path.clone();
        let serial = self.registry.add_scheduled(event)?;
        let stored = self
            .registry
            .get_scheduled(&path)
            .ok_or_else(|| SundialError::Engine("added event vanished".to_string()))?;
        if let Err(error) = self.store.save_scheduled(&stored).await {
            let _ = self.registry.remove_scheduled(&path);
            return Err(error);
        }
        Ok(serial)
    }

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn update_scheduled(
        &self,
        privilege: Privilege,
        event: ScheduledEvent,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        event.validate()?;
        let path = event.path.clone();
        let previous = self
            .registry
            .get_scheduled(&path)
            .ok_or_else(|| not_found("scheduled event", &path))?;
        let serial = self.registry.update_scheduled(event)?;
        let stored = self
            .registry
            .get_scheduled(&path)
            .ok_or_else(|| SundialError::Engine("updated event vanished".to_string()))?;
        if let Err(error) = self.store.save_scheduled(&stored).await {
            let _ = self.registry.update_scheduled(previous);
            return Err(error);
        }
        Ok(serial)
    }

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn delete_scheduled(
        &self,
        privilege: Privilege,
        path: &EventPath,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let previous = self
            .registry
            .get_scheduled(path)
            .ok_or_else(|| not_found("scheduled event", path))?;
        let serial = self.registry.remove_scheduled(path)?;
        if let Err(error) = self.store.delete(ListKind::Scheduled, path).await {
            let _ = self.registry.add_scheduled(previous);
            return Err(error);
        }
        Ok(serial)
    }

    /// Pause or resume. Idempotent: returns the current serial without
    /// bumping anything when the flag already has the requested value.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn pause_scheduled(
        &self,
        privilege: Privilege,
        path: &EventPath,
        paused: bool,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let Some(serial) = self.registry.set_scheduled_paused(path, paused)? else {
            return Ok(self.registry.versions().serial);
        };
        let stored = self
            .registry
            .get_scheduled(path)
            .ok_or_else(|| SundialError::Engine("paused event vanished".to_string()))?;
        if let Err(error) = self.store.save_scheduled(&stored).await {
            let _ = self.registry.set_scheduled_paused(path, !paused);
            return Err(error);
        }
        Ok(serial)
    }

    // --- triggered events ---

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn add_triggered(
        &self,
        privilege: Privilege,
        event: TriggeredEvent,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        event.validate()?;
        let path = event.path.clone();
        let serial = self.registry.add_triggered(event)?;
        let stored = self
            .registry
            .get_triggered(&path)
            .ok_or_else(|| SundialError::Engine("added event vanished".to_string()))?;
        if let Err(error) = self.store.save_triggered(&stored).await {
            let _ = self.registry.remove_triggered(&path);
            return Err(error);
        }
        Ok(serial)
    }

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn update_triggered(
        &self,
        privilege: Privilege,
        event: TriggeredEvent,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        event.validate()?;
        let path = event.path.clone();
        let previous = self
            .registry
            .get_triggered(&path)
            .ok_or_else(|| not_found("triggered event", &path))?;
        let serial = self.registry.update_triggered(event)?;
        let stored = self
            .registry
            .get_triggered(&path)
            .ok_or_else(|| SundialError::Engine("updated event vanished".to_string()))?;
        if let Err(error) = self.store.save_triggered(&stored).await {
            let _ = self.registry.update_triggered(previous);
            return Err(error);
        }
        Ok(serial)
    }

    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn delete_triggered(
        &self,
        privilege: Privilege,
        path: &EventPath,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let previous = self
            .registry
            .get_triggered(path)
            .ok_or_else(|| not_found("triggered event", path))?;
        let serial = self.registry.remove_triggered(path)?;
        if let Err(error) = self.store.delete(ListKind::Triggered, path).await {
            let _ = self.registry.add_triggered(previous);
            return Err(error);
        }
        Ok(serial)
    }

    /// Pause or resume. Idempotent like [`Self::pause_scheduled`].
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn pause_triggered(
        &self,
        privilege: Privilege,
        path: &EventPath,
        paused: bool,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let Some(serial) = self.registry.set_triggered_paused(path, paused)? else {
            return Ok(self.registry.versions().serial);
        };
        let stored = self
            .registry
            .get_triggered(path)
            .ok_or_else(|| SundialError::Engine("paused event vanished".to_string()))?;
        if let Err(error) = self.store.save_triggered(&stored).await {
            let _ = self.registry.set_triggered_paused(path, !paused);
            return Err(error);
        }
        Ok(serial)
    }

    // --- event monitors ---

    /// Add a monitor and start its supervised task. A task that fails
    /// during startup leaves the definition in place, marked failed and
    /// paused; it is not auto-restarted.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn add_monitor(
        &self,
        privilege: Privilege,
        monitor: EventMonitor,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        monitor.validate()?;
        let path = monitor.path.clone();
        let serial = self.registry.add_monitor(monitor)?;
        let stored = self
            .registry
            .get_monitor(&path)
            .ok_or_else(|| SundialError::Engine("added monitor vanished".to_string()))?;
        if let Err(error) = self.store.save_monitor(&stored).await {
            let _ = self.registry.remove_monitor(&path);
            return Err(error);
        }
        self.start_monitor_task(&stored).await;
        Ok(serial)
    }

    /// Replace a monitor's definition and restart its task with the new
    /// configuration.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn update_monitor(
        &self,
        privilege: Privilege,
        monitor: EventMonitor,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        monitor.validate()?;
        let path = monitor.path.clone();
        let previous = self
            .registry
            .get_monitor(&path)
            .ok_or_else(|| not_found("event monitor", &path))?;
        let serial = self.registry.update_monitor(monitor)?;
        let stored = self
            .registry
            .get_monitor(&path)
            .ok_or_else(|| SundialError::Engine("updated monitor vanished".to_string()))?;
        if let Err(error) = self.store.save_monitor(&stored).await {
            let _ = self.registry.update_monitor(previous);
            return Err(error);
        }
        self.supervisor.stop(&path).await;
        self.start_monitor_task(&stored).await;
        Ok(serial)
    }

    /// Delete a monitor, stopping its task.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn delete_monitor(
        &self,
        privilege: Privilege,
        path: &EventPath,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let previous = self
            .registry
            .get_monitor(path)
            .ok_or_else(|| not_found("event monitor", path))?;
        let serial = self.registry.remove_monitor(path)?;
        if let Err(error) = self.store.delete(ListKind::Monitor, path).await {
            let _ = self.registry.add_monitor(previous);
            return Err(error);
        }
        self.supervisor.stop(path).await;
        Ok(serial)
    }

    /// Pause or resume a monitor, stopping or starting its task in
    /// lock-step. Resuming clears a failed flag and retries the start.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below operator, plus any registry
    /// or store failure.
    pub async fn pause_monitor(
        &self,
        privilege: Privilege,
        path: &EventPath,
        paused: bool,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Operator)?;
        let Some(serial) = self.registry.set_monitor_paused(path, paused)? else {
            return Ok(self.registry.versions().serial);
        };
        let stored = self
            .registry
            .get_monitor(path)
            .ok_or_else(|| SundialError::Engine("paused monitor vanished".to_string()))?;
        if let Err(error) = self.store.save_monitor(&stored).await {
            let _ = self.registry.set_monitor_paused(path, !paused);
            return Err(error);
        }
        if paused {
            self.supervisor.stop(path).await;
        } else {
            self.start_monitor_task(&stored).await;
        }
        Ok(serial)
    }

    async fn start_monitor_task(&self, monitor: &EventMonitor) {
        if let Err(error) = self.supervisor.start(monitor).await {
            tracing::warn!(path = %monitor.path, %error, "monitor failed during startup");
            if let Err(error) = self.registry.set_monitor_failed(&monitor.path) {
                tracing::warn!(path = %monitor.path, %error, "failed to mark monitor failed");
            }
        }
    }

    // --- structural operations ---

    /// Rename a single definition in one list.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below admin, plus any registry or
    /// store failure.
    pub async fn rename(
        &self,
        privilege: Privilege,
        kind: ListKind,
        old: &EventPath,
        new: &EventPath,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Admin)?;
        let serial = self.registry.rename(kind, old, new)?;
        if let Err(error) = self.persist_renamed(kind, old, new).await {
            let _ = self.registry.rename(kind, new, old);
            return Err(error);
        }
        if kind == ListKind::Monitor {
            self.supervisor.rename(old, new).await;
        }
        Ok(serial)
    }

    /// Rewrite a path prefix across all three lists. Returns the new
    /// serial and the number of definitions renamed.
    ///
    /// Store persistence of the renamed definitions is applied after
    /// the registry change; a store failure is returned to the caller
    /// but the registry keeps the new names — `reload_list` restores
    /// consistency from whichever side is authoritative.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below admin, plus any registry or
    /// store failure.
    pub async fn rename_scope(
        &self,
        privilege: Privilege,
        old: &EventPath,
        new: &EventPath,
    ) -> Result<(u64, usize), SundialError> {
        privilege.require(Privilege::Admin)?;
        let (serial, count) = self.registry.rename_scope(old, new)?;
        let mut first_error = None;
        for event in self.registry.scheduled_events() {
            if !event.path.starts_with_ci(new) {
                continue;
            }
            if let Some(previous) = event.path.replace_prefix_ci(new, old) {
                let result = self.persist_moved_scheduled(&event, &previous).await;
                record_first_error(&mut first_error, result);
            }
        }
        for event in self.registry.triggered_events() {
            if !event.path.starts_with_ci(new) {
                continue;
            }
            if let Some(previous) = event.path.replace_prefix_ci(new, old) {
                let result = self.persist_moved_triggered(&event, &previous).await;
                record_first_error(&mut first_error, result);
            }
        }
        for monitor in self.registry.monitors() {
            if !monitor.path.starts_with_ci(new) {
                continue;
            }
            if let Some(previous) = monitor.path.replace_prefix_ci(new, old) {
                let result = self.persist_moved_monitor(&monitor, &previous).await;
                record_first_error(&mut first_error, result);
                self.supervisor.rename(&previous, &monitor.path).await;
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok((serial, count)),
        }
    }

    /// Discard one in-memory list and reload it from the store. For the
    /// monitor list, running tasks are stopped and restarted from the
    /// fresh definitions.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below admin, plus any store
    /// failure (the in-memory list is untouched then).
    pub async fn reload_list(
        &self,
        privilege: Privilege,
        kind: ListKind,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Admin)?;
        match kind {
            ListKind::Scheduled => {
                let events = self.store.load_scheduled().await?;
                Ok(self.registry.replace_scheduled(events))
            }
            ListKind::Triggered => {
                let events = self.store.load_triggered().await?;
                Ok(self.registry.replace_triggered(events))
            }
            ListKind::Monitor => {
                let monitors = self.store.load_monitors().await?;
                let serial = self.registry.replace_monitors(monitors);
                self.supervisor.stop_all().await;
                for monitor in self.registry.monitors() {
                    self.start_monitor_task(&monitor).await;
                }
                Ok(serial)
            }
        }
    }

    /// Change the solar coordinates. Every sunrise/sunset event is
    /// recomputed; the scheduled list version is bumped once for the
    /// whole batch.
    ///
    /// # Errors
    ///
    /// [`SundialError::AccessDenied`] below admin.
    pub fn set_location(
        &self,
        privilege: Privilege,
        location: GeoLocation,
    ) -> Result<u64, SundialError> {
        privilege.require(Privilege::Admin)?;
        let serial = self.registry.set_location(location);
        tracing::info!(
            latitude = location.latitude,
            longitude = location.longitude,
            serial,
            "location changed, solar schedules recomputed",
        );
        Ok(serial)
    }

    async fn persist_renamed(
        &self,
        kind: ListKind,
        old: &EventPath,
        new: &EventPath,
    ) -> Result<(), SundialError> {
        match kind {
            ListKind::Scheduled => {
                let event = self
                    .registry
                    .get_scheduled(new)
                    .ok_or_else(|| SundialError::Engine("renamed event vanished".to_string()))?;
                self.persist_moved_scheduled(&event, old).await
            }
            ListKind::Triggered => {
                let event = self
                    .registry
                    .get_triggered(new)
                    .ok_or_else(|| SundialError::Engine("renamed event vanished".to_string()))?;
                self.persist_moved_triggered(&event, old).await
            }
            ListKind::Monitor => {
                let monitor = self
                    .registry
                    .get_monitor(new)
                    .ok_or_else(|| SundialError::Engine("renamed monitor vanished".to_string()))?;
                self.persist_moved_monitor(&monitor, old).await
            }
        }
    }

    async fn persist_moved_scheduled(
        &self,
        event: &ScheduledEvent,
        old: &EventPath,
    ) -> Result<(), SundialError> {
        self.store.save_scheduled(event).await?;
        self.store.delete(ListKind::Scheduled, old).await
    }

    async fn persist_moved_triggered(
        &self,
        event: &TriggeredEvent,
        old: &EventPath,
    ) -> Result<(), SundialError> {
        self.store.save_triggered(event).await?;
        self.store.delete(ListKind::Triggered, old).await
    }

    async fn persist_moved_monitor(
        &self,
        monitor: &EventMonitor,
        old: &EventPath,
    ) -> Result<(), SundialError> {
        self.store.save_monitor(monitor).await?;
        self.store.delete(ListKind::Monitor, old).await
    }
}

fn not_found(entity: &'static str, path: &EventPath) -> NotFoundError {
    NotFoundError {
        entity,
        path: path.to_string(),
    }
}

fn record_first_error(slot: &mut Option<SundialError>, result: Result<(), SundialError>) {
    if let Err(error) = result
        && slot.is_none()
    {
        *slot = Some(error);
    }
}
