//! In-memory registries of event definitions.
//!
//! Responsibilities:
//!
//! - own the authoritative collections of scheduled events, triggered
//!   events, and event monitors;
//! - maintain the derived ascending next-fire view over the scheduled
//!   list and the per-list / global version counters;
//! - expose the whole-critical-section operations the queuer and the
//!   admin layer need (scan-then-recompute, rename-then-rebuild) so no
//!   read-modify-write sequence races another.
//!
//! One coarse mutex guards everything. The lock is never held across an
//! await point; all methods are synchronous.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use sundial_domain::error::{ConflictError, NotFoundError, SundialError};
use sundial_domain::list::ListKind;
use sundial_domain::location::GeoLocation;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::schedule::Schedule;
use sundial_domain::scheduled::ScheduledEvent;
use sundial_domain::time::Timestamp;
use sundial_domain::triggered::TriggeredEvent;
use sundial_domain::work_item::WorkItem;

/// Per-list and global version counters.
///
/// Remote clients compare these against a cached copy to detect
/// staleness without re-fetching full lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListVersions {
    pub scheduled: u64,
    pub triggered: u64,
    pub monitor: u64,
    /// Global change serial, bumped on every mutation.
    pub serial: u64,
}

/// Outcome of one queuer scan pass.
#[derive(Debug, Default)]
pub struct ScanPass {
    /// Work items for events whose firing window was reached.
    pub items: Vec<WorkItem>,
    /// One-shot events removed from the registry by this pass. The
    /// caller is expected to delete them from the store, best-effort.
    pub removed: Vec<EventPath>,
}

/// Authoritative in-memory state of the engine.
pub struct Registry {
    inner: Mutex<Inner>,
}

struct Inner {
    scheduled: HashMap<String, ScheduledEvent>,
    triggered: HashMap<String, TriggeredEvent>,
    monitors: HashMap<String, EventMonitor>,
    /// Registry keys sorted ascending by `next_fire`. Derived, rebuilt
    /// after every mutation of the scheduled list.
    fire_order: Vec<String>,
    scheduled_version: u64,
    triggered_version: u64,
    monitor_version: u64,
    serial: u64,
    location: GeoLocation,
}

/// Accessors shared by the three definition kinds, so rename and scope
/// rename apply uniformly.
trait Definition {
    const ENTITY: &'static str;

    fn path(&self) -> &EventPath;
    fn set_path(&mut self, path: EventPath);
    fn set_version(&mut self, version: u64);
}

impl Definition for ScheduledEvent {
    const ENTITY: &'static str = "scheduled event";

    fn path(&self) -> &EventPath {
        &self.path
    }

    fn set_path(&mut self, path: EventPath) {
        self.path = path;
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Definition for TriggeredEvent {
    const ENTITY: &'static str = "triggered event";

    fn path(&self) -> &EventPath {
        &self.path
    }

    fn set_path(&mut self, path: EventPath) {
        self.path = path;
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Definition for EventMonitor {
    const ENTITY: &'static str = "event monitor";

    fn path(&self) -> &EventPath {
        &self.path
    }

    fn set_path(&mut self, path: EventPath) {
        self.path = path;
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Registry {
    #[must_use]
    pub fn new(location: GeoLocation) -> Self {
        Self {
            inner: Mutex::new(Inner {
                scheduled: HashMap::new(),
                triggered: HashMap::new(),
                monitors: HashMap::new(),
                fire_order: Vec::new(),
                scheduled_version: 0,
                triggered_version: 0,
                monitor_version: 0,
                serial: 0,
                location,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Populate all three lists at startup. Next-fire times are
    /// recomputed from the current instant; version counters are not
    /// bumped.
    pub fn load(
        &self,
        scheduled: Vec<ScheduledEvent>,
        triggered: Vec<TriggeredEvent>,
        monitors: Vec<EventMonitor>,
    ) {
        let now = sundial_domain::time::now();
        let inner = &mut *self.lock();
        inner.scheduled.clear();
        for mut event in scheduled {
            recompute_or_defer(&mut event, now, inner.location);
            inner.scheduled.insert(event.path.key(), event);
        }
        inner.triggered = triggered
            .into_iter()
            .map(|event| (event.path.key(), event))
            .collect();
        inner.monitors = monitors
            .into_iter()
            .map(|monitor| (monitor.path.key(), monitor))
            .collect();
        inner.rebuild_view();
    }

    #[must_use]
    pub fn location(&self) -> GeoLocation {
        self.lock().location
    }

    /// Change the solar coordinates. Every sunrise/sunset entry is
    /// recomputed and the view re-sorted; the scheduled list version is
    /// bumped exactly once for the whole batch.
    pub fn set_location(&self, location: GeoLocation) -> u64 {
        let now = sundial_domain::time::now();
        let inner = &mut *self.lock();
        inner.location = location;
        let serial = inner.bump(ListKind::Scheduled);
        let keys: Vec<String> = inner
            .scheduled
            .iter()
            .filter(|(_, event)| event.schedule.is_solar())
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            if let Some(event) = inner.scheduled.get_mut(&key) {
                recompute_or_defer(event, now, location);
                event.version = serial;
            }
        }
        inner.rebuild_view();
        serial
    }

    #[must_use]
    pub fn versions(&self) -> ListVersions {
        let inner = self.lock();
        ListVersions {
            scheduled: inner.scheduled_version,
            triggered: inner.triggered_version,
            monitor: inner.monitor_version,
            serial: inner.serial,
        }
    }

    /// Registry keys and fire times in ascending next-fire order.
    #[must_use]
    pub fn next_fires(&self) -> Vec<(EventPath, Timestamp)> {
        let inner = self.lock();
        inner
            .fire_order
            .iter()
            .filter_map(|key| inner.scheduled.get(key))
            .map(|event| (event.path.clone(), event.next_fire))
            .collect()
    }

    // --- scheduled events ---

    #[must_use]
    pub fn get_scheduled(&self, path: &EventPath) -> Option<ScheduledEvent> {
        self.lock().scheduled.get(&path.key()).cloned()
    }

    #[must_use]
    pub fn scheduled_events(&self) -> Vec<ScheduledEvent> {
        let mut events: Vec<_> = self.lock().scheduled.values().cloned().collect();
        events.sort_by_key(|event| event.path.key());
        events
    }

    /// Add a new scheduled event.
    ///
    /// # Errors
    ///
    /// [`SundialError::Conflict`] when the path is already registered;
    /// [`SundialError::Schedule`] when no next fire time exists for the
    /// schedule at the current location.
    pub fn add_scheduled(&self, mut event: ScheduledEvent) -> Result<u64, SundialError> {
        let now = sundial_domain::time::now();
        let inner = &mut *self.lock();
        let key = event.path.key();
        if inner.scheduled.contains_key(&key) {
            return Err(ConflictError {
                entity: ScheduledEvent::ENTITY,
                path: event.path.to_string(),
            }
            .into());
        }
        event.next_fire = event.schedule.next_fire(now, inner.location)?;
        let serial = inner.bump(ListKind::Scheduled);
        event.version = serial;
        inner.scheduled.insert(key, event);
        inner.rebuild_view();
        Ok(serial)
    }

    /// Replace an existing scheduled event's definition.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered;
    /// [`SundialError::Schedule`] when no next fire time exists.
    pub fn update_scheduled(&self, mut event: ScheduledEvent) -> Result<u64, SundialError> {
        let now = sundial_domain::time::now();
        let inner = &mut *self.lock();
        let key = event.path.key();
        if !inner.scheduled.contains_key(&key) {
            return Err(not_found::<ScheduledEvent>(&event.path).into());
        }
        event.next_fire = event.schedule.next_fire(now, inner.location)?;
        let serial = inner.bump(ListKind::Scheduled);
        event.version = serial;
        inner.scheduled.insert(key, event);
        inner.rebuild_view();
        Ok(serial)
    }

    /// Remove a scheduled event.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn remove_scheduled(&self, path: &EventPath) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        if inner.scheduled.remove(&path.key()).is_none() {
            return Err(not_found::<ScheduledEvent>(path).into());
        }
        let serial = inner.bump(ListKind::Scheduled);
        inner.rebuild_view();
        Ok(serial)
    }

    /// Pause or resume a scheduled event. Returns `None` when the flag
    /// already had the requested value; no version is bumped then.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn set_scheduled_paused(
        &self,
        path: &EventPath,
        paused: bool,
    ) -> Result<Option<u64>, SundialError> {
        let inner = &mut *self.lock();
        let key = path.key();
        let Some(event) = inner.scheduled.get(&key) else {
            return Err(not_found::<ScheduledEvent>(path).into());
        };
        if event.paused == paused {
            return Ok(None);
        }
        let serial = inner.bump(ListKind::Scheduled);
        let event = inner
            .scheduled
            .get_mut(&key)
            .unwrap_or_else(|| unreachable!("checked above under the same lock"));
        event.paused = paused;
        event.version = serial;
        Ok(Some(serial))
    }

    /// Replace the whole scheduled list (administrative reload).
    pub fn replace_scheduled(&self, events: Vec<ScheduledEvent>) -> u64 {
        let now = sundial_domain::time::now();
        let inner = &mut *self.lock();
        let serial = inner.bump(ListKind::Scheduled);
        inner.scheduled.clear();
        for mut event in events {
            recompute_or_defer(&mut event, now, inner.location);
            event.version = serial;
            inner.scheduled.insert(event.path.key(), event);
        }
        inner.rebuild_view();
        serial
    }

    // --- triggered events ---

    #[must_use]
    pub fn get_triggered(&self, path: &EventPath) -> Option<TriggeredEvent> {
        self.lock().triggered.get(&path.key()).cloned()
    }

    #[must_use]
    pub fn triggered_events(&self) -> Vec<TriggeredEvent> {
        let mut events: Vec<_> = self.lock().triggered.values().cloned().collect();
        events.sort_by_key(|event| event.path.key());
        events
    }

    /// Add a new triggered event.
    ///
    /// # Errors
    ///
    /// [`SundialError::Conflict`] when the path is already registered.
    pub fn add_triggered(&self, mut event: TriggeredEvent) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        let key = event.path.key();
        if inner.triggered.contains_key(&key) {
            return Err(ConflictError {
                entity: TriggeredEvent::ENTITY,
                path: event.path.to_string(),
            }
            .into());
        }
        let serial = inner.bump(ListKind::Triggered);
        event.version = serial;
        inner.triggered.insert(key, event);
        Ok(serial)
    }

    /// Replace an existing triggered event's definition.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn update_triggered(&self, mut event: TriggeredEvent) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        let key = event.path.key();
        if !inner.triggered.contains_key(&key) {
            return Err(not_found::<TriggeredEvent>(&event.path).into());
        }
        let serial = inner.bump(ListKind::Triggered);
        event.version = serial;
        inner.triggered.insert(key, event);
        Ok(serial)
    }

    /// Remove a triggered event.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn remove_triggered(&self, path: &EventPath) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        if inner.triggered.remove(&path.key()).is_none() {
            return Err(not_found::<TriggeredEvent>(path).into());
        }
        Ok(inner.bump(ListKind::Triggered))
    }

    /// Pause or resume a triggered event. Returns `None` when already in
    /// the requested state.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn set_triggered_paused(
        &self,
        path: &EventPath,
        paused: bool,
    ) -> Result<Option<u64>, SundialError> {
        let inner = &mut *self.lock();
        let key = path.key();
        let Some(event) = inner.triggered.get(&key) else {
            return Err(not_found::<TriggeredEvent>(path).into());
        };
        if event.paused == paused {
            return Ok(None);
        }
        let serial = inner.bump(ListKind::Triggered);
        let event = inner
            .triggered
            .get_mut(&key)
            .unwrap_or_else(|| unreachable!("checked above under the same lock"));
        event.paused = paused;
        event.version = serial;
        Ok(Some(serial))
    }

    /// Replace the whole triggered list (administrative reload).
    pub fn replace_triggered(&self, events: Vec<TriggeredEvent>) -> u64 {
        let inner = &mut *self.lock();
        let serial = inner.bump(ListKind::Triggered);
        inner.triggered = events
            .into_iter()
            .map(|mut event| {
                event.version = serial;
                (event.path.key(), event)
            })
            .collect();
        serial
    }

    // --- event monitors ---

    #[must_use]
    pub fn get_monitor(&self, path: &EventPath) -> Option<EventMonitor> {
        self.lock().monitors.get(&path.key()).cloned()
    }

    #[must_use]
    pub fn monitors(&self) -> Vec<EventMonitor> {
        let mut monitors: Vec<_> = self.lock().monitors.values().cloned().collect();
        monitors.sort_by_key(|monitor| monitor.path.key());
        monitors
    }

    /// Add a new event monitor.
    ///
    /// # Errors
    ///
    /// [`SundialError::Conflict`] when the path is already registered.
    pub fn add_monitor(&self, mut monitor: EventMonitor) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        let key = monitor.path.key();
        if inner.monitors.contains_key(&key) {
            return Err(ConflictError {
                entity: EventMonitor::ENTITY,
                path: monitor.path.to_string(),
            }
            .into());
        }
        let serial = inner.bump(ListKind::Monitor);
        monitor.version = serial;
        inner.monitors.insert(key, monitor);
        Ok(serial)
    }

    /// Replace an existing event monitor's definition.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn update_monitor(&self, mut monitor: EventMonitor) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        let key = monitor.path.key();
        if !inner.monitors.contains_key(&key) {
            return Err(not_found::<EventMonitor>(&monitor.path).into());
        }
        let serial = inner.bump(ListKind::Monitor);
        monitor.version = serial;
        inner.monitors.insert(key, monitor);
        Ok(serial)
    }

    /// Remove an event monitor.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn remove_monitor(&self, path: &EventPath) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        if inner.monitors.remove(&path.key()).is_none() {
            return Err(not_found::<EventMonitor>(path).into());
        }
        Ok(inner.bump(ListKind::Monitor))
    }

    /// Pause or resume an event monitor. Returns `None` when already in
    /// the requested state. Resuming clears the `failed` flag so the
    /// supervisor attempts a fresh start.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn set_monitor_paused(
        &self,
        path: &EventPath,
        paused: bool,
    ) -> Result<Option<u64>, SundialError> {
        let inner = &mut *self.lock();
        let key = path.key();
        let Some(monitor) = inner.monitors.get(&key) else {
            return Err(not_found::<EventMonitor>(path).into());
        };
        if monitor.paused == paused {
            return Ok(None);
        }
        let serial = inner.bump(ListKind::Monitor);
        let monitor = inner
            .monitors
            .get_mut(&key)
            .unwrap_or_else(|| unreachable!("checked above under the same lock"));
        monitor.paused = paused;
        if !paused {
            monitor.failed = false;
        }
        monitor.version = serial;
        Ok(Some(serial))
    }

    /// Mark a monitor as failed at startup. A failed monitor stays
    /// paused and is not auto-restarted.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when the path is not registered.
    pub fn set_monitor_failed(&self, path: &EventPath) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        let key = path.key();
        if !inner.monitors.contains_key(&key) {
            return Err(not_found::<EventMonitor>(path).into());
        }
        let serial = inner.bump(ListKind::Monitor);
        let monitor = inner
            .monitors
            .get_mut(&key)
            .unwrap_or_else(|| unreachable!("checked above under the same lock"));
        monitor.failed = true;
        monitor.paused = true;
        monitor.version = serial;
        Ok(serial)
    }

    /// Replace the whole monitor list (administrative reload).
    pub fn replace_monitors(&self, monitors: Vec<EventMonitor>) -> u64 {
        let inner = &mut *self.lock();
        let serial = inner.bump(ListKind::Monitor);
        inner.monitors = monitors
            .into_iter()
            .map(|mut monitor| {
                monitor.version = serial;
                (monitor.path.key(), monitor)
            })
            .collect();
        serial
    }

    // --- rename ---

    /// Rename a single definition.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when `old` is not registered in the
    /// named list, [`SundialError::Conflict`] when `new` already is.
    pub fn rename(
        &self,
        kind: ListKind,
        old: &EventPath,
        new: &EventPath,
    ) -> Result<u64, SundialError> {
        let inner = &mut *self.lock();
        match kind {
            ListKind::Scheduled => {
                let serial = rename_one(&mut inner.scheduled, old, new, &mut inner.serial)?;
                inner.scheduled_version = serial;
                inner.rebuild_view();
                Ok(serial)
            }
            ListKind::Triggered => {
                let serial = rename_one(&mut inner.triggered, old, new, &mut inner.serial)?;
                inner.triggered_version = serial;
                Ok(serial)
            }
            ListKind::Monitor => {
                let serial = rename_one(&mut inner.monitors, old, new, &mut inner.serial)?;
                inner.monitor_version = serial;
                Ok(serial)
            }
        }
    }

    /// Rewrite the path prefix of every definition, in all three lists,
    /// whose path starts with `old` (case-insensitive). Returns the new
    /// serial and the number of definitions renamed.
    ///
    /// # Errors
    ///
    /// [`SundialError::NotFound`] when no definition matches the scope,
    /// [`SundialError::Conflict`] when any rewritten path would collide
    /// with an existing one.
    pub fn rename_scope(
        &self,
        old: &EventPath,
        new: &EventPath,
    ) -> Result<(u64, usize), SundialError> {
        let inner = &mut *self.lock();
        let scheduled_plan = plan_scope_rename(&inner.scheduled, old, new)?;
        let triggered_plan = plan_scope_rename(&inner.triggered, old, new)?;
        let monitor_plan = plan_scope_rename(&inner.monitors, old, new)?;
        let count = scheduled_plan.len() + triggered_plan.len() + monitor_plan.len();
        if count == 0 {
            return Err(NotFoundError {
                entity: "scope",
                path: old.to_string(),
            }
            .into());
        }
        inner.serial += 1;
        let serial = inner.serial;
        if !scheduled_plan.is_empty() {
            apply_scope_rename(&mut inner.scheduled, scheduled_plan, serial);
            inner.scheduled_version = serial;
            inner.rebuild_view();
        }
        if !triggered_plan.is_empty() {
            apply_scope_rename(&mut inner.triggered, triggered_plan, serial);
            inner.triggered_version = serial;
        }
        if !monitor_plan.is_empty() {
            apply_scope_rename(&mut inner.monitors, monitor_plan, serial);
            inner.monitor_version = serial;
        }
        Ok((serial, count))
    }

    // --- queuer scan ---

    /// One queuer pass: walk the ascending view from the front, emit a
    /// work item for every event whose firing window has been reached,
    /// recompute fire times, drop fired one-shots, and rebuild the view.
    /// The whole pass runs under one lock acquisition.
    pub fn scan_due(&self, now: Timestamp) -> ScanPass {
        let inner = &mut *self.lock();
        let location = inner.location;
        let mut due = Vec::new();
        for key in &inner.fire_order {
            let Some(event) = inner.scheduled.get(key) else {
                continue;
            };
            if event.next_fire > now {
                break;
            }
            due.push(key.clone());
        }
        if due.is_empty() {
            return ScanPass::default();
        }
        inner.serial += 1;
        let serial = inner.serial;
        let mut pass = ScanPass::default();
        for key in due {
            let Some(event) = inner.scheduled.get_mut(&key) else {
                continue;
            };
            if event.schedule.is_one_shot() {
                if !event.paused {
                    pass.items.push(WorkItem::scheduled(event.path.clone()));
                }
                pass.removed.push(event.path.clone());
                inner.scheduled.remove(&key);
                continue;
            }
            if !event.paused {
                pass.items.push(WorkItem::scheduled(event.path.clone()));
            }
            // Periodic windows advance from the window that fired, so a
            // late scan yields T + P rather than now + P. The other
            // kinds look for the next occurrence strictly after now.
            let base = if matches!(event.schedule, Schedule::Periodic { .. }) {
                event.next_fire
            } else {
                now
            };
            recompute_or_defer(event, base, location);
            event.version = serial;
        }
        inner.rebuild_view();
        pass
    }
}

impl Inner {
    /// Bump the global serial, stamp it onto the named list's version,
    /// and return it.
    fn bump(&mut self, kind: ListKind) -> u64 {
        self.serial += 1;
        match kind {
            ListKind::Scheduled => self.scheduled_version = self.serial,
            ListKind::Triggered => self.triggered_version = self.serial,
            ListKind::Monitor => self.monitor_version = self.serial,
        }
        self.serial
    }

    fn rebuild_view(&mut self) {
        let mut order: Vec<String> = self.scheduled.keys().cloned().collect();
        order.sort_by(|a, b| {
            self.scheduled[a]
                .next_fire
                .cmp(&self.scheduled[b].next_fire)
                .then_with(|| a.cmp(b))
        });
        self.fire_order = order;
    }
}

fn not_found<T: Definition>(path: &EventPath) -> NotFoundError {
    NotFoundError {
        entity: T::ENTITY,
        path: path.to_string(),
    }
}

/// Recompute a fire time, deferring by a day on configuration errors so
/// a broken entry is reported without wedging the scan at the front of
/// the view.
fn recompute_or_defer(event: &mut ScheduledEvent, now: Timestamp, location: GeoLocation) {
    if let Err(error) = event.recompute(now, location) {
        tracing::warn!(
            path = %event.path,
            %error,
            "next fire time could not be computed, retrying tomorrow",
        );
        event.next_fire = now + chrono::Duration::days(1);
    }
}

fn rename_one<T: Definition>(
    map: &mut HashMap<String, T>,
    old: &EventPath,
    new: &EventPath,
    serial: &mut u64,
) -> Result<u64, SundialError> {
    if !map.contains_key(&old.key()) {
        return Err(not_found::<T>(old).into());
    }
    if map.contains_key(&new.key()) {
        return Err(ConflictError {
            entity: T::ENTITY,
            path: new.to_string(),
        }
        .into());
    }
    let mut entry = map
        .remove(&old.key())
        .unwrap_or_else(|| unreachable!("checked above under the same lock"));
    *serial += 1;
    entry.set_path(new.clone());
    entry.set_version(*serial);
    map.insert(new.key(), entry);
    Ok(*serial)
}

/// Compute the key rewrites a scope rename would apply to one list,
/// failing on any collision before anything is touched.
fn plan_scope_rename<T: Definition>(
    map: &HashMap<String, T>,
    old: &EventPath,
    new: &EventPath,
) -> Result<Vec<(String, EventPath)>, SundialError> {
    let mut plan = Vec::new();
    for (key, entry) in map {
        let Some(renamed) = entry.path().replace_prefix_ci(old, new) else {
            continue;
        };
        plan.push((key.clone(), renamed));
    }
    let moved: std::collections::HashSet<&String> = plan.iter().map(|(key, _)| key).collect();
    let mut targets = std::collections::HashSet::new();
    for (_, renamed) in &plan {
        let target = renamed.key();
        if map.contains_key(&target) && !moved.contains(&target) || !targets.insert(target) {
            return Err(ConflictError {
                entity: T::ENTITY,
                path: renamed.to_string(),
            }
            .into());
        }
    }
    Ok(plan)
}

fn apply_scope_rename<T: Definition>(
    map: &mut HashMap<String, T>,
    plan: Vec<(String, EventPath)>,
    serial: u64,
) {
    let mut renamed = Vec::with_capacity(plan.len());
    for (key, path) in plan {
        if let Some(mut entry) = map.remove(&key) {
            entry.set_path(path);
            entry.set_version(serial);
            renamed.push(entry);
        }
    }
    for entry in renamed {
        map.insert(entry.path().key(), entry);
    }
}
