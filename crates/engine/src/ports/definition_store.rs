//! Definition store port — persistence for event definitions.
//!
//! The registries are the in-memory authority while the engine runs; the
//! store is read in full at startup and on `reload_list`, and written
//! through on every successful administrative mutation.

use std::future::Future;

use sundial_domain::error::SundialError;
use sundial_domain::list::ListKind;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::scheduled::ScheduledEvent;
use sundial_domain::triggered::TriggeredEvent;

/// Repository for persisting and loading event definitions.
pub trait DefinitionStore {
    /// Load all scheduled-event definitions.
    fn load_scheduled(
        &self,
    ) -> impl Future<Output = Result<Vec<ScheduledEvent>, SundialError>> + Send;

    /// Load all triggered-event definitions.
    fn load_triggered(
        &self,
    ) -> impl Future<Output = Result<Vec<TriggeredEvent>, SundialError>> + Send;

    /// Load all event-monitor definitions.
    fn load_monitors(&self)
    -> impl Future<Output = Result<Vec<EventMonitor>, SundialError>> + Send;

    /// Create or replace a scheduled-event definition.
    fn save_scheduled(
        &self,
        event: &ScheduledEvent,
    ) -> impl Future<Output = Result<(), SundialError>> + Send;

    /// Create or replace a triggered-event definition.
    fn save_triggered(
        &self,
        event: &TriggeredEvent,
    ) -> impl Future<Output = Result<(), SundialError>> + Send;

    /// Create or replace an event-monitor definition.
    fn save_monitor(
        &self,
        monitor: &EventMonitor,
    ) -> impl Future<Output = Result<(), SundialError>> + Send;

    /// Delete a definition by kind and path. Deleting a missing path is
    /// not an error.
    fn delete(
        &self,
        kind: ListKind,
        path: &EventPath,
    ) -> impl Future<Output = Result<(), SundialError>> + Send;
}
