//! `SQLite` implementation of the engine's `DefinitionStore` port.
//!
//! Definitions are stored one row per event: the case-insensitive path
//! as primary key and the serialized entity as a JSON body column.

use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use sundial_domain::error::SundialError;
use sundial_domain::list::ListKind;
use sundial_domain::monitor::EventMonitor;
use sundial_domain::path::EventPath;
use sundial_domain::scheduled::ScheduledEvent;
use sundial_domain::triggered::TriggeredEvent;
use sundial_engine::ports::DefinitionStore;

use crate::error::StorageError;

struct Wrapper<T>(T);

impl<'r, T: DeserializeOwned> FromRow<'r, SqliteRow> for Wrapper<T> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let body: String = row.try_get("body")?;
        serde_json::from_str(&body)
            .map(Self)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))
    }
}

fn table(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Scheduled => "scheduled_events",
        ListKind::Triggered => "triggered_events",
        ListKind::Monitor => "event_monitors",
    }
}

/// `SQLite`-backed definition store.
pub struct SqliteDefinitionStore {
    pool: SqlitePool,
}

impl SqliteDefinitionStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load<T: DeserializeOwned + Send + Unpin>(
        &self,
        kind: ListKind,
    ) -> Result<Vec<T>, SundialError> {
        let query = format!("SELECT body FROM {} ORDER BY path", table(kind));
        let rows: Vec<Wrapper<T>> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn save(
        &self,
        kind: ListKind,
        path: &EventPath,
        body: String,
    ) -> Result<(), SundialError> {
        let query = format!(
            "INSERT INTO {} (path, body) VALUES (?, ?) ON CONFLICT(path) DO UPDATE SET body = excluded.body",
            table(kind),
        );
        sqlx::query(&query)
            .bind(path.as_str())
            .bind(&body)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

impl DefinitionStore for SqliteDefinitionStore {
    async fn load_scheduled(&self) -> Result<Vec<ScheduledEvent>, SundialError> {
        self.load(ListKind::Scheduled).await
    }

    async fn load_triggered(&self) -> Result<Vec<TriggeredEvent>, SundialError> {
        self.load(ListKind::Triggered).await
    }

    async fn load_monitors(&self) -> Result<Vec<EventMonitor>, SundialError> {
        self.load(ListKind::Monitor).await
    }

    async fn save_scheduled(&self, event: &ScheduledEvent) -> Result<(), SundialError> {
        let body = serde_json::to_string(event).map_err(StorageError::from)?;
        self.save(ListKind::Scheduled, &event.path, body).await
    }

    async fn save_triggered(&self, event: &TriggeredEvent) -> Result<(), SundialError> {
        let body = serde_json::to_string(event).map_err(StorageError::from)?;
        self.save(ListKind::Triggered, &event.path, body).await
    }

    async fn save_monitor(&self, monitor: &EventMonitor) -> Result<(), SundialError> {
        let body = serde_json::to_string(monitor).map_err(StorageError::from)?;
        self.save(ListKind::Monitor, &monitor.path, body).await
    }

    async fn delete(&self, kind: ListKind, path: &EventPath) -> Result<(), SundialError> {
        let query = format!("DELETE FROM {} WHERE path = ?", table(kind));
        sqlx::query(&query)
            .bind(path.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
