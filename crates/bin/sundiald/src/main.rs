//! # sundiald — sundial daemon
//!
//! Composition root that wires the adapters to the engine and runs it.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize structured logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the definition store adapter
//! - Construct the built-in action engine and monitor runtime
//! - Open the engine, injecting the adapters via port traits
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod drivers;

use anyhow::Context;
use sundial_adapter_storage_sqlite_sqlx::SqliteDefinitionStore;
use sundial_engine::event_bus::EventBus;
use sundial_engine::runtime::Engine;

use crate::config::Config;
use crate::drivers::{HeartbeatMonitorRuntime, LoggingActionEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db_config = sundial_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    };
    let db = db_config
        .build()
        .await
        .context("initializing the definition database")?;
    let store = SqliteDefinitionStore::new(db.pool().clone());

    // Event bus
    let bus = EventBus::new(256);

    // Engine
    let engine = Engine::open(
        config.engine_config(),
        store,
        LoggingActionEngine,
        HeartbeatMonitorRuntime::new(bus.clone()),
        &bus,
    )
    .await
    .context("starting the engine")?;

    tracing::info!("sundiald running; press ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("listening for the shutdown signal")?;
    tracing::info!("shutdown signal received");

    engine.close().await;
    Ok(())
}
