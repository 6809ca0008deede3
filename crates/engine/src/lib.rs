//! # sundial-engine
//!
//! Application layer — the automation-event engine and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound
//!   ports):
//!   - `DefinitionStore` — load & persist event definitions
//!   - `ActionEngine` — execute an event's command list
//!   - `MonitorRuntime` — run a supervised watcher task
//!   - `NotificationPublisher` — publish bus notifications
//! - Own the **registries** of scheduled/triggered/monitor definitions and
//!   the derived time-ordered view
//! - Run the background threads of execution: queuer, trigger listener,
//!   dispatcher, worker pool, monitor supervision
//! - Expose the **administrative API** (add/update/delete/rename/pause,
//!   reload, location, queries) with privilege checks
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `sundial-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod admin;
pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod runtime;
pub mod stats;
pub mod supervisor;

mod dispatcher;
mod listener;
mod queuer;
mod throttle;
mod worker;
