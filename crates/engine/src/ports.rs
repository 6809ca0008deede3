//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the engine core and the outside world.
//! They are defined here (in `engine`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod action_engine;
pub mod definition_store;
pub mod event_bus;
pub mod monitor_runtime;

pub use action_engine::{ActionEngine, Invocation};
pub use definition_store::DefinitionStore;
pub use event_bus::NotificationPublisher;
pub use monitor_runtime::{MonitorHandle, MonitorRuntime};
