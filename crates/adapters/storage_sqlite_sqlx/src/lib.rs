//! # sundial-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `DefinitionStore` port defined in `sundial-engine`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `sundial-engine` (for the port trait) and `sundial-domain`
//! (for domain types). The `engine` and `domain` crates must never
//! reference this adapter.

pub mod definition_store;
pub mod error;
pub mod pool;

pub use definition_store::SqliteDefinitionStore;
pub use pool::{Config, Database};
