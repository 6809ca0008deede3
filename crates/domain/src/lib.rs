//! # sundial-domain
//!
//! Pure domain model for the sundial automation-event runtime.
//!
//! ## Responsibilities
//! - Foundational types: event paths, timestamps, error conventions
//! - Define **Scheduled events** (periodic, time-of-day, solar, one-shot)
//! - Define **Triggered events** (filter expressions over bus notifications)
//! - Define **Event monitors** (continuously running watcher definitions)
//! - Define **Work items** (one firing of a scheduled or triggered event)
//! - Next-fire-time computation, including sunrise/sunset math
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `engine`, adapters, or external IO
//! crates. All IO boundaries are expressed as traits in the `engine` crate
//! (ports).

pub mod error;
pub mod id;
pub mod path;
pub mod time;

pub mod filter;
pub mod list;
pub mod location;
pub mod monitor;
pub mod payload;
pub mod privilege;
pub mod schedule;
pub mod scheduled;
pub mod solar;
pub mod triggered;
pub mod work_item;
