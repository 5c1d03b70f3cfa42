//! Heterogeneous-aware EEVDF scheduling core.
//!
//! Extends classic Earliest Eligible Virtual Deadline First to processors
//! whose cores have different computational capacities: virtual time
//! accrues in proportion to delivered work scaled by per-core capacity
//! `rho_c`, and tasks are steered toward the core class that matches their
//! lag relative to global virtual time.
//!
//! This crate is the framework-agnostic "core" (weight cache, capacity
//! table, EEVDF state, per-task state, class dispatcher, event handlers).
//! It is driven entirely through the [`runtime::Runtime`] trait, which
//! stands in for whatever kernel scheduling framework actually invokes the
//! callbacks — that framework, along with the userspace telemetry agent's
//! CLI, lives outside this crate (see the sibling `hetsched-agent` binary
//! and `maps` module for the agent-facing surface).

pub mod capacity;
pub mod dispatch;
pub mod error;
pub mod fixed;
pub mod global;
pub mod handlers;
pub mod ids;
pub mod maps;
pub mod runtime;
pub mod task;
pub mod weight;

pub use capacity::CapacityTable;
pub use error::InitError;
pub use global::{GlobalSnapshot, GlobalState};
pub use handlers::Scheduler;
pub use ids::{Class, CpuId, Dsq, TaskId};
pub use runtime::{Runtime, TaskHandle};
