//! Runtime core: lifecycle orchestration.
//!
//! This module contains the engine that drives every registered unit through
//! construct → setup → start → stop. The public surface is [`Supervisor`]
//! (built with [`SupervisorBuilder`]), the [`LifecycleUnit`] contract and the
//! [`UnitContext`] handed to each unit.
//!
//! Internal modules:
//! - [`runner`]: runs one unit's call for one phase with panic isolation, optional timeout and events;
//! - [`supervisor`]: phase fan-out/join-all, readiness, exactly-once shutdown;
//! - [`builder`]: registry validation, event wiring, construct phase;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`tracker`]: sequence-ordered per-unit state.

mod builder;
mod config;
mod context;
mod phase;
mod runner;
mod shutdown;
mod supervisor;
mod tracker;
mod unit;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use context::{ShutdownHandle, UnitContext};
pub use phase::{Phase, SupervisorState};
pub use supervisor::{Outcome, StopReport, Supervisor};
pub use tracker::{UnitState, UnitTracker};
pub use unit::{LifecycleUnit, UnitRef};

pub(crate) use runner::panic_message;
