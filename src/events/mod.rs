//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted while the supervisor drives its units.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, the phase runner, `ShutdownHandle`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor listener (updates `UnitTracker`, fans out
//!   to `SubscriberSet`) and any receiver obtained from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
