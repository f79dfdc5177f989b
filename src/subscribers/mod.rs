//! # Event subscribers for the caboose supervisor.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   phase runner ── publish(Event) ──► Bus ──► supervisor listener
//!                                                   │
//!                                                   ├──► UnitTracker::update(&Event)
//!                                                   └──► SubscriberSet::emit(&Event)
//!                                                            │
//!                                                  ┌─────────┼─────────┐
//!                                                  ▼         ▼         ▼
//!                                              LogWriter   Custom     ...
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
