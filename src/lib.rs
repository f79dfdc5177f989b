//! # caboose
//!
//! **Caboose** is a process supervisor that bootstraps a fixed set of
//! subsystem managers (configuration, storage, network server, extensions)
//! and drives them through a uniform phased lifecycle.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  process start
//!       │
//!       ▼
//! ┌──────────────────┐   fatal on error
//! │   Bootstrapper   │──────────────────► exit 1
//! │ (env + dirs)     │
//! └────────┬─────────┘
//!          │ Arc<Environment> (read-only)
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - ordered registry of LifecycleUnits (fixed at build)            │
//! │  - Bus (broadcast lifecycle events)                               │
//! │  - UnitTracker (per-unit state, sequence ordered)                 │
//! │  - SubscriberSet (fans out to LogWriter / custom subscribers)     │
//! │  - ShutdownHandle (first request wins)                            │
//! └──────┬──────────────┬──────────────┬──────────────┬───────────────┘
//!        ▼              ▼              ▼              ▼
//!   ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//!   │ config  │◄──│ storage  │   │ network  │   │ extensions │
//!   └─────────┘   └────┬─────┘   └──────────┘   └────────────┘
//!        ▲             ▼               │               │
//!        │         SqliteStore         │               │
//!        └─────────────────────────────┴───────────────┘
//!                     Arc<ConfigManager>
//! ```
//!
//! ### Lifecycle
//! ```text
//! build():   initialize() × N, in registration order          (construct, sync)
//! run():     setup()  × N  ── fan-out / join-all barrier ──┐
//!            start()  × N  ── fan-out / join-all barrier ──┤ failure or request ─► stop
//!            Ready ── termination signal | shutdown request ┘
//!            stop()   × N  ── fan-out / join-all, best-effort, exactly once
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                           |
//! |-------------------|-------------------------------------------------------------------|----------------------------------------------|
//! | **Units**         | Four-phase contract every subsystem implements.                   | [`LifecycleUnit`], [`UnitContext`]           |
//! | **Supervision**   | Phase fan-out, readiness, signals, exactly-once shutdown.         | [`Supervisor`], [`SupervisorBuilder`]        |
//! | **Environment**   | Resolve and provision run mode and directory layout.              | [`Bootstrapper`], [`Environment`]            |
//! | **Managers**      | Config, storage dispatcher, HTTP server, extensions.              | [`Caboose`], [`managers`]                    |
//! | **Events**        | Lifecycle events on a broadcast bus, subscriber fan-out.          | [`Event`], [`Subscribe`]                     |
//! | **Errors**        | Typed errors for bootstrap, units and the runtime.                | [`BootstrapError`], [`UnitError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use caboose::{Bootstrapper, Caboose, SupervisorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let env = Arc::new(Bootstrapper::from_process().resolve()?);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn caboose::Subscribe>> = vec![Arc::new(caboose::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn caboose::Subscribe>> = Vec::new();
//!
//!     let app = Caboose::new(env, SupervisorConfig::default(), subs)?;
//!     let outcome = app.run().await?;
//!     println!("stopped: {outcome:?}");
//!     app.close().await;
//!     Ok(())
//! }
//! ```
mod app;
mod core;
mod env;
mod error;
mod events;
pub mod managers;
mod subscribers;
pub mod telemetry;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use app::Caboose;
pub use crate::core::{
    LifecycleUnit, Outcome, Phase, ShutdownHandle, StopReport, Supervisor, SupervisorBuilder,
    SupervisorConfig, SupervisorState, UnitContext, UnitRef, UnitState, UnitTracker,
};
pub use env::{Bootstrapper, Deployment, Environment, Platform, RunMode};
pub use error::{BootstrapError, RuntimeError, UnitError, UnitFailure};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
