//! # Per-unit context and shutdown requests.
//!
//! A unit never holds the [`Supervisor`](crate::Supervisor). It receives a
//! [`UnitContext`] exposing exactly what it may use:
//! - the immutable [`Environment`] record,
//! - a [`ShutdownHandle`] to ask the supervisor for a controlled shutdown,
//! - its own name (for log fields).
//!
//! ## Shutdown requests
//! ```text
//! unit.setup() ── detects fatal condition ──► ctx.shutdown().request(reason)
//!                                                  ├─► Bus.publish(ShutdownRequested)
//!                                                  └─► token.cancel()
//! Supervisor: next phase barrier sees is_requested() ──► stop phase ──► exit
//!             ready state: requested().await fires   ──► stop phase ──► exit
//! ```
//! Only the first reason is kept; later requests are no-ops.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::env::Environment;
use crate::events::{Bus, Event, EventKind};

/// Cloneable handle used to request a supervisor shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
    reason: Arc<OnceLock<Arc<str>>>,
    bus: Bus,
}

impl ShutdownHandle {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
            bus,
        }
    }

    /// Requests a controlled shutdown of the whole supervisor.
    ///
    /// The first call records `reason`, publishes
    /// [`EventKind::ShutdownRequested`] and wakes the supervisor; later calls do nothing.
    pub fn request(&self, reason: impl Into<Arc<str>>) {
        self.request_from(None, reason.into());
    }

    pub(crate) fn request_from(&self, unit: Option<&'static str>, reason: Arc<str>) {
        if self.reason.set(Arc::clone(&reason)).is_err() {
            return;
        }
        let mut ev = Event::new(EventKind::ShutdownRequested).with_reason(reason);
        if let Some(unit) = unit {
            ev = ev.with_unit(unit);
        }
        self.bus.publish(ev);
        self.token.cancel();
    }

    /// Returns true once a shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when a shutdown has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }

    /// Returns the reason recorded by the first request.
    pub fn reason(&self) -> Option<Arc<str>> {
        self.reason.get().cloned()
    }
}

/// Narrow view of the supervisor handed to one unit.
#[derive(Clone)]
pub struct UnitContext {
    unit: &'static str,
    env: Arc<Environment>,
    shutdown: ShutdownHandle,
}

impl UnitContext {
    pub(crate) fn new(unit: &'static str, env: Arc<Environment>, shutdown: ShutdownHandle) -> Self {
        Self {
            unit,
            env,
            shutdown,
        }
    }

    /// Name of the unit this context belongs to.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// The resolved, read-only environment record.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Handle to the supervisor's shutdown.
    pub fn shutdown(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    /// Requests supervisor shutdown on behalf of this unit.
    pub fn request_shutdown(&self, reason: impl Into<Arc<str>>) {
        self.shutdown.request_from(Some(self.unit), reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reason_wins() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let handle = ShutdownHandle::new(bus);

        handle.request("storage backend unsupported");
        handle.request("second");

        assert!(handle.is_requested());
        handle.requested().await;
        assert_eq!(handle.reason().as_deref(), Some("storage backend unsupported"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ShutdownRequested);
        assert!(rx.try_recv().is_err());
    }
}
