//! # Lifecycle events emitted by the supervisor and its phase runner.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Unit events**: one unit's progress through a phase (dispatched, completed, failed)
//! - **Phase events**: a phase as a whole (starting, completed, failed)
//! - **Supervisor events**: readiness, shutdown requests, ignored signals, final stop
//! - **Delivery events**: subscriber overflow or panic
//!
//! The [`Event`] struct carries additional metadata such as timestamps, unit name,
//! phase, reasons and elapsed time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use caboose::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::UnitFailed)
//!     .with_unit("storage")
//!     .with_phase(Phase::Setup)
//!     .with_reason("unsupported storage backend \"postgres\"")
//!     .with_elapsed(Duration::from_millis(3));
//!
//! assert_eq!(ev.kind, EventKind::UnitFailed);
//! assert_eq!(ev.unit.as_deref(), Some("storage"));
//! assert_eq!(ev.phase, Some(Phase::Setup));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Delivery events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `unit`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Unit events ===
    /// Unit finished its synchronous `initialize` while the supervisor was built.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `phase`: `Construct`
    UnitConstructed,

    /// Unit's phase call was dispatched (fan-out).
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `phase`: phase being run
    UnitDispatched,

    /// Unit's phase call returned `Ok`.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `phase`: phase that completed
    /// - `elapsed_ms`: time spent in the call
    UnitCompleted,

    /// Unit's phase call returned an error, panicked or timed out.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `phase`: phase that failed
    /// - `reason`: error message
    /// - `elapsed_ms`: time spent in the call
    UnitFailed,

    // === Phase events ===
    /// A phase is about to fan out to every unit.
    ///
    /// Sets:
    /// - `phase`: phase being started
    PhaseStarting,

    /// Every unit settled the phase successfully (join-all barrier passed).
    ///
    /// Sets:
    /// - `phase`: phase that completed
    /// - `elapsed_ms`: wall time of the whole phase
    PhaseCompleted,

    /// Every unit settled the phase and at least one failed.
    ///
    /// Sets:
    /// - `phase`: phase that failed
    /// - `reason`: rendered list of failures
    /// - `elapsed_ms`: wall time of the whole phase
    PhaseFailed,

    // === Supervisor events ===
    /// All units started; the supervisor is ready.
    Ready,

    /// Shutdown was requested (termination signal or a unit request).
    ///
    /// Sets:
    /// - `unit`: requesting unit, when a unit asked for it
    /// - `reason`: why shutdown was requested
    ShutdownRequested,

    /// A termination signal arrived while shutdown was already in progress.
    SignalIgnored,

    /// The stop phase finished; the process may exit.
    Stopped,

    /// The stop phase exceeded the configured grace period.
    ///
    /// Sets:
    /// - `reason`: names of the units still stopping
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the unit (or subscriber), if applicable.
    pub unit: Option<Arc<str>>,
    /// Phase the event belongs to, if applicable.
    pub phase: Option<Phase>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Elapsed time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            phase: None,
            reason: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_unit(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_unit(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let first = Event::new(EventKind::PhaseStarting);
        let second = Event::new(EventKind::PhaseCompleted);
        assert!(second.seq > first.seq);
    }

    #[test]
    fn elapsed_is_clamped_to_u32() {
        let ev = Event::new(EventKind::UnitCompleted).with_elapsed(Duration::from_secs(u64::MAX));
        assert_eq!(ev.elapsed_ms, Some(u32::MAX));
    }
}
