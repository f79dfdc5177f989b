//! # LogWriter — renders lifecycle events through `tracing`
//!
//! A subscriber that turns every [`Event`] into one structured log line.
//! Unit-level progress goes to `debug`, phase and supervisor transitions to
//! `info`, failures to `warn`/`error`.
//!
//! ## Example output
//! ```text
//! DEBUG caboose::events: dispatched unit="storage" phase=setup
//! DEBUG caboose::events: completed unit="storage" phase=setup elapsed_ms=4
//!  INFO caboose::events: phase completed phase=setup elapsed_ms=5
//!  WARN caboose::events: unit failed unit="network-server" phase=start reason="bind 0.0.0.0:3000: address in use"
//!  INFO caboose::events: shutdown requested reason="signal"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "caboose::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let unit = e.unit.as_deref().unwrap_or("-");
        let phase = e.phase.map(|p| p.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::UnitConstructed => {
                debug!(target: TARGET, seq = e.seq, unit, "constructed");
            }
            EventKind::UnitDispatched => {
                debug!(target: TARGET, seq = e.seq, unit, phase, "dispatched");
            }
            EventKind::UnitCompleted => {
                debug!(target: TARGET, seq = e.seq, unit, phase, elapsed_ms = e.elapsed_ms, "completed");
            }
            EventKind::UnitFailed => {
                warn!(target: TARGET, seq = e.seq, unit, phase, reason, "unit failed");
            }
            EventKind::PhaseStarting => {
                debug!(target: TARGET, seq = e.seq, phase, "phase starting");
            }
            EventKind::PhaseCompleted => {
                info!(target: TARGET, seq = e.seq, phase, elapsed_ms = e.elapsed_ms, "phase completed");
            }
            EventKind::PhaseFailed => {
                error!(target: TARGET, seq = e.seq, phase, reason, "phase failed");
            }
            EventKind::Ready => {
                info!(target: TARGET, seq = e.seq, "ready");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, seq = e.seq, unit, reason, "shutdown requested");
            }
            EventKind::SignalIgnored => {
                warn!(target: TARGET, seq = e.seq, "signal ignored; shutdown already in progress");
            }
            EventKind::Stopped => {
                info!(target: TARGET, seq = e.seq, "stopped");
            }
            EventKind::GraceExceeded => {
                error!(target: TARGET, seq = e.seq, stuck = reason, "stop grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, subscriber = unit, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, subscriber = unit, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
