//! # Lifecycle phases and supervisor states.
//!
//! ```text
//! construct ──► setup ──► start ──► (ready) ──► stop
//!   (sync)     (fan-out)  (fan-out)             (fan-out, best-effort)
//! ```
//!
//! Phases run strictly in this order. Inside one phase every unit runs
//! concurrently and the phase ends only when all of them settled.

use std::fmt;

/// One step of the unit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Synchronous in-memory initialization, run while the supervisor is built.
    Construct,
    /// One-time asynchronous preparation.
    Setup,
    /// Long-running activation (bind sockets, open connections).
    Start,
    /// Release of everything acquired by setup/start.
    Stop,
}

impl Phase {
    /// Returns the lowercase phase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Construct => "construct",
            Phase::Setup => "setup",
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global state of a [`Supervisor`](crate::Supervisor).
///
/// Observable through [`Supervisor::watch_state`](crate::Supervisor::watch_state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Units are registered and initialized; no phase has run yet.
    Constructed,
    /// The setup phase is in progress.
    SettingUp,
    /// The start phase is in progress.
    Starting,
    /// All units started; waiting for a termination signal or shutdown request.
    Ready,
    /// The stop phase is in progress.
    Stopping,
    /// The stop phase completed.
    Stopped,
}
