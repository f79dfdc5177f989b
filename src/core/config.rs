//! # Supervisor runtime configuration.
//!
//! Provides [`SupervisorConfig`], the settings of the orchestration engine
//! (not the application settings, which live in the config manager).
//!
//! ## Sentinel values
//! - `phase_timeout = 0s` → no timeout for setup/start (a hung unit stalls the supervisor)
//! - `stop_grace = 0s` → the stop phase is awaited without limit

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `phase_timeout`: Per-unit limit for one setup/start call (`0s` = unbounded)
/// - `stop_grace`: Limit for the whole stop phase (`0s` = unbounded)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
///
/// All fields are public; prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time one unit may spend in `setup` or `start`.
    ///
    /// A unit exceeding it fails the phase with `UnitError::TimedOut`.
    pub phase_timeout: Duration,

    /// Maximum time to wait for the stop phase.
    ///
    /// When exceeded, shutdown returns `RuntimeError::GraceExceeded`
    /// naming the units still stopping.
    pub stop_grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the per-unit phase timeout as an `Option`.
    #[inline]
    pub fn phase_timeout(&self) -> Option<Duration> {
        (self.phase_timeout > Duration::ZERO).then_some(self.phase_timeout)
    }

    /// Returns the stop grace as an `Option`.
    #[inline]
    pub fn stop_grace(&self) -> Option<Duration> {
        (self.stop_grace > Duration::ZERO).then_some(self.stop_grace)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `phase_timeout = 0s` (unbounded)
    /// - `stop_grace = 0s` (unbounded)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            phase_timeout: Duration::ZERO,
            stop_grace: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
