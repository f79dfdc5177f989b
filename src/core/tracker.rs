//! # Unit state tracker with sequence-based ordering.
//!
//! Maintains the last known lifecycle state of every unit, using event
//! sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! phase runner ──► Bus ──► supervisor listener ──► UnitTracker::update()
//!                                                         │
//!                                                         ▼
//!                                              HashMap<String, Entry>
//!                                                (name → {seq, state})
//! ```
//!
//! ## Rules
//! - Only unit events (`UnitConstructed`, `UnitDispatched`, `UnitCompleted`, `UnitFailed`) change state
//! - Read operations (`snapshot`, `state_of`, `stuck_in`) are **eventually consistent**
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::core::Phase;
use crate::events::{Event, EventKind};

/// Last known lifecycle state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// `initialize` ran; no phase dispatched yet.
    Constructed,
    /// `setup` dispatched, not settled.
    SettingUp,
    /// `setup` returned `Ok`.
    SetUp,
    /// `start` dispatched, not settled.
    Starting,
    /// `start` returned `Ok`.
    Started,
    /// `stop` dispatched, not settled.
    Stopping,
    /// `stop` returned `Ok`.
    Stopped,
    /// The last dispatched phase failed.
    Failed(Phase),
}

#[derive(Debug, Clone)]
struct Entry {
    last_seq: u64,
    state: UnitState,
}

/// Thread-safe tracker of unit lifecycle states.
///
/// ### Responsibilities
/// - Names the units still stopping when the stop grace is exceeded
/// - Lets embedders and tests inspect per-unit progress
///
/// ### Rules
/// - **Ordering**: events with `seq <= last_seq` are rejected
#[derive(Default)]
pub struct UnitTracker {
    state: RwLock<HashMap<String, Entry>>,
}

impl UnitTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates unit state if the event is newer than the last one seen for that unit.
    ///
    /// Returns `true` if the state changed.
    ///
    /// ### State transitions
    /// - `UnitConstructed` → `Constructed`
    /// - `UnitDispatched(setup|start|stop)` → `SettingUp` | `Starting` | `Stopping`
    /// - `UnitCompleted(setup|start|stop)` → `SetUp` | `Started` | `Stopped`
    /// - `UnitFailed(phase)` → `Failed(phase)`
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.unit.as_deref() else {
            return false;
        };
        let Some(next) = transition(ev) else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(Entry {
            last_seq: 0,
            state: UnitState::Constructed,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        entry.state = next;
        true
    }

    /// Returns the last known state of a unit.
    pub async fn state_of(&self, name: &str) -> Option<UnitState> {
        self.state.read().await.get(name).map(|e| e.state)
    }

    /// Returns all units and their states, sorted by name.
    pub async fn snapshot(&self) -> Vec<(String, UnitState)> {
        let state = self.state.read().await;
        let mut all: Vec<(String, UnitState)> = state
            .iter()
            .map(|(name, e)| (name.clone(), e.state))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Returns sorted names of units dispatched into `phase` that have not settled it.
    pub async fn stuck_in(&self, phase: Phase) -> Vec<String> {
        let in_progress = match phase {
            Phase::Setup => UnitState::SettingUp,
            Phase::Start => UnitState::Starting,
            Phase::Stop => UnitState::Stopping,
            Phase::Construct => return Vec::new(),
        };
        let state = self.state.read().await;
        let mut stuck: Vec<String> = state
            .iter()
            .filter(|(_, e)| e.state == in_progress)
            .map(|(name, _)| name.clone())
            .collect();
        stuck.sort_unstable();
        stuck
    }
}

fn transition(ev: &Event) -> Option<UnitState> {
    match (ev.kind, ev.phase) {
        (EventKind::UnitConstructed, _) => Some(UnitState::Constructed),
        (EventKind::UnitDispatched, Some(Phase::Setup)) => Some(UnitState::SettingUp),
        (EventKind::UnitDispatched, Some(Phase::Start)) => Some(UnitState::Starting),
        (EventKind::UnitDispatched, Some(Phase::Stop)) => Some(UnitState::Stopping),
        (EventKind::UnitCompleted, Some(Phase::Setup)) => Some(UnitState::SetUp),
        (EventKind::UnitCompleted, Some(Phase::Start)) => Some(UnitState::Started),
        (EventKind::UnitCompleted, Some(Phase::Stop)) => Some(UnitState::Stopped),
        (EventKind::UnitFailed, Some(phase)) => Some(UnitState::Failed(phase)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_event(kind: EventKind, phase: Phase) -> Event {
        Event::new(kind).with_unit("storage").with_phase(phase)
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = UnitTracker::new();
        let dispatched = unit_event(EventKind::UnitDispatched, Phase::Stop);
        let completed = unit_event(EventKind::UnitCompleted, Phase::Stop);

        assert!(tracker.update(&completed).await);
        assert!(!tracker.update(&dispatched).await);
        assert_eq!(tracker.state_of("storage").await, Some(UnitState::Stopped));
    }

    #[tokio::test]
    async fn stuck_lists_only_units_in_progress() {
        let tracker = UnitTracker::new();
        tracker
            .update(&unit_event(EventKind::UnitDispatched, Phase::Stop))
            .await;
        tracker
            .update(
                &Event::new(EventKind::UnitCompleted)
                    .with_unit("config")
                    .with_phase(Phase::Stop),
            )
            .await;

        assert_eq!(tracker.stuck_in(Phase::Stop).await, vec!["storage".to_string()]);
        assert!(tracker.stuck_in(Phase::Start).await.is_empty());
    }

    #[tokio::test]
    async fn failures_record_their_phase() {
        let tracker = UnitTracker::new();
        tracker
            .update(&unit_event(EventKind::UnitFailed, Phase::Setup))
            .await;
        assert_eq!(
            tracker.snapshot().await,
            vec![("storage".to_string(), UnitState::Failed(Phase::Setup))]
        );
    }
}
