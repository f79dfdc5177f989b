use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    context::{ShutdownHandle, UnitContext},
    supervisor::{Slot, Supervisor},
    tracker::UnitTracker,
};
use crate::{
    core::{Phase, SupervisorConfig, UnitRef},
    env::Environment,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`] with a fixed, ordered set of units.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    env: Arc<Environment>,
    units: Vec<UnitRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and environment record.
    pub fn new(cfg: SupervisorConfig, env: Arc<Environment>) -> Self {
        Self {
            cfg,
            env,
            units: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Appends a unit to the registry.
    ///
    /// Registration order is the order of `initialize` calls and of the
    /// failure lists; it cannot change once the supervisor is built.
    pub fn register(mut self, unit: UnitRef) -> Self {
        self.units.push(unit);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and runs the construct phase.
    ///
    /// Must be called from within a Tokio runtime. Wires the event bus, the
    /// subscriber workers and the unit tracker, then calls `initialize` on
    /// every unit in registration order.
    ///
    /// Returns [`RuntimeError::DuplicateUnit`] if two units share a name.
    pub fn build(self) -> Result<Supervisor, RuntimeError> {
        let Self {
            cfg,
            env,
            units,
            subscribers,
        } = self;

        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if !seen.insert(unit.name()) {
                return Err(RuntimeError::DuplicateUnit { name: unit.name() });
            }
        }

        let bus = Bus::new(cfg.bus_capacity_clamped());
        let tracker = Arc::new(UnitTracker::new());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let listener_token = CancellationToken::new();
        let listener = spawn_listener(&bus, Arc::clone(&tracker), subs, listener_token.clone());

        let requests = ShutdownHandle::new(bus.clone());
        let slots: Box<[Slot]> = units
            .into_iter()
            .map(|unit| {
                let ctx = UnitContext::new(unit.name(), Arc::clone(&env), requests.clone());
                Slot { unit, ctx }
            })
            .collect();

        for slot in slots.iter() {
            slot.unit.initialize(&slot.ctx);
            debug!(unit = slot.unit.name(), "unit constructed");
            bus.publish(
                Event::new(EventKind::UnitConstructed)
                    .with_unit(slot.unit.name())
                    .with_phase(Phase::Construct),
            );
        }

        Ok(Supervisor::new_internal(
            cfg,
            bus,
            tracker,
            slots,
            requests,
            listener_token,
            listener,
        ))
    }
}

/// Forwards bus events to the tracker and the subscriber set until `token` is cancelled.
///
/// Pending events are drained before the token is honoured; the subscriber
/// workers are then shut down so their queues are flushed too.
fn spawn_listener(
    bus: &Bus,
    tracker: Arc<UnitTracker>,
    subs: SubscriberSet,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => {
                        tracker.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        subs.shutdown().await;
    })
}
