//! # Run one unit's call for one phase.
//!
//! Executes a single lifecycle call with panic isolation and an optional timeout,
//! and publishes the unit events to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   publish UnitDispatched → unit.<phase>() → Ok(())  → publish UnitCompleted
//!
//! Failure:
//!   publish UnitDispatched → unit.<phase>() → Err(e)  → publish UnitFailed
//!
//! Panic:
//!   publish UnitDispatched → unit.<phase>() panics   → Panicked → publish UnitFailed
//!
//! Timeout:
//!   publish UnitDispatched → timeout elapsed          → TimedOut → publish UnitFailed
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `UnitCompleted` or `UnitFailed`
//! - A panic never escapes: it is converted into [`UnitError::Panicked`]
//! - The timed-out call is dropped (its future is cancelled at its next suspension point)

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::{self, Instant};

use crate::core::{LifecycleUnit, Phase, UnitContext};
use crate::error::UnitError;
use crate::events::{Bus, Event, EventKind};

/// The asynchronous entry point of one phase on a unit.
pub(crate) type PhaseCall =
    for<'a> fn(&'a dyn LifecycleUnit, &'a UnitContext) -> BoxFuture<'a, Result<(), UnitError>>;

pub(crate) fn setup_call<'a>(
    unit: &'a dyn LifecycleUnit,
    ctx: &'a UnitContext,
) -> BoxFuture<'a, Result<(), UnitError>> {
    unit.setup(ctx)
}

pub(crate) fn start_call<'a>(
    unit: &'a dyn LifecycleUnit,
    ctx: &'a UnitContext,
) -> BoxFuture<'a, Result<(), UnitError>> {
    unit.start(ctx)
}

pub(crate) fn stop_call<'a>(
    unit: &'a dyn LifecycleUnit,
    ctx: &'a UnitContext,
) -> BoxFuture<'a, Result<(), UnitError>> {
    unit.stop(ctx)
}

/// Executes `call` on `unit`, publishing lifecycle events for `phase` to `bus`.
pub(crate) async fn run_phase(
    unit: &dyn LifecycleUnit,
    ctx: &UnitContext,
    phase: Phase,
    call: PhaseCall,
    timeout: Option<Duration>,
    bus: &Bus,
) -> Result<(), UnitError> {
    bus.publish(
        Event::new(EventKind::UnitDispatched)
            .with_unit(unit.name())
            .with_phase(phase),
    );
    let began = Instant::now();

    let fut = async { call(unit, ctx).await };
    let guarded = AssertUnwindSafe(fut).catch_unwind().map(|res| {
        res.unwrap_or_else(|panic| {
            Err(UnitError::Panicked {
                info: panic_message(panic.as_ref()),
            })
        })
    });

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, guarded).await {
            Ok(r) => r,
            Err(_elapsed) => Err(UnitError::TimedOut { timeout: dur }),
        },
        None => guarded.await,
    };

    let elapsed = began.elapsed();
    match &res {
        Ok(()) => bus.publish(
            Event::new(EventKind::UnitCompleted)
                .with_unit(unit.name())
                .with_phase(phase)
                .with_elapsed(elapsed),
        ),
        Err(e) => bus.publish(
            Event::new(EventKind::UnitFailed)
                .with_unit(unit.name())
                .with_phase(phase)
                .with_reason(e.to_string())
                .with_elapsed(elapsed),
        ),
    }
    res
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
