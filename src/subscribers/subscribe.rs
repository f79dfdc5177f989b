//! # Lifecycle event subscribers
//!
//! A [`Subscribe`] implementation observes the lifecycle events the supervisor
//! publishes while it drives units through setup, start and stop: unit
//! dispatch and completion, phase barriers, shutdown requests, readiness.
//!
//! Subscribers are passive. They cannot fail a phase or delay a barrier; the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet) feeds each one from its
//! own bounded queue and drains it when the supervisor closes.
//!
//! ## Filtering
//! [`Subscribe::wants`] is checked before an event is queued, so a subscriber
//! interested only in failures never spends queue capacity on the rest.
//!
//! ## Example
//! ```rust
//! use caboose::{Event, EventKind, Subscribe};
//!
//! /// Counts failed unit calls per phase.
//! struct FailureAudit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for FailureAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         eprintln!("{:?} failed in {:?}: {:?}", ev.unit, ev.phase, ev.reason);
//!     }
//!     fn wants(&self, kind: EventKind) -> bool {
//!         matches!(kind, EventKind::UnitFailed | EventKind::PhaseFailed)
//!     }
//!     fn name(&self) -> &'static str { "failure-audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one lifecycle event, on this subscriber's worker task.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be queued for this subscriber.
    fn wants(&self, _kind: EventKind) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity; overflowing events are dropped for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
