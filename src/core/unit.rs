//! # Lifecycle unit abstraction.
//!
//! Every subsystem manager implements [`LifecycleUnit`]: a synchronous
//! `initialize` followed by three asynchronous phases (`setup`, `start`, `stop`).
//! Every operation defaults to a no-op, so a unit only overrides what it needs.
//!
//! Units are shared as [`UnitRef`] (`Arc<dyn LifecycleUnit>`) and invoked through
//! `&self` while their siblings run concurrently; state that a phase produces is
//! kept behind interior mutability (`OnceLock`, `tokio::sync::Mutex`).
//!
//! ## Rules
//! - `initialize` performs in-memory work only; anything that can fail on I/O belongs in `setup`
//! - `start` returns only once activation fully succeeded or fully failed
//! - `stop` releases what `setup`/`start` acquired and is a no-op when nothing was acquired

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::UnitContext;
use crate::error::UnitError;

/// # Subsystem managed by the supervisor.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use caboose::{LifecycleUnit, UnitContext, UnitError};
///
/// struct Cache;
///
/// #[async_trait]
/// impl LifecycleUnit for Cache {
///     fn name(&self) -> &'static str { "cache" }
///
///     async fn setup(&self, ctx: &UnitContext) -> Result<(), UnitError> {
///         let _data_dir = &ctx.env().data_dir;
///         // warm up...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleUnit: Send + Sync + 'static {
    /// Returns a stable, unique unit name.
    fn name(&self) -> &'static str;

    /// Synchronous in-memory initialization, run once while the supervisor is built.
    fn initialize(&self, _ctx: &UnitContext) {}

    /// One-time asynchronous preparation.
    async fn setup(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        Ok(())
    }

    /// Long-running activation.
    async fn start(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        Ok(())
    }

    /// Releases every resource acquired by `setup`/`start`.
    async fn stop(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        Ok(())
    }
}

/// Shared handle to a lifecycle unit.
pub type UnitRef = Arc<dyn LifecycleUnit>;
