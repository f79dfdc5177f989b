//! # Storage manager (dispatcher).
//!
//! Selects exactly one backend from the environment's storage discriminator
//! and forwards every lifecycle call to it.
//!
//! ```text
//! initialize: env.database_backend ──► backend name
//! setup:      name ──► StorageBackend::from_str ──┬─► Sqlite ──► SqliteStore::{initialize, setup}
//!                                                 └─► unsupported ──► error! + request_shutdown + Ok
//! start/stop: forward to the selected delegate (stop without delegate: no-op)
//! ```
//!
//! An unsupported backend is not a setup failure: the shutdown request is
//! honoured at the setup barrier, so start never runs and the process exits
//! cleanly.
//!
//! The backend is selected once; a later `setup` reuses the first delegate.

mod sqlite;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::core::{LifecycleUnit, UnitContext};
use crate::error::UnitError;
use crate::managers::ConfigManager;

pub use sqlite::SqliteStore;

/// Closed set of storage backends this build supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = UnitError;

    /// Parses a discriminator, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => Err(UnitError::Unsupported {
                what: "storage backend",
                value: s.to_string(),
            }),
        }
    }
}

enum Delegate {
    Sqlite(Arc<SqliteStore>),
}

impl Delegate {
    fn build(backend: StorageBackend, config: &Arc<ConfigManager>) -> Self {
        match backend {
            StorageBackend::Sqlite => Delegate::Sqlite(Arc::new(SqliteStore::new(Arc::clone(config)))),
        }
    }

    fn unit(&self) -> &dyn LifecycleUnit {
        match self {
            Delegate::Sqlite(store) => store.as_ref(),
        }
    }

    fn backend(&self) -> StorageBackend {
        match self {
            Delegate::Sqlite(_) => StorageBackend::Sqlite,
        }
    }
}

/// Lifecycle unit dispatching to the configured storage backend.
pub struct StorageManager {
    config: Arc<ConfigManager>,
    backend_name: OnceLock<String>,
    delegate: OnceLock<Delegate>,
}

impl StorageManager {
    /// Creates a dispatcher reading locations from `config`.
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self {
            config,
            backend_name: OnceLock::new(),
            delegate: OnceLock::new(),
        }
    }

    /// The selected backend, once setup ran.
    pub fn backend(&self) -> Option<StorageBackend> {
        self.delegate.get().map(Delegate::backend)
    }

    /// The SQLite delegate, if that backend was selected.
    pub fn sqlite(&self) -> Option<&Arc<SqliteStore>> {
        match self.delegate.get()? {
            Delegate::Sqlite(store) => Some(store),
        }
    }
}

#[async_trait]
impl LifecycleUnit for StorageManager {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn initialize(&self, ctx: &UnitContext) {
        let _ = self.backend_name.set(ctx.env().database_backend.clone());
    }

    async fn setup(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        let name = self.backend_name.get().ok_or(UnitError::NotReady {
            what: "storage backend",
        })?;
        let backend = match name.parse::<StorageBackend>() {
            Ok(backend) => backend,
            Err(err) => {
                error!(backend = %name, error = %err, "storage backend not supported; shutting down");
                ctx.request_shutdown(format!("unsupported storage backend {name:?}"));
                return Ok(());
            }
        };

        let delegate = self.delegate.get_or_init(|| {
            let delegate = Delegate::build(backend, &self.config);
            delegate.unit().initialize(ctx);
            delegate
        });
        info!(backend = %delegate.backend(), "storage backend selected");
        delegate.unit().setup(ctx).await
    }

    async fn start(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        let delegate = self.delegate.get().ok_or(UnitError::NotReady {
            what: "storage backend",
        })?;
        delegate.unit().start(ctx).await
    }

    async fn stop(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        match self.delegate.get() {
            Some(delegate) => delegate.unit().stop(ctx).await,
            None => {
                debug!("no storage backend selected; nothing to stop");
                Ok(())
            }
        }
    }
}
