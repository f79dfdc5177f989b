//! # Application wiring.
//!
//! [`Caboose`] builds the four managers, hands each the handles it needs and
//! registers them with a [`Supervisor`] in a fixed order:
//!
//! ```text
//! config ──► storage ──► network ──► extensions
//!   ▲           │           │            │
//!   └───────────┴───────────┴────────────┘   Arc<ConfigManager> shared by the others
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::core::{Outcome, StopReport, Supervisor, SupervisorConfig};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::managers::{ConfigManager, ExtensionManager, NetworkServerManager, StorageManager};
use crate::subscribers::Subscribe;

/// The application supervisor with named access to each manager.
pub struct Caboose {
    config: Arc<ConfigManager>,
    storage: Arc<StorageManager>,
    network: Arc<NetworkServerManager>,
    extensions: Arc<ExtensionManager>,
    supervisor: Supervisor,
}

impl Caboose {
    /// Builds the managers and the supervisor, running every `initialize`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        env: Arc<Environment>,
        cfg: SupervisorConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, RuntimeError> {
        let config = Arc::new(ConfigManager::new());
        let storage = Arc::new(StorageManager::new(Arc::clone(&config)));
        let network = Arc::new(NetworkServerManager::new(Arc::clone(&config)));
        let extensions = Arc::new(ExtensionManager::new(Arc::clone(&config)));

        let supervisor = Supervisor::builder(cfg, env)
            .with_subscribers(subscribers)
            .register(config.clone())
            .register(storage.clone())
            .register(network.clone())
            .register(extensions.clone())
            .build()?;

        Ok(Self {
            config,
            storage,
            network,
            extensions,
            supervisor,
        })
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn storage_manager(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn network_server_manager(&self) -> &Arc<NetworkServerManager> {
        &self.network
    }

    pub fn extension_manager(&self) -> &Arc<ExtensionManager> {
        &self.extensions
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Runs until a termination signal or a shutdown request; see [`Supervisor::run`].
    pub async fn run(&self) -> Result<Outcome, RuntimeError> {
        self.supervisor.run().await
    }

    /// Runs until `terminate` completes or shutdown is requested; see [`Supervisor::run_until`].
    pub async fn run_until<F>(&self, terminate: F) -> Result<Outcome, RuntimeError>
    where
        F: Future<Output = ()>,
    {
        self.supervisor.run_until(terminate).await
    }

    /// Stops every manager once; see [`Supervisor::shutdown`].
    pub async fn shutdown(&self) -> Result<StopReport, RuntimeError> {
        self.supervisor.shutdown().await
    }

    /// Flushes pending lifecycle events to the subscribers.
    pub async fn close(self) {
        self.supervisor.close().await;
    }
}
