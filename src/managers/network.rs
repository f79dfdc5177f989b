//! # Network server manager.
//!
//! Serves the HTTP endpoint with `axum`. The route table is built in `setup`,
//! the socket is bound in `start` (which returns only after the bind
//! succeeded or failed) and `stop` drains the server gracefully.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{LifecycleUnit, UnitContext};
use crate::error::UnitError;
use crate::managers::ConfigManager;

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Lifecycle unit owning the HTTP listener.
pub struct NetworkServerManager {
    config: Arc<ConfigManager>,
    router: OnceLock<Router>,
    local_addr: OnceLock<SocketAddr>,
    running: Mutex<Option<Running>>,
}

impl NetworkServerManager {
    /// Creates a server reading its endpoint from `config`.
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self {
            config,
            router: OnceLock::new(),
            local_addr: OnceLock::new(),
            running: Mutex::new(None),
        }
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

fn routes() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health))
}

async fn hello() -> Json<Value> {
    Json(json!({ "hello": "world" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[async_trait]
impl LifecycleUnit for NetworkServerManager {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn setup(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        self.router.get_or_init(routes);
        debug!("routes registered");
        Ok(())
    }

    async fn start(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let router = self
            .router
            .get()
            .cloned()
            .ok_or(UnitError::NotReady { what: "router" })?;
        let server = &self.config.settings()?.server;
        let endpoint = format!("{}:{}", server.host, server.port);

        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }
        let listener = TcpListener::bind(&endpoint)
            .await
            .map_err(|e| UnitError::io(format!("binding {endpoint}"), e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| UnitError::io("reading bound address", e))?;
        let _ = self.local_addr.set(addr);

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });
        *running = Some(Running { shutdown: tx, task });
        info!(%addr, "network server listening");
        Ok(())
    }

    async fn stop(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let Some(Running { shutdown, task }) = self.running.lock().await.take() else {
            debug!("network server never started; nothing to stop");
            return Ok(());
        };
        if shutdown.send(()).is_err() {
            warn!("network server already exited");
        }
        match task.await {
            Ok(Ok(())) => {
                info!("network server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(UnitError::io("serving http", e)),
            Err(e) => Err(UnitError::Fatal {
                reason: format!("network server task failed: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::test_support;

    async fn get_body(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read");
        response
    }

    #[tokio::test]
    async fn serves_routes_until_stopped() {
        let tmp = TempDir::new().expect("tempdir");
        let env = test_support::provisioned(tmp.path());
        std::fs::write(
            &env.config_path,
            r#"{"server":{"host":"127.0.0.1","port":0}}"#,
        )
        .expect("config");
        let ctx = test_support::context("network", env);

        let config = Arc::new(ConfigManager::new());
        config.initialize(&ctx);
        config.setup(&ctx).await.expect("config setup");

        let network = NetworkServerManager::new(config);
        network.setup(&ctx).await.expect("setup");
        network.start(&ctx).await.expect("start");
        let addr = network.local_addr().expect("bound");

        let health = get_body(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"), "{health}");
        assert!(health.contains(r#"{"status":"ok"}"#), "{health}");
        assert!(get_body(addr, "/").await.contains(r#"{"hello":"world"}"#));

        network.stop(&ctx).await.expect("stop");
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let network = NetworkServerManager::new(Arc::new(ConfigManager::new()));
        let ctx = test_support::context("network", test_support::env());
        network.stop(&ctx).await.expect("stop");
    }

    #[tokio::test]
    async fn start_requires_settings() {
        let network = NetworkServerManager::new(Arc::new(ConfigManager::new()));
        let ctx = test_support::context("network", test_support::env());
        network.setup(&ctx).await.expect("setup");
        let err = network.start(&ctx).await.expect_err("no settings");
        assert!(matches!(err, UnitError::NotReady { what: "settings" }));
    }
}
