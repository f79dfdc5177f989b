//! # Cross-platform OS signal handling.
//!
//! Provides [`ShutdownSignals`], installed once by [`Supervisor::run`](crate::Supervisor::run)
//! and awaited repeatedly: the first signal starts shutdown, later ones are
//! reported as ignored.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

/// Installed termination signal listeners.
#[cfg(unix)]
pub struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Registers the listeners.
    ///
    /// Returns `Err` if signal registration fails.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next termination signal.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv()  => {},
            _ = self.sigterm.recv() => {},
            _ = self.sigquit.recv() => {},
        }
    }
}

/// Installed termination signal listeners.
#[cfg(not(unix))]
pub struct ShutdownSignals {
    _priv: (),
}

#[cfg(not(unix))]
impl ShutdownSignals {
    /// Registers the listeners.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self { _priv: () })
    }

    /// Waits for the next termination signal.
    pub async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
