use std::process::ExitCode;
use std::sync::Arc;

use caboose::{Bootstrapper, Caboose, Outcome, RuntimeError, Subscribe, SupervisorConfig, telemetry};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env = match tracing::subscriber::with_default(telemetry::console(), || {
        Bootstrapper::from_process().resolve().inspect_err(|err| {
            error!(label = err.as_label(), "environment setup failed: {err}");
        })
    }) {
        Ok(env) => Arc::new(env),
        Err(_) => return ExitCode::from(1),
    };

    if let Err(err) = telemetry::init(&env) {
        eprintln!("caboose: {err}");
        return ExitCode::from(1);
    }

    #[cfg(feature = "logging")]
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(caboose::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    let subscribers: Vec<Arc<dyn Subscribe>> = Vec::new();

    let app = match Caboose::new(env, SupervisorConfig::default(), subscribers) {
        Ok(app) => app,
        Err(err) => {
            error!(label = err.as_label(), "{}", err.as_message());
            return ExitCode::from(1);
        }
    };

    let res = app.run().await;
    app.close().await;

    match res {
        Ok(Outcome::Signalled) => {
            info!("shut down after termination signal");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Requested { reason }) => {
            info!(%reason, "shut down on request");
            ExitCode::SUCCESS
        }
        Err(err @ RuntimeError::GraceExceeded { .. }) => {
            error!(label = err.as_label(), "{}", err.as_message());
            ExitCode::from(2)
        }
        Err(err) => {
            error!(label = err.as_label(), "{}", err.as_message());
            ExitCode::from(1)
        }
    }
}
