use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use caboose::{
    Bootstrapper, Caboose, Deployment, Environment, Event, EventKind, Outcome, Phase, Subscribe,
    SupervisorConfig, SupervisorState, UnitError,
};
use tempfile::TempDir;
use tokio::net::TcpStream;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(EventKind, Option<String>, Option<Phase>)>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen
            .lock()
            .expect("recorder")
            .push((ev.kind, ev.unit.as_deref().map(str::to_string), ev.phase));
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.seen.lock().expect("recorder").iter().map(|e| e.0).collect()
    }

    fn completed_in(&self, phase: Phase) -> Vec<String> {
        let mut units: Vec<String> = self
            .seen
            .lock()
            .expect("recorder")
            .iter()
            .filter(|e| e.0 == EventKind::UnitCompleted && e.2 == Some(phase))
            .filter_map(|e| e.1.clone())
            .collect();
        units.sort();
        units
    }
}

fn resolve(root: &Path, backend: &str) -> Arc<Environment> {
    std::fs::create_dir_all(root.join("content")).expect("content dir");
    let vars = vec![
        ("CABOOSE_SERVER_ENV", "development".to_string()),
        ("CABOOSE_CONTENT_DIR", root.join("content").display().to_string()),
        ("CABOOSE_DATA_DIR", root.join("data").display().to_string()),
        ("CABOOSE_INSTALL_DIR", root.join("install").display().to_string()),
        ("CABOOSE_DATABASE_TYPE", backend.to_string()),
    ];
    let env = Bootstrapper::new(vars)
        .with_deployment(Deployment::Standalone)
        .resolve()
        .expect("environment");
    std::fs::write(
        &env.config_path,
        r#"{"server":{"host":"127.0.0.1","port":0},"extensions":{"enabled":true}}"#,
    )
    .expect("config");
    Arc::new(env)
}

fn app(env: Arc<Environment>, recorder: &Arc<Recorder>) -> Caboose {
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    Caboose::new(env, SupervisorConfig::default(), subs).expect("app")
}

#[tokio::test]
async fn termination_when_ready_stops_all_four_managers() {
    let tmp = TempDir::new().expect("tempdir");
    let env = resolve(tmp.path(), "sqlite");
    let recorder = Arc::new(Recorder::default());
    let app = app(Arc::clone(&env), &recorder);

    assert_eq!(
        app.supervisor().units(),
        vec!["config", "storage", "network", "extensions"]
    );

    let mut states = app.supervisor().watch_state();
    let terminate = async move {
        states
            .wait_for(|s| *s == SupervisorState::Ready)
            .await
            .expect("ready");
    };

    let network = Arc::clone(app.network_server_manager());
    let outcome = app.run_until(terminate).await.expect("clean shutdown");
    assert_eq!(outcome, Outcome::Signalled);
    assert_eq!(app.supervisor().state(), SupervisorState::Stopped);

    let addr = network.local_addr().expect("server was bound");
    assert!(TcpStream::connect(addr).await.is_err(), "listener released");
    assert!(env.database_path.is_file());
    assert!(env.config_path.is_file());

    let store = Arc::clone(app.storage_manager().sqlite().expect("sqlite selected"));
    assert!(matches!(
        store.meta("schema_version").await,
        Err(UnitError::NotReady { .. })
    ));

    app.close().await;
    assert_eq!(
        recorder.completed_in(Phase::Stop),
        vec!["config", "extensions", "network", "storage"]
    );
    let kinds = recorder.kinds();
    let ready = kinds.iter().position(|k| *k == EventKind::Ready).expect("ready");
    let stopped = kinds.iter().position(|k| *k == EventKind::Stopped).expect("stopped");
    assert!(ready < stopped);
}

#[tokio::test]
async fn unsupported_storage_backend_ends_stopped_not_started() {
    let tmp = TempDir::new().expect("tempdir");
    let env = resolve(tmp.path(), "postgres");
    let recorder = Arc::new(Recorder::default());
    let app = app(env, &recorder);

    let outcome = app
        .run_until(std::future::pending())
        .await
        .expect("unsupported backend is a requested shutdown, not a failure");
    assert_eq!(
        outcome,
        Outcome::Requested {
            reason: Arc::from("unsupported storage backend \"postgres\"")
        }
    );

    let sup = app.supervisor();
    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert!(app.storage_manager().backend().is_none());
    assert!(app.network_server_manager().local_addr().is_none());
    assert!(app.extension_manager().active().await.is_empty());

    app.close().await;
    let kinds = recorder.kinds();
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert!(!kinds.contains(&EventKind::Ready));
    assert!(!kinds.contains(&EventKind::PhaseFailed));
    assert!(
        recorder.completed_in(Phase::Start).is_empty(),
        "start is gated at the setup barrier"
    );
    assert_eq!(
        recorder.completed_in(Phase::Stop),
        vec!["config", "extensions", "network", "storage"],
        "stop reaches every unit"
    );
}

#[tokio::test]
async fn requested_shutdown_when_ready_is_a_clean_exit() {
    let tmp = TempDir::new().expect("tempdir");
    let env = resolve(tmp.path(), "sqlite");
    let recorder = Arc::new(Recorder::default());
    let app = app(env, &recorder);

    let handle = app.supervisor().shutdown_handle();
    let mut states = app.supervisor().watch_state();
    tokio::spawn(async move {
        if states.wait_for(|s| *s == SupervisorState::Ready).await.is_ok() {
            handle.request("operator");
        }
    });

    let outcome = app
        .run_until(std::future::pending())
        .await
        .expect("clean shutdown");
    assert_eq!(
        outcome,
        Outcome::Requested {
            reason: Arc::from("operator")
        }
    );

    let report = app.shutdown().await.expect("already stopped");
    assert!(report.is_clean());
    app.close().await;
}
