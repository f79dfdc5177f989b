//! Fixtures shared by unit tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::core::{ShutdownHandle, UnitContext};
use crate::env::{Deployment, Environment, RunMode};
use crate::events::Bus;

/// Environment record rooted at `root`; nothing is created on disk.
pub(crate) fn env_in(root: &Path) -> Environment {
    let data_dir = root.join("data");
    let config_dir = data_dir.join("configs");
    let database_dir = data_dir.join("databases");
    let database_path = database_dir.join("caboose.sqlite");
    Environment {
        run_mode: RunMode::Development,
        deployment: Deployment::Standalone,
        install_dir: root.join("install"),
        content_dir: root.join("content"),
        config_path: config_dir.join("caboose.json"),
        default_config_path: root.join("install").join("assets").join("default.json"),
        plugin_dir: data_dir.join("plugins"),
        log_dir: data_dir.join("logs"),
        database_url: format!("file:{}", database_path.display()),
        database_backend: "sqlite".to_string(),
        database_path,
        database_dir,
        config_dir,
        data_dir,
    }
}

/// Environment for tests that never touch the filesystem.
pub(crate) fn env() -> Arc<Environment> {
    Arc::new(env_in(&std::env::temp_dir().join("caboose-unit-tests")))
}

/// Environment rooted at `root` with every data directory created.
pub(crate) fn provisioned(root: &Path) -> Arc<Environment> {
    let env = env_in(root);
    for dir in [
        &env.content_dir,
        &env.config_dir,
        &env.plugin_dir,
        &env.log_dir,
        &env.database_dir,
    ] {
        fs::create_dir_all(dir).expect("create test directory");
    }
    Arc::new(env)
}

/// Context for driving a single unit outside a supervisor.
pub(crate) fn context(unit: &'static str, env: Arc<Environment>) -> UnitContext {
    UnitContext::new(unit, env, ShutdownHandle::new(Bus::new(16)))
}
