//! # Environment bootstrapper.
//!
//! Resolves the [`Environment`] record from environment variables and the
//! filesystem, creating the data layout on the way.
//!
//! ## Resolution order
//! ```text
//! CABOOSE_SERVER_ENV ──► run mode (required)
//! deployment         ──► containerized | standalone (detected)
//! CABOOSE_INSTALL_DIR ─► install dir (default: directory of the executable)
//! CABOOSE_CONTENT_DIR ─► content dir | containerized: <install>/../content | else fatal
//! CABOOSE_DATA_DIR ────► data dir    | containerized: <install>/../data
//!                                    | windows:  %LOCALAPPDATA%/Caboose (variable required)
//!                                    | other:    <platform local data dir>/Caboose
//! data dir ──► configs/ plugins/ logs/ databases/   (created, write-probed)
//! CABOOSE_DATABASE_TYPE ─► storage backend discriminator (default "sqlite")
//! ```
//!
//! ## Rules
//! - Deterministic for a given set of variables and filesystem state
//! - Returns either a complete record or a [`BootstrapError`]; callers treat the error as fatal

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{Deployment, Environment, RunMode};
use crate::error::BootstrapError;

pub const VAR_RUN_MODE: &str = "CABOOSE_SERVER_ENV";
pub const VAR_CONTENT_DIR: &str = "CABOOSE_CONTENT_DIR";
pub const VAR_DATA_DIR: &str = "CABOOSE_DATA_DIR";
pub const VAR_INSTALL_DIR: &str = "CABOOSE_INSTALL_DIR";
pub const VAR_DATABASE_TYPE: &str = "CABOOSE_DATABASE_TYPE";
pub const VAR_LOCAL_APP_DATA: &str = "LOCALAPPDATA";

const APP_DIR_NAME: &str = "Caboose";
const WRITE_PROBE: &str = ".caboose-write-probe";

/// Platform family, as far as directory defaults are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Other,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Resolves the process [`Environment`].
///
/// # Example
/// ```no_run
/// use caboose::Bootstrapper;
///
/// match Bootstrapper::from_process().resolve() {
///     Ok(env) => println!("data dir: {}", env.data_dir.display()),
///     Err(err) => {
///         eprintln!("fatal: {err}");
///         std::process::exit(1);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    vars: HashMap<String, String>,
    platform: Platform,
    deployment: Option<Deployment>,
}

impl Bootstrapper {
    /// Bootstrapper reading the variables of the current process.
    pub fn from_process() -> Self {
        Self::new(std::env::vars())
    }

    /// Bootstrapper reading the given variables.
    ///
    /// The deployment kind is detected from the host unless set with
    /// [`with_deployment`](Self::with_deployment).
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            platform: Platform::current(),
            deployment: None,
        }
    }

    /// Overrides the platform family used for directory defaults.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Overrides deployment detection.
    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// Resolves and provisions the environment.
    pub fn resolve(&self) -> Result<Environment, BootstrapError> {
        info!("setting up environment");

        let run_mode = self.run_mode()?;
        let deployment = self.deployment.unwrap_or_else(detect_deployment);
        let install_dir = self.install_dir()?;

        let content_dir = self.content_dir(deployment, &install_dir)?;
        require_directory("content", &content_dir)?;

        let data_dir = self.data_dir(deployment, &install_dir)?;
        provision("data", &data_dir)?;

        let config_dir = data_dir.join("configs");
        provision("config", &config_dir)?;
        let plugin_dir = data_dir.join("plugins");
        provision("plugin", &plugin_dir)?;
        let log_dir = data_dir.join("logs");
        provision("log", &log_dir)?;
        let database_dir = data_dir.join("databases");
        provision("database", &database_dir)?;

        let database_backend = self
            .var(VAR_DATABASE_TYPE)
            .unwrap_or("sqlite")
            .trim()
            .to_ascii_lowercase();
        let database_path = database_dir.join("caboose.sqlite");
        let database_url = format!("file:{}", database_path.display());

        let env = Environment {
            run_mode,
            deployment,
            config_path: config_dir.join("caboose.json"),
            default_config_path: install_dir.join("assets").join("default.json"),
            install_dir,
            content_dir,
            data_dir,
            config_dir,
            plugin_dir,
            log_dir,
            database_dir,
            database_backend,
            database_path,
            database_url,
        };
        info!(
            mode = %env.run_mode,
            deployment = env.deployment.as_str(),
            data_dir = %env.data_dir.display(),
            "environment setup complete"
        );
        Ok(env)
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn run_mode(&self) -> Result<RunMode, BootstrapError> {
        match self.var(VAR_RUN_MODE) {
            Some("development") => Ok(RunMode::Development),
            Some("production") => Ok(RunMode::Production),
            Some(other) => Err(BootstrapError::InvalidRunMode {
                value: other.to_string(),
            }),
            None => Err(BootstrapError::MissingVariable { name: VAR_RUN_MODE }),
        }
    }

    fn install_dir(&self) -> Result<PathBuf, BootstrapError> {
        if let Some(dir) = self.var(VAR_INSTALL_DIR) {
            return Ok(absolute(Path::new(dir)));
        }
        let exe = std::env::current_exe().map_err(|source| BootstrapError::InstallDirectory { source })?;
        Ok(exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    fn content_dir(&self, deployment: Deployment, install_dir: &Path) -> Result<PathBuf, BootstrapError> {
        if let Some(dir) = self.var(VAR_CONTENT_DIR) {
            return Ok(absolute(Path::new(dir)));
        }
        match deployment {
            Deployment::Containerized => Ok(sibling(install_dir, "content")),
            Deployment::Standalone => Err(BootstrapError::MissingVariable {
                name: VAR_CONTENT_DIR,
            }),
        }
    }

    fn data_dir(&self, deployment: Deployment, install_dir: &Path) -> Result<PathBuf, BootstrapError> {
        if let Some(dir) = self.var(VAR_DATA_DIR) {
            return Ok(absolute(Path::new(dir)));
        }
        match (deployment, self.platform) {
            (Deployment::Containerized, _) => Ok(sibling(install_dir, "data")),
            (Deployment::Standalone, Platform::Windows) => self
                .var(VAR_LOCAL_APP_DATA)
                .map(|base| absolute(&Path::new(base).join(APP_DIR_NAME)))
                .ok_or(BootstrapError::MissingVariable {
                    name: VAR_LOCAL_APP_DATA,
                }),
            (Deployment::Standalone, Platform::Other) => dirs::data_local_dir()
                .map(|base| base.join(APP_DIR_NAME))
                .ok_or(BootstrapError::NoDataDirectory),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn sibling(install_dir: &Path, name: &str) -> PathBuf {
    install_dir.parent().unwrap_or(install_dir).join(name)
}

fn require_directory(what: &'static str, path: &Path) -> Result<(), BootstrapError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(BootstrapError::MissingDirectory {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Creates `path` if needed and checks that files can be written into it.
fn provision(what: &'static str, path: &Path) -> Result<(), BootstrapError> {
    if !path.is_dir() {
        debug!(what, path = %path.display(), "creating directory");
        fs::create_dir_all(path).map_err(|source| BootstrapError::CreateDirectory {
            what,
            path: path.to_path_buf(),
            source,
        })?;
    }

    let probe = path.join(WRITE_PROBE);
    let written = fs::File::create(&probe).and_then(|mut f| f.write_all(b"ok"));
    let _ = fs::remove_file(&probe);
    written.map_err(|source| BootstrapError::NotWritable {
        what,
        path: path.to_path_buf(),
        source,
    })
}

fn detect_deployment() -> Deployment {
    if Path::new("/.dockerenv").exists() {
        return Deployment::Containerized;
    }
    let in_container = fs::read_to_string("/proc/self/cgroup")
        .map(|groups| {
            groups.contains("docker") || groups.contains("kubepods") || groups.contains("containerd")
        })
        .unwrap_or(false);
    if in_container {
        Deployment::Containerized
    } else {
        Deployment::Standalone
    }
}
