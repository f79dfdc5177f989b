//! # Process environment record.
//!
//! [`Environment`] is the read-only description of where and how this process
//! runs: run mode, deployment kind, every resolved filesystem location and the
//! storage backend discriminator. It is produced once by the [`Bootstrapper`]
//! and then shared as `Arc<Environment>` with every unit.
//!
//! ## Layout
//! ```text
//! <data_dir>/
//!   ├─ configs/caboose.json      config_path
//!   ├─ plugins/                  plugin_dir
//!   ├─ logs/                     log_dir
//!   └─ databases/caboose.sqlite  database_path (url: file:<path>)
//! <install_dir>/assets/default.json   default_config_path
//! ```
//!
//! ## Rules
//! - Fields are only populated by [`Bootstrapper::resolve`]; there is no partially populated record
//! - Every directory exists and the mutable ones are writable when the record is handed out

mod bootstrap;

use std::fmt;
use std::path::PathBuf;

pub use bootstrap::{Bootstrapper, Platform};

/// Run mode selected by `CABOOSE_SERVER_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the process is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Running inside a container; directories default next to the installation.
    Containerized,
    /// Running directly on a host; directories come from overrides or platform defaults.
    Standalone,
}

impl Deployment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deployment::Containerized => "containerized",
            Deployment::Standalone => "standalone",
        }
    }
}

/// Fully resolved, immutable process environment.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Environment {
    /// Development or production.
    pub run_mode: RunMode,
    /// Containerized or standalone.
    pub deployment: Deployment,
    /// Directory holding bundled assets (default config template).
    pub install_dir: PathBuf,
    /// Read-only content directory.
    pub content_dir: PathBuf,
    /// Root of all mutable state.
    pub data_dir: PathBuf,
    /// Directory of configuration files.
    pub config_dir: PathBuf,
    /// Active configuration file.
    pub config_path: PathBuf,
    /// Template copied to `config_path` when it is absent.
    pub default_config_path: PathBuf,
    /// Directory scanned for extensions.
    pub plugin_dir: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Directory for storage files.
    pub database_dir: PathBuf,
    /// Storage backend discriminator, as configured (validated by the storage manager).
    pub database_backend: String,
    /// Database file used by file-based backends.
    pub database_path: PathBuf,
    /// Connection string for the database.
    pub database_url: String,
}
