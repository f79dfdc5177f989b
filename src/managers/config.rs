//! # Configuration manager.
//!
//! Owns the application settings file. Other managers read resolved locations
//! (database path and URL) from it from `initialize` on, and the parsed
//! [`Settings`] from the start phase on.
//!
//! ```text
//! initialize: Environment ──► paths (config, template, database)
//! setup:      config file absent? ──► copy template (or built-in defaults)
//!             read config file ──► serde_json ──► Settings
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::{LifecycleUnit, UnitContext};
use crate::error::UnitError;

/// Template written when neither the config file nor the installed template exist.
const BUILTIN_DEFAULTS: &str = include_str!("../../assets/default.json");

/// Application settings stored in `caboose.json`.
///
/// Unknown fields are ignored; missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub extensions: ExtensionSettings,
}

/// Network server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Extension activation switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtensionSettings {
    /// Master switch; when false no extension is activated.
    pub enabled: bool,
    /// Names of extensions that are discovered but never activated.
    pub disabled: Vec<String>,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Locations {
    config_path: PathBuf,
    default_config_path: PathBuf,
    database_path: PathBuf,
    database_url: String,
}

/// Lifecycle unit owning the settings file.
#[derive(Debug, Default)]
pub struct ConfigManager {
    locations: OnceLock<Locations>,
    settings: OnceLock<Settings>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed settings. Available once the setup phase completed.
    pub fn settings(&self) -> Result<&Settings, UnitError> {
        self.settings
            .get()
            .ok_or(UnitError::NotReady { what: "settings" })
    }

    /// Path of the active configuration file.
    pub fn config_path(&self) -> Result<&Path, UnitError> {
        self.locations().map(|l| l.config_path.as_path())
    }

    /// Database file used by file-based storage backends.
    pub fn database_path(&self) -> Result<&Path, UnitError> {
        self.locations().map(|l| l.database_path.as_path())
    }

    /// Database connection string.
    pub fn database_url(&self) -> Result<&str, UnitError> {
        self.locations().map(|l| l.database_url.as_str())
    }

    fn locations(&self) -> Result<&Locations, UnitError> {
        self.locations.get().ok_or(UnitError::NotReady {
            what: "configuration paths",
        })
    }

    async fn ensure_config_file(&self, locations: &Locations) -> Result<(), UnitError> {
        let exists = tokio::fs::try_exists(&locations.config_path)
            .await
            .map_err(|e| UnitError::io(format!("checking {}", locations.config_path.display()), e))?;
        if exists {
            debug!(path = %locations.config_path.display(), "configuration file present");
            return Ok(());
        }

        let template = match tokio::fs::read_to_string(&locations.default_config_path).await {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    path = %locations.default_config_path.display(),
                    "no installed template; using built-in defaults"
                );
                BUILTIN_DEFAULTS.to_string()
            }
            Err(e) => {
                return Err(UnitError::io(
                    format!("reading {}", locations.default_config_path.display()),
                    e,
                ));
            }
        };
        tokio::fs::write(&locations.config_path, template)
            .await
            .map_err(|e| UnitError::io(format!("writing {}", locations.config_path.display()), e))?;
        info!(path = %locations.config_path.display(), "default configuration written");
        Ok(())
    }
}

#[async_trait]
impl LifecycleUnit for ConfigManager {
    fn name(&self) -> &'static str {
        "config"
    }

    fn initialize(&self, ctx: &UnitContext) {
        let env = ctx.env();
        let _ = self.locations.set(Locations {
            config_path: env.config_path.clone(),
            default_config_path: env.default_config_path.clone(),
            database_path: env.database_path.clone(),
            database_url: env.database_url.clone(),
        });
    }

    async fn setup(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let locations = self.locations()?;
        self.ensure_config_file(locations).await?;

        let raw = tokio::fs::read_to_string(&locations.config_path)
            .await
            .map_err(|e| UnitError::io(format!("reading {}", locations.config_path.display()), e))?;
        let settings: Settings = serde_json::from_str(&raw).map_err(|e| UnitError::Invalid {
            what: "configuration file",
            reason: e.to_string(),
        })?;
        info!(
            host = %settings.server.host,
            port = settings.server.port,
            extensions = settings.extensions.enabled,
            "configuration loaded"
        );
        let _ = self.settings.set(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::test_support;

    fn initialized(tmp: &TempDir) -> (ConfigManager, UnitContext) {
        let env = test_support::provisioned(tmp.path());
        let ctx = test_support::context("config", env);
        let config = ConfigManager::new();
        config.initialize(&ctx);
        (config, ctx)
    }

    #[tokio::test]
    async fn writes_template_only_when_absent() {
        let tmp = TempDir::new().expect("tempdir");
        let (config, ctx) = initialized(&tmp);
        let path = config.config_path().expect("path").to_path_buf();

        config.setup(&ctx).await.expect("setup");
        assert_eq!(config.settings().expect("settings"), &Settings::default());

        std::fs::write(&path, r#"{"server":{"port":8080}}"#).expect("edit");
        let (again, ctx) = initialized(&tmp);
        again.setup(&ctx).await.expect("setup");

        let settings = again.settings().expect("settings");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            r#"{"server":{"port":8080}}"#,
            "existing file is left alone"
        );
    }

    #[tokio::test]
    async fn installed_template_is_preferred() {
        let tmp = TempDir::new().expect("tempdir");
        let (config, ctx) = initialized(&tmp);
        let template = ctx.env().default_config_path.clone();
        std::fs::create_dir_all(template.parent().expect("parent")).expect("assets");
        std::fs::write(&template, r#"{"extensions":{"disabled":["beta"]}}"#).expect("template");

        config.setup(&ctx).await.expect("setup");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.extensions.disabled, vec!["beta".to_string()]);
        assert!(settings.extensions.enabled);
    }

    #[tokio::test]
    async fn malformed_file_fails_setup() {
        let tmp = TempDir::new().expect("tempdir");
        let (config, ctx) = initialized(&tmp);
        std::fs::write(config.config_path().expect("path"), "{ not json").expect("write");

        let err = config.setup(&ctx).await.expect_err("invalid");
        assert_eq!(err.as_label(), "unit_invalid");
        assert!(matches!(config.settings(), Err(UnitError::NotReady { .. })));
    }

    #[test]
    fn paths_are_unavailable_before_initialize() {
        let config = ConfigManager::new();
        assert!(config.database_path().is_err());
        assert!(config.settings().is_err());
    }
}
