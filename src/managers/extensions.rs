//! # Extension manager.
//!
//! Discovers extensions in the plugin directory and tracks which of them are
//! active. An extension is a sub-directory holding a `plugin.json` manifest:
//!
//! ```json
//! { "name": "gallery", "version": "1.2.0", "description": "optional" }
//! ```
//!
//! Directories without a manifest are ignored; unreadable or malformed
//! manifests are logged and skipped. Loading extension code is not part of
//! this manager.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::{LifecycleUnit, UnitContext};
use crate::error::UnitError;
use crate::managers::ConfigManager;

const MANIFEST: &str = "plugin.json";

/// Contents of an extension's `plugin.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Lifecycle unit owning the discovered and active extensions.
pub struct ExtensionManager {
    config: Arc<ConfigManager>,
    plugin_dir: OnceLock<PathBuf>,
    discovered: Mutex<Vec<ExtensionManifest>>,
    active: Mutex<Vec<String>>,
}

impl ExtensionManager {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self {
            config,
            plugin_dir: OnceLock::new(),
            discovered: Mutex::new(Vec::new()),
            active: Mutex::new(Vec::new()),
        }
    }

    /// Manifests found by the last scan, sorted by name.
    pub async fn discovered(&self) -> Vec<ExtensionManifest> {
        self.discovered.lock().await.clone()
    }

    /// Names of the active extensions, sorted.
    pub async fn active(&self) -> Vec<String> {
        self.active.lock().await.clone()
    }
}

async fn scan(dir: &Path) -> Result<Vec<ExtensionManifest>, UnitError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| UnitError::io(format!("listing {}", dir.display()), e))?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| UnitError::io(format!("listing {}", dir.display()), e))?
    {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            dirs.push(entry.path());
        }
    }
    // Directory order decides which of two same-named manifests wins.
    dirs.sort();

    let mut found: Vec<ExtensionManifest> = Vec::new();
    let mut names = HashSet::new();
    for ext_dir in dirs {
        let path = ext_dir.join(MANIFEST);
        let Some(manifest) = read_manifest(&path).await else {
            continue;
        };
        if !names.insert(manifest.name.clone()) {
            warn!(path = %path.display(), name = %manifest.name, "duplicate extension name; skipping");
            continue;
        }
        found.push(manifest);
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

async fn read_manifest(path: &Path) -> Option<ExtensionManifest> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no manifest; ignoring directory");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable extension manifest; skipping");
            return None;
        }
    };
    match serde_json::from_str::<ExtensionManifest>(&raw) {
        Ok(m) if m.name.trim().is_empty() => {
            warn!(path = %path.display(), "extension manifest has an empty name; skipping");
            None
        }
        Ok(m) => Some(m),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid extension manifest; skipping");
            None
        }
    }
}

#[async_trait]
impl LifecycleUnit for ExtensionManager {
    fn name(&self) -> &'static str {
        "extensions"
    }

    fn initialize(&self, ctx: &UnitContext) {
        let _ = self.plugin_dir.set(ctx.env().plugin_dir.clone());
    }

    async fn setup(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let dir = self.plugin_dir.get().ok_or(UnitError::NotReady {
            what: "plugin directory",
        })?;
        let found = scan(dir).await?;
        info!(count = found.len(), dir = %dir.display(), "extensions discovered");
        *self.discovered.lock().await = found;
        Ok(())
    }

    async fn start(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let settings = &self.config.settings()?.extensions;
        if !settings.enabled {
            info!("extensions disabled by configuration");
            return Ok(());
        }

        let discovered = self.discovered.lock().await;
        let mut active = self.active.lock().await;
        active.clear();
        for manifest in discovered.iter() {
            if settings.disabled.contains(&manifest.name) {
                debug!(name = %manifest.name, "extension disabled by configuration");
                continue;
            }
            info!(name = %manifest.name, version = %manifest.version, "extension activated");
            active.push(manifest.name.clone());
        }
        Ok(())
    }

    async fn stop(&self, _ctx: &UnitContext) -> Result<(), UnitError> {
        let mut active = self.active.lock().await;
        if !active.is_empty() {
            info!(count = active.len(), "extensions deactivated");
        }
        active.clear();
        Ok(())
    }
}
