//! # Subsystem managers.
//!
//! The four lifecycle units the application registers, in order:
//!
//! | Unit         | Type                     | Owns                                      |
//! |--------------|--------------------------|-------------------------------------------|
//! | `config`     | [`ConfigManager`]        | settings file, resolved storage location  |
//! | `storage`    | [`StorageManager`]       | backend selection, delegate lifecycle     |
//! | `network`    | [`NetworkServerManager`] | HTTP listener                             |
//! | `extensions` | [`ExtensionManager`]     | discovered and active extensions          |
//!
//! Managers reach each other through `Arc` handles passed at construction;
//! a manager only reads another's state produced in an earlier phase.

mod config;
mod extensions;
mod network;
mod storage;

pub use config::{ConfigManager, ExtensionSettings, ServerSettings, Settings};
pub use extensions::{ExtensionManager, ExtensionManifest};
pub use network::NetworkServerManager;
pub use storage::{SqliteStore, StorageBackend, StorageManager};
