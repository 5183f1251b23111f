//! Command handlers

pub mod category;
pub mod config;
pub mod link;
pub mod status;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};

use readlater_core::{Config, JsonFileStore, Library};

/// Opened store and library shared by the command handlers
pub struct App {
    pub config: Config,
    /// Concrete handle kept for file stats and external change polling
    pub store: Arc<JsonFileStore>,
    pub library: Library,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let store = Arc::new(
            JsonFileStore::open(config.store_path())
                .with_context(|| format!("Failed to open store at {:?}", config.store_path()))?,
        );
        let library = Library::new(store.clone()).with_policy(config.duplicate_policy);
        Ok(Self {
            config,
            store,
            library,
        })
    }
}
