//! Server context resolution
//!
//! The configuration file anchors the server: every relative path it
//! names resolves against the directory holding it.

use std::path::Path;

use sync_core::{ServerConfig, SyncCacheEngine};
use sync_fs::NormalizedPath;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ServerContext {
    pub config_path: NormalizedPath,
    pub root: NormalizedPath,
    pub config: ServerConfig,
}

impl ServerContext {
    /// Load the configuration at `config`, relative to `cwd` unless absolute.
    pub fn load(cwd: &Path, config: &Path) -> Result<Self> {
        let absolute = if config.is_absolute() {
            config.to_path_buf()
        } else {
            cwd.join(config)
        };
        let root = absolute.parent().unwrap_or(cwd).to_path_buf();
        let config_path = NormalizedPath::new(absolute);
        let config = ServerConfig::load(&config_path)?;
        debug!("Server root: {}", root.display());
        Ok(Self {
            config_path,
            root: NormalizedPath::new(root),
            config,
        })
    }

    pub fn engine(&self) -> Result<SyncCacheEngine> {
        Ok(SyncCacheEngine::from_config(&self.config, &self.root)?)
    }

    /// Engine over the persisted snapshot that leaves the server's files
    /// untouched.
    pub fn inspect(&self) -> Result<SyncCacheEngine> {
        Ok(SyncCacheEngine::open_config(&self.config, &self.root)?)
    }

    pub fn resolve(&self, configured: &str) -> NormalizedPath {
        ServerConfig::resolve(&self.root, configured)
    }
}
