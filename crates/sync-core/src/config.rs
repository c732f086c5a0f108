//! Server configuration
//!
//! Loaded from a TOML (or JSON/YAML, by extension) file through
//! [`sync_fs::ConfigStore`]. Every field has a default, so a partial file
//! or no file at all is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sync_fs::{ConfigStore, NormalizedPath};
use tracing::debug;

use crate::Result;

/// Where package rules come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    /// The local rule-definition file only
    #[default]
    Local,
    /// An external rule store merged into the local file
    Store,
}

/// `[sync]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Local rule-definition file
    pub rules_file: String,
    /// Persisted cache snapshot
    pub cache_file: String,
    /// Directory relative package base paths resolve against
    pub file_base_path: String,
    pub source: RuleSource,
    /// Rule table export used when `source = "store"`
    pub store_file: String,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            rules_file: "config/SyncConfig.json".to_string(),
            cache_file: "cache/SyncConfigCache.json".to_string(),
            file_base_path: ".".to_string(),
            source: RuleSource::Local,
            store_file: "config/SyncRules.json".to_string(),
        }
    }
}

/// `[call_limit]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallLimitSection {
    pub count: u32,
    pub window_ms: u64,
}

impl Default for CallLimitSection {
    fn default() -> Self {
        Self {
            count: 20,
            window_ms: 60_000,
        }
    }
}

/// `[status_cache]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCacheSection {
    pub clear_interval_ms: u64,
}

impl Default for StatusCacheSection {
    fn default() -> Self {
        Self {
            clear_interval_ms: 3_600_000,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub sync: SyncSection,
    pub call_limit: CallLimitSection,
    pub status_cache: StatusCacheSection,
    pub logging: LoggingSection,
}

impl ServerConfig {
    /// Load the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        if !path.exists() {
            debug!("No server config at {path}, using defaults");
            return Ok(Self::default());
        }
        Ok(ConfigStore::new().load(path)?)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    pub fn call_window(&self) -> Duration {
        Duration::from_millis(self.call_limit.window_ms)
    }

    pub fn clear_interval(&self) -> Duration {
        Duration::from_millis(self.status_cache.clear_interval_ms)
    }

    /// Resolve a configured path against `root` unless it is absolute.
    pub fn resolve(root: &NormalizedPath, configured: &str) -> NormalizedPath {
        let configured = NormalizedPath::new(configured);
        if configured.is_absolute() {
            configured
        } else {
            root.join(configured.as_str())
        }
    }
}
