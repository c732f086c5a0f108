//! [`ServerDir`]: a temporary server root for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

/// Relative location of the rule-definition file inside a [`ServerDir`].
pub const RULES_FILE: &str = "config/SyncConfig.json";
/// Relative location of the cache snapshot inside a [`ServerDir`].
pub const CACHE_FILE: &str = "cache/SyncConfigCache.json";
/// Relative location of the rule-store export inside a [`ServerDir`].
pub const STORE_FILE: &str = "config/SyncRules.json";

/// A temporary directory laid out like a server root: rule definitions
/// under `config/`, the snapshot under `cache/`, package trees anywhere.
pub struct ServerDir {
    temp_dir: TempDir,
}

impl Default for ServerDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("ServerDir::new: failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn rules_path(&self) -> PathBuf {
        self.path(RULES_FILE)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.path(CACHE_FILE)
    }

    pub fn store_path(&self) -> PathBuf {
        self.path(STORE_FILE)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Could not write {}: {e}", path.display()));
    }

    pub fn remove_file(&self, relative: &str) {
        let path = self.path(relative);
        fs::remove_file(&path).unwrap_or_else(|e| panic!("Could not remove {}: {e}", path.display()));
    }

    pub fn read_file(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("Could not read {}: {e}", path.display()))
    }

    pub fn read_json(&self, relative: &str) -> Value {
        serde_json::from_str(&self.read_file(relative))
            .unwrap_or_else(|e| panic!("{relative} is not valid JSON: {e}"))
    }

    pub fn write_json(&self, relative: &str, value: &Value) {
        self.write_file(relative, &serde_json::to_string_pretty(value).unwrap());
    }

    /// Write the rule-definition file.
    pub fn write_rules(&self, definitions: &Value) {
        self.write_json(RULES_FILE, definitions);
    }

    /// Write the rule-store export (a JSON array of records).
    pub fn write_store(&self, records: &[Value]) {
        self.write_json(STORE_FILE, &Value::Array(records.to_vec()));
    }

    /// Assert that `relative` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(path.exists(), "Expected path to exist: {}", path.display());
    }

    /// Assert that `relative` is a directory.
    ///
    /// # Panics
    /// Panics with a descriptive message if it is not.
    pub fn assert_dir(&self, relative: &str) {
        let path = self.path(relative);
        assert!(path.is_dir(), "Expected directory: {}", path.display());
    }
}
