//! The local rule-definition file

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sync_fs::{NormalizedPath, validate_relative_path};
use tracing::debug;

use crate::{Error, Result};

/// Folder names the client payload uses for its own keys.
pub const RESERVED_FOLDER_NAMES: [&str; 2] = ["data", "files"];

fn default_enable() -> bool {
    true
}

/// One synchronized folder of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRule {
    /// Folder name as the client sees it
    pub name: String,
    /// Client-side sync mode, passed through untouched
    #[serde(default)]
    pub mode: String,
    /// Directory relative to the package base path
    pub server_path: String,
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Paths the client must delete
    #[serde(default)]
    pub delete: Vec<String>,
}

/// Definition of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRule {
    pub base_path: String,
    #[serde(default = "default_enable")]
    pub enable: bool,
    /// Folders in client display order
    #[serde(default)]
    pub folders: Vec<FolderRule>,
    /// Individual files below the base path
    #[serde(default)]
    pub files: Vec<String>,
    /// Root files the client must delete
    #[serde(default)]
    pub delete: Vec<String>,
}

impl PackageRule {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            enable: true,
            folders: Vec::new(),
            files: Vec::new(),
            delete: Vec::new(),
        }
    }

    pub fn folder(&self, name: &str) -> Option<&FolderRule> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Check folder names and declared paths.
    ///
    /// # Errors
    ///
    /// [`Error::ReservedFolderName`] for a folder named like a payload key,
    /// [`Error::InvalidRule`] for duplicate folders or paths escaping the
    /// package base path.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRule {
            name: name.to_string(),
            reason,
        };

        let mut seen = Vec::with_capacity(self.folders.len());
        for folder in &self.folders {
            if RESERVED_FOLDER_NAMES.contains(&folder.name.as_str()) {
                return Err(Error::ReservedFolderName {
                    package: name.to_string(),
                    folder: folder.name.clone(),
                });
            }
            if folder.name.is_empty() {
                return Err(invalid("folder with empty name".to_string()));
            }
            if seen.contains(&folder.name.as_str()) {
                return Err(invalid(format!("folder {} declared twice", folder.name)));
            }
            seen.push(folder.name.as_str());
            validate_relative_path(&folder.server_path)
                .map_err(|_| invalid(format!("folder {} has unsafe path {}", folder.name, folder.server_path)))?;
        }
        for file in self.files.iter().chain(&self.delete) {
            validate_relative_path(file).map_err(|_| invalid(format!("unsafe file path {file}")))?;
        }
        Ok(())
    }
}

/// The rule-definition file: every package rule plus the fingerprint each
/// was last seen with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinitions {
    #[serde(default)]
    pub packages: BTreeMap<String, PackageRule>,
    /// Package name to rule fingerprint
    #[serde(default)]
    pub md5: BTreeMap<String, String>,
}

impl RuleDefinitions {
    /// Load and validate the definitions at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::RulesNotFound`] when the file is missing; parse and
    /// validation errors otherwise. Both are fatal at startup.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::RulesNotFound {
                path: path.to_native(),
            });
        }
        let content = sync_fs::io::read_text(path)?;
        let definitions: RuleDefinitions = serde_json::from_str(&content)?;
        definitions.validate()?;
        debug!("Loaded {} package rules from {path}", definitions.packages.len());
        Ok(definitions)
    }

    /// Write the definitions atomically as pretty JSON.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        sync_fs::io::write_text(path, &content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.packages
            .iter()
            .try_for_each(|(name, rule)| rule.validate(name))
    }

    /// Enabled rules in name order.
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &PackageRule)> {
        self.packages.iter().filter(|(_, rule)| rule.enable)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.packages.get(name).is_some_and(|rule| rule.enable)
    }
}
