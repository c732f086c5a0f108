//! Cache entries and the persisted snapshot

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::rules::PackageRule;

/// Value that tells the client to delete a path.
pub const DELETE_SENTINEL: &str = "del";

/// Current snapshot layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Manifest value for one path: its content digest, or the delete marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileDigest {
    Hash(String),
    Delete,
}

impl FileDigest {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hash(hash) => hash,
            Self::Delete => DELETE_SENTINEL,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl Serialize for FileDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == DELETE_SENTINEL {
            Self::Delete
        } else {
            Self::Hash(raw)
        })
    }
}

/// Cached state of one synced folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    pub mode: String,
    pub server_path: String,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
    /// Relative path to digest, key-sorted
    #[serde(default)]
    pub files: BTreeMap<String, FileDigest>,
}

/// Cache entry for one package
///
/// `init` is only true once every folder has been walked and `md5` holds
/// the fingerprint of the entry's current client view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub base_path: String,
    pub folders: Vec<Folder>,
    /// Root files named by the rule
    #[serde(default)]
    pub declared_files: Vec<String>,
    /// Root files the client must delete
    #[serde(default)]
    pub delete: Vec<String>,
    /// Root file digests
    #[serde(default)]
    pub files: BTreeMap<String, FileDigest>,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub init: bool,
}

impl Package {
    /// A fresh, unbuilt entry copied from `rule`.
    pub fn from_rule(rule: &PackageRule) -> Self {
        Self {
            base_path: rule.base_path.clone(),
            folders: rule
                .folders
                .iter()
                .map(|folder| Folder {
                    name: folder.name.clone(),
                    mode: folder.mode.clone(),
                    server_path: folder.server_path.clone(),
                    ignore: folder.ignore.clone(),
                    delete: folder.delete.clone(),
                    files: BTreeMap::new(),
                })
                .collect(),
            declared_files: rule.files.clone(),
            delete: rule.delete.clone(),
            files: BTreeMap::new(),
            md5: String::new(),
            init: false,
        }
    }

    pub fn folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(|f| f.name.as_str())
    }
}

/// The persisted cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub version: u32,
    /// Rule fingerprint each entry was built from
    #[serde(default)]
    pub md5: BTreeMap<String, String>,
    #[serde(default)]
    pub packages: BTreeMap<String, Package>,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            md5: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_serializes_as_plain_string() {
        let mut files = BTreeMap::new();
        files.insert("a.txt".to_string(), FileDigest::Delete);
        files.insert("b.txt".to_string(), FileDigest::Hash("abc".into()));

        assert_eq!(
            serde_json::to_value(&files).unwrap(),
            json!({"a.txt": "del", "b.txt": "abc"})
        );
        let back: BTreeMap<String, FileDigest> =
            serde_json::from_value(json!({"a.txt": "del"})).unwrap();
        assert!(back["a.txt"].is_delete());
    }

    #[test]
    fn from_rule_starts_uninitialized() {
        let mut rule = PackageRule::new("packs/p");
        rule.files.push("manifest.json".into());
        let package = Package::from_rule(&rule);

        assert!(!package.init);
        assert!(package.md5.is_empty());
        assert!(package.files.is_empty());
        assert_eq!(package.declared_files, vec!["manifest.json"]);
    }
}
