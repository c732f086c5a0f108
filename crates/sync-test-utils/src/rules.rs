//! Builders for rule JSON.

use serde_json::{Map, Value, json};

/// Builds one package rule as it appears in the rule-definition file.
///
/// # Example
///
/// ```rust
/// use sync_test_utils::RuleBuilder;
///
/// let rule = RuleBuilder::new("packs/modpack1")
///     .folder("config", "cfg")
///     .ignore("*.bak")
///     .file("manifest.json")
///     .build();
/// assert_eq!(rule["folders"][0]["serverPath"], "cfg");
/// ```
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    base_path: String,
    enable: bool,
    folders: Vec<Map<String, Value>>,
    files: Vec<String>,
    delete: Vec<String>,
}

impl RuleBuilder {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            enable: true,
            folders: Vec::new(),
            files: Vec::new(),
            delete: Vec::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enable = false;
        self
    }

    /// Add a folder with mode `sync`. Later `ignore`/`delete_in_folder`
    /// calls apply to the most recently added folder.
    pub fn folder(mut self, name: &str, server_path: &str) -> Self {
        let mut folder = Map::new();
        folder.insert("name".into(), json!(name));
        folder.insert("mode".into(), json!("sync"));
        folder.insert("serverPath".into(), json!(server_path));
        folder.insert("ignore".into(), json!([]));
        folder.insert("delete".into(), json!([]));
        self.folders.push(folder);
        self
    }

    pub fn ignore(self, pattern: &str) -> Self {
        self.push_to_last_folder("ignore", pattern)
    }

    pub fn delete_in_folder(self, path: &str) -> Self {
        self.push_to_last_folder("delete", path)
    }

    /// Declare a root file.
    pub fn file(mut self, path: &str) -> Self {
        self.files.push(path.to_string());
        self
    }

    /// Declare a root file the client must delete.
    pub fn delete(mut self, path: &str) -> Self {
        self.delete.push(path.to_string());
        self
    }

    pub fn build(self) -> Value {
        json!({
            "basePath": self.base_path,
            "enable": self.enable,
            "folders": self.folders,
            "files": self.files,
            "delete": self.delete,
        })
    }

    fn push_to_last_folder(mut self, key: &str, value: &str) -> Self {
        let folder = self
            .folders
            .last_mut()
            .unwrap_or_else(|| panic!("RuleBuilder::{key}: add a folder first"));
        if let Some(Value::Array(items)) = folder.get_mut(key) {
            items.push(json!(value));
        }
        self
    }
}

/// Rule-definition file content holding `packages`, with no recorded
/// fingerprints.
pub fn definitions(packages: &[(&str, Value)]) -> Value {
    let packages: Map<String, Value> = packages
        .iter()
        .map(|(name, rule)| (name.to_string(), rule.clone()))
        .collect();
    json!({ "packages": packages, "md5": {} })
}

/// A root record of the rule table, in SQL export style.
pub fn root_record(id: i64, rule_id: i64, name: &str, server_path: &str, sync_files: &str) -> Value {
    json!({
        "id": id,
        "ruleId": rule_id,
        "configName": name,
        "serverPath": server_path,
        "root": 1,
        "enable": 1,
        "deleted": 0,
        "syncFiles": sync_files,
        "createTime": "2024-03-04 12:00:00",
        "updateTime": "2024-03-04 12:00:00"
    })
}

/// A folder record of the rule table.
pub fn folder_record(id: i64, rule_id: i64, client_path: &str, server_path: &str, ignore: &str) -> Value {
    json!({
        "id": id,
        "ruleId": rule_id,
        "clientPath": client_path,
        "serverPath": server_path,
        "syncMode": "sync",
        "root": 0,
        "enable": 1,
        "ignoreFile": ignore,
        "deleteFile": ""
    })
}
