//! Raw rule records as an external rule store holds them

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A row of the rule table.
///
/// Root records (`root = true`) name a package and its base path; folder
/// records share the root's `rule_id` and describe one synced folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: i64,
    pub rule_id: i64,
    #[serde(default)]
    pub config_name: Option<String>,
    #[serde(default)]
    pub server_path: String,
    #[serde(default)]
    pub client_path: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub root: bool,
    #[serde(default, deserialize_with = "flag")]
    pub enable: bool,
    #[serde(default, deserialize_with = "flag")]
    pub deleted: bool,
    #[serde(default)]
    pub sync_mode: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub sync_files: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub ignore_file: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub delete_file: Vec<String>,
    /// Fingerprint of the package rule built from this record
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub update_time: Option<DateTime<Utc>>,
}

impl RuleRecord {
    /// A root record for package `config_name`.
    pub fn root(id: i64, rule_id: i64, config_name: impl Into<String>, server_path: impl Into<String>) -> Self {
        Self {
            id,
            rule_id,
            config_name: Some(config_name.into()),
            server_path: server_path.into(),
            client_path: None,
            root: true,
            enable: true,
            deleted: false,
            sync_mode: None,
            sync_files: Vec::new(),
            ignore_file: Vec::new(),
            delete_file: Vec::new(),
            md5: None,
            create_time: None,
            update_time: None,
        }
    }

    /// A folder record synced to `client_path` from `server_path`.
    pub fn folder(
        id: i64,
        rule_id: i64,
        client_path: impl Into<String>,
        server_path: impl Into<String>,
        sync_mode: impl Into<String>,
    ) -> Self {
        Self {
            config_name: None,
            client_path: Some(client_path.into()),
            root: false,
            sync_mode: Some(sync_mode.into()),
            ..Self::root(id, rule_id, String::new(), server_path)
        }
    }
}

/// Accept booleans as well as the 0/1 integers SQL tables use.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!("expected boolean flag, got {other}"))),
    }
}

/// List columns arrive either as JSON arrays or comma-separated strings.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!("expected string, got {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(serde::de::Error::custom(format!("expected list, got {other}"))),
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS` form SQL exports use (taken as UTC).
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw}: {e}")))
}
