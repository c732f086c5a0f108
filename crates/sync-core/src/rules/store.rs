//! External rule stores

use std::sync::{Mutex, PoisonError};

use sync_fs::NormalizedPath;
use tracing::debug;

use super::RuleRecord;
use crate::{Error, Result};

/// Source of raw rule records, typically a relational rule table.
pub trait RuleStore: Send + Sync {
    /// Every root record still present in the store, including disabled
    /// and delete-flagged ones.
    fn all_active_rules(&self) -> Result<Vec<RuleRecord>>;

    /// Folder records belonging to `rule_id`.
    fn rule_detail(&self, rule_id: i64) -> Result<Vec<RuleRecord>>;

    /// Record the fingerprint computed for `rule_id`'s package rule.
    fn update_fingerprint(&self, rule_id: i64, md5: &str) -> Result<()>;
}

impl<T: RuleStore + ?Sized> RuleStore for std::sync::Arc<T> {
    fn all_active_rules(&self) -> Result<Vec<RuleRecord>> {
        (**self).all_active_rules()
    }

    fn rule_detail(&self, rule_id: i64) -> Result<Vec<RuleRecord>> {
        (**self).rule_detail(rule_id)
    }

    fn update_fingerprint(&self, rule_id: i64, md5: &str) -> Result<()> {
        (**self).update_fingerprint(rule_id, md5)
    }
}

fn roots(records: &[RuleRecord]) -> Vec<RuleRecord> {
    records.iter().filter(|r| r.root).cloned().collect()
}

fn details(records: &[RuleRecord], rule_id: i64) -> Vec<RuleRecord> {
    records
        .iter()
        .filter(|r| !r.root && r.rule_id == rule_id)
        .cloned()
        .collect()
}

fn set_fingerprint(records: &mut [RuleRecord], rule_id: i64, md5: &str) -> bool {
    let mut found = false;
    for record in records.iter_mut().filter(|r| r.root && r.rule_id == rule_id) {
        record.md5 = Some(md5.to_string());
        found = true;
    }
    found
}

/// Rule table held in memory.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    records: Mutex<Vec<RuleRecord>>,
}

impl MemoryRuleStore {
    pub fn new(records: Vec<RuleRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn records(&self) -> Vec<RuleRecord> {
        self.lock().clone()
    }

    /// Insert `record`, replacing any record with the same id.
    pub fn upsert(&self, record: RuleRecord) {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RuleRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RuleStore for MemoryRuleStore {
    fn all_active_rules(&self) -> Result<Vec<RuleRecord>> {
        Ok(roots(&self.lock()))
    }

    fn rule_detail(&self, rule_id: i64) -> Result<Vec<RuleRecord>> {
        Ok(details(&self.lock(), rule_id))
    }

    fn update_fingerprint(&self, rule_id: i64, md5: &str) -> Result<()> {
        if set_fingerprint(&mut self.lock(), rule_id, md5) {
            Ok(())
        } else {
            Err(Error::store(format!("no root record for rule {rule_id}")))
        }
    }
}

/// Rule table exported to a JSON array of records.
///
/// The file is re-read on every call so edits made by the admin surface
/// are picked up by the next rebuild pass.
#[derive(Debug)]
pub struct JsonRuleStore {
    path: NormalizedPath,
    write_lock: Mutex<()>,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<NormalizedPath>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    fn read(&self) -> Result<Vec<RuleRecord>> {
        let content = sync_fs::io::read_text(&self.path)?;
        let records: Vec<RuleRecord> = serde_json::from_str(&content)?;
        debug!("Read {} rule records from {}", records.len(), self.path);
        Ok(records)
    }
}

impl RuleStore for JsonRuleStore {
    fn all_active_rules(&self) -> Result<Vec<RuleRecord>> {
        Ok(roots(&self.read()?))
    }

    fn rule_detail(&self, rule_id: i64) -> Result<Vec<RuleRecord>> {
        Ok(details(&self.read()?, rule_id))
    }

    fn update_fingerprint(&self, rule_id: i64, md5: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.read()?;
        if !set_fingerprint(&mut records, rule_id, md5) {
            return Err(Error::store(format!("no root record for rule {rule_id}")));
        }
        let content = serde_json::to_string_pretty(&records)?;
        sync_fs::io::write_text(&self.path, &content)?;
        Ok(())
    }
}
