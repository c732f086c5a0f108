//! Rule providers selected by configuration

use tracing::{debug, error};

use super::{FolderRule, PackageRule, RuleDefinitions, RuleRecord, RuleStore};
use crate::Result;
use crate::tracker::rule_fingerprint;

/// Brings the local rule definitions up to date before a rebuild pass.
pub trait RuleProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Update `definitions` in place, returning whether anything changed.
    fn refresh(&self, definitions: &mut RuleDefinitions) -> Result<bool>;
}

/// Uses the rule-definition file exactly as the operator wrote it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRuleProvider;

impl RuleProvider for LocalRuleProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn refresh(&self, _definitions: &mut RuleDefinitions) -> Result<bool> {
        Ok(false)
    }
}

/// Merges an external rule store into the local definitions.
///
/// The store wins for every package it names: enabled rules replace the
/// local copy, disabled or delete-flagged ones are removed. Packages only
/// the local file knows about are left alone.
pub struct StoreRuleProvider {
    store: Box<dyn RuleStore>,
}

impl StoreRuleProvider {
    pub fn new(store: impl RuleStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    fn package_rule(&self, root: &RuleRecord) -> Result<PackageRule> {
        let mut detail = self.store.rule_detail(root.rule_id)?;
        detail.sort_by_key(|record| record.id);

        let folders = detail
            .into_iter()
            .filter_map(|record| {
                let name = record.client_path.filter(|p| !p.is_empty())?;
                Some(FolderRule {
                    name,
                    mode: record.sync_mode.unwrap_or_default(),
                    server_path: record.server_path,
                    ignore: record.ignore_file,
                    delete: record.delete_file,
                })
            })
            .collect();

        Ok(PackageRule {
            base_path: root.server_path.clone(),
            enable: true,
            folders,
            files: root.sync_files.clone(),
            delete: root.delete_file.clone(),
        })
    }
}

impl std::fmt::Debug for StoreRuleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRuleProvider").finish_non_exhaustive()
    }
}

impl RuleProvider for StoreRuleProvider {
    fn name(&self) -> &'static str {
        "store"
    }

    fn refresh(&self, definitions: &mut RuleDefinitions) -> Result<bool> {
        let mut changed = false;
        for root in self.store.all_active_rules()? {
            let Some(name) = root.config_name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            if !root.enable || root.deleted {
                debug!("RuleStore: {name} disabled or marked deleted");
                changed |= definitions.packages.remove(name).is_some();
                continue;
            }

            let rule = self.package_rule(&root)?;
            if let Err(e) = rule.validate(name) {
                error!("RuleStore: skipping {name}: {e}");
                continue;
            }
            let md5 = rule_fingerprint(&rule)?;
            if root.md5.as_deref() != Some(md5.as_str()) {
                self.store.update_fingerprint(root.rule_id, &md5)?;
            }

            match definitions.packages.get(name) {
                Some(existing) if *existing == rule => {
                    debug!("RuleStore: {name} has no change");
                    continue;
                }
                Some(_) => debug!("RuleStore: {name} has been changed, new md5: {md5}"),
                None => debug!("RuleStore: new package added {name}({md5})"),
            }
            definitions.packages.insert(name.to_string(), rule);
            changed = true;
        }
        Ok(changed)
    }
}
