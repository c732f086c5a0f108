//! Rule fingerprinting and dirty detection

use std::collections::BTreeSet;

use sync_fs::checksum::content_digest;
use tracing::debug;

use crate::Result;
use crate::rules::{PackageRule, RuleDefinitions};

/// Result of one [`check_config_update`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Packages whose rule is new or changed since the last pass
    pub dirty: BTreeSet<String>,
    /// Whether the recorded fingerprints changed and the definitions
    /// should be written back
    pub changed: bool,
}

/// Digest of a rule's canonical JSON serialization.
///
/// Field order is fixed by the struct and folders keep their declared
/// order, so equal rules always produce equal fingerprints.
pub fn rule_fingerprint(rule: &PackageRule) -> Result<String> {
    let canonical = serde_json::to_vec(rule)?;
    Ok(content_digest(&canonical))
}

/// Compare every enabled rule against its recorded fingerprint.
///
/// New or changed rules are marked dirty and their fingerprint recorded.
/// Fingerprints of rules that were removed or disabled are dropped.
pub fn check_config_update(definitions: &mut RuleDefinitions) -> Result<DiffOutcome> {
    let mut outcome = DiffOutcome::default();

    for (name, rule) in definitions.packages.iter().filter(|(_, rule)| rule.enable) {
        let md5 = rule_fingerprint(rule)?;
        match definitions.md5.get(name) {
            Some(recorded) if *recorded == md5 => {
                debug!("SyncConfig: {name} has no change");
                continue;
            }
            Some(_) => debug!("SyncConfig: {name} has been changed, new md5: {md5}"),
            None => debug!("SyncConfig: new package added {name}({md5})"),
        }
        definitions.md5.insert(name.clone(), md5);
        outcome.dirty.insert(name.clone());
        outcome.changed = true;
    }

    let packages = &definitions.packages;
    let before = definitions.md5.len();
    definitions.md5.retain(|name, _| {
        let keep = packages.get(name).is_some_and(|rule| rule.enable);
        if !keep {
            debug!("SyncConfig: {name} no longer enabled, removing md5");
        }
        keep
    });
    outcome.changed |= definitions.md5.len() != before;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FolderRule;
    use pretty_assertions::assert_eq;

    fn definitions() -> RuleDefinitions {
        let mut rule = PackageRule::new("packs/modpack1");
        rule.folders.push(FolderRule {
            name: "config".into(),
            mode: "sync".into(),
            server_path: "cfg".into(),
            ignore: vec!["*.bak".into()],
            delete: Vec::new(),
        });
        let mut definitions = RuleDefinitions::default();
        definitions.packages.insert("modpack1".into(), rule);
        definitions
    }

    #[test]
    fn new_rule_is_dirty_then_clean() {
        let mut defs = definitions();

        let first = check_config_update(&mut defs).unwrap();
        assert_eq!(first.dirty.iter().collect::<Vec<_>>(), vec!["modpack1"]);
        assert!(first.changed);

        let second = check_config_update(&mut defs).unwrap();
        assert!(second.dirty.is_empty());
        assert!(!second.changed);
    }

    #[test]
    fn edit_marks_rule_dirty() {
        let mut defs = definitions();
        check_config_update(&mut defs).unwrap();
        let before = defs.md5["modpack1"].clone();

        defs.packages.get_mut("modpack1").unwrap().folders[0]
            .delete
            .push("a.txt".into());
        let outcome = check_config_update(&mut defs).unwrap();

        assert!(outcome.dirty.contains("modpack1"));
        assert_ne!(defs.md5["modpack1"], before);
    }

    #[test]
    fn removed_and_disabled_rules_lose_fingerprints() {
        let mut defs = definitions();
        defs.packages.insert("other".into(), PackageRule::new("packs/other"));
        check_config_update(&mut defs).unwrap();
        assert_eq!(defs.md5.len(), 2);

        defs.packages.remove("other");
        defs.packages.get_mut("modpack1").unwrap().enable = false;
        let outcome = check_config_update(&mut defs).unwrap();

        assert!(outcome.changed);
        assert!(outcome.dirty.is_empty());
        assert!(defs.md5.is_empty());
    }

    #[test]
    fn fingerprint_depends_on_folder_order() {
        let mut a = PackageRule::new("p");
        for name in ["mods", "config"] {
            a.folders.push(FolderRule {
                name: name.into(),
                mode: String::new(),
                server_path: name.into(),
                ignore: Vec::new(),
                delete: Vec::new(),
            });
        }
        let mut b = a.clone();
        b.folders.reverse();

        assert_ne!(rule_fingerprint(&a).unwrap(), rule_fingerprint(&b).unwrap());
        assert_eq!(rule_fingerprint(&a).unwrap(), rule_fingerprint(&a.clone()).unwrap());
    }
}
