//! Tests for merging an external rule store into the local definitions

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use sync_core::{
    CacheBuilder, CancelFlag, JsonRuleStore, MemoryRuleStore, RuleDefinitions, RuleProvider, RuleRecord,
    SnapshotStore, StoreRuleProvider, SyncCacheEngine, rule_fingerprint,
};
use sync_test_utils::server::RULES_FILE;
use sync_test_utils::{RuleBuilder, ServerDir, definitions, folder_record, root_record};

fn modpack_records() -> Vec<RuleRecord> {
    let mut root = RuleRecord::root(1, 10, "modpack1", "packs/modpack1");
    root.sync_files = vec!["manifest.json".into()];
    let mut config = RuleRecord::folder(2, 10, "config", "cfg", "sync");
    config.ignore_file = vec!["*.bak".into()];
    vec![root, config]
}

#[test]
fn store_rules_are_merged_into_definitions() {
    let store = Arc::new(MemoryRuleStore::new(modpack_records()));
    let provider = StoreRuleProvider::new(Arc::clone(&store));
    let mut defs = RuleDefinitions::default();

    assert!(provider.refresh(&mut defs).unwrap());

    let rule = &defs.packages["modpack1"];
    assert_eq!(rule.base_path, "packs/modpack1");
    assert_eq!(rule.files, vec!["manifest.json"]);
    assert_eq!(rule.folders[0].name, "config");
    assert_eq!(rule.folders[0].ignore, vec!["*.bak"]);

    let recorded = store.records()[0].md5.clone().unwrap();
    assert_eq!(recorded, rule_fingerprint(rule).unwrap());

    assert!(!provider.refresh(&mut defs).unwrap(), "second refresh changes nothing");
}

#[test]
fn store_wins_over_local_copy() {
    let store = MemoryRuleStore::new(modpack_records());
    let provider = StoreRuleProvider::new(store);
    let mut defs: RuleDefinitions = serde_json::from_value(definitions(&[
        ("modpack1", RuleBuilder::new("elsewhere").build()),
        ("local-only", RuleBuilder::new("packs/local").build()),
    ]))
    .unwrap();

    provider.refresh(&mut defs).unwrap();

    assert_eq!(defs.packages["modpack1"].base_path, "packs/modpack1");
    assert!(defs.packages.contains_key("local-only"));
}

#[test]
fn disabled_or_deleted_store_rules_are_removed_locally() {
    let mut records = modpack_records();
    records[0].enable = false;
    let mut deleted = RuleRecord::root(3, 11, "modpack2", "packs/modpack2");
    deleted.deleted = true;
    records.push(deleted);
    let provider = StoreRuleProvider::new(MemoryRuleStore::new(records));
    let mut defs: RuleDefinitions = serde_json::from_value(definitions(&[
        ("modpack1", RuleBuilder::new("packs/modpack1").build()),
        ("modpack2", RuleBuilder::new("packs/modpack2").build()),
    ]))
    .unwrap();

    assert!(provider.refresh(&mut defs).unwrap());
    assert!(defs.packages.is_empty());
}

#[test]
fn records_without_name_or_client_path_are_skipped() {
    let mut records = modpack_records();
    records[0].config_name = None;
    let provider = StoreRuleProvider::new(MemoryRuleStore::new(records));
    let mut defs = RuleDefinitions::default();

    assert!(!provider.refresh(&mut defs).unwrap());

    let mut records = modpack_records();
    records[1].client_path = Some(String::new());
    let provider = StoreRuleProvider::new(MemoryRuleStore::new(records));
    provider.refresh(&mut defs).unwrap();
    assert!(defs.packages["modpack1"].folders.is_empty());
}

#[test]
fn json_store_drives_full_pipeline() {
    let dir = ServerDir::new();
    dir.write_file("packs/modpack1/cfg/a.txt", "alpha");
    dir.write_file("packs/modpack1/cfg/a.txt.bak", "backup");
    dir.write_file("packs/modpack1/manifest.json", "{}");
    dir.write_rules(&definitions(&[]));
    dir.write_store(&[
        root_record(1, 10, "modpack1", "packs/modpack1", "manifest.json"),
        folder_record(2, 10, "config", "cfg", "*.bak"),
    ]);

    let engine = SyncCacheEngine::new(
        Box::new(StoreRuleProvider::new(JsonRuleStore::new(dir.store_path()))),
        dir.rules_path(),
        SnapshotStore::new(dir.cache_path()),
        CacheBuilder::new(dir.root()),
    )
    .unwrap();
    engine.check_sync_cache(&CancelFlag::new()).unwrap();

    let view = serde_json::to_value(engine.client_view("modpack1").unwrap()).unwrap();
    assert_eq!(view["data"], json!(["config"]));
    assert_eq!(view["config"]["files"].as_object().unwrap().len(), 1);
    assert!(dir.read_json(RULES_FILE)["packages"]["modpack1"].is_object());
    let store = dir.read_json(sync_test_utils::server::STORE_FILE);
    assert_eq!(store[0]["md5"], dir.read_json(RULES_FILE)["md5"]["modpack1"]);
}
