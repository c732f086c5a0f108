//! Package sync cache engine
//!
//! This crate turns package rules into the manifests launcher clients
//! download, implementing:
//!
//! - **Rules**: the local rule-definition file, external rule stores and
//!   the providers that merge them
//! - **Diff tracking**: per-rule fingerprints that flag dirty packages
//! - **Cache building**: folder walks, per-file digests, ignore and
//!   delete policy
//! - **Client views**: the wire payload and its fingerprint
//! - **SyncCacheEngine**: the check/rebuild/persist pipeline and the
//!   conditional read used by the serving layer
//! - **SyncServer**: the service object tying the engine, background
//!   reloads and access control together
//!
//! # Architecture
//!
//! ```text
//!                   sync-cli / serving layer
//!                            |
//!                        sync-core
//!                            |
//!                  +---------+---------+
//!                  |                   |
//!               sync-fs           sync-access
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod rules;
pub mod server;
pub mod tasks;
pub mod tracker;

pub use cache::{
    BuildReport, CacheBuilder, ClientView, FileDigest, Folder, FolderView, Package, SnapshotStore,
    SyncSnapshot,
};
pub use cancel::CancelFlag;
pub use config::{RuleSource, ServerConfig};
pub use engine::{PackageResponse, SyncCacheEngine};
pub use error::{Error, Result};
pub use rules::{
    FolderRule, JsonRuleStore, LocalRuleProvider, MemoryRuleStore, PackageRule, RuleDefinitions,
    RuleProvider, RuleRecord, RuleStore, StoreRuleProvider,
};
pub use server::SyncServer;
pub use tasks::{ReloadTasks, TaskStatus};
pub use tracker::{DiffOutcome, check_config_update, rule_fingerprint};
