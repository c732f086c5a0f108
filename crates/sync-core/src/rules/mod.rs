//! Package rules and where they come from
//!
//! The local rule-definition file is the working copy every rebuild pass
//! reads. An external [`RuleStore`] can feed it through a
//! [`StoreRuleProvider`]; otherwise [`LocalRuleProvider`] leaves it as the
//! operator wrote it.

mod definition;
mod provider;
mod record;
mod store;

pub use definition::{FolderRule, PackageRule, RuleDefinitions, RESERVED_FOLDER_NAMES};
pub use provider::{LocalRuleProvider, RuleProvider, StoreRuleProvider};
pub use record::RuleRecord;
pub use store::{JsonRuleStore, MemoryRuleStore, RuleStore};
