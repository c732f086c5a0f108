//! Shared test utilities for the packsync workspace.
//!
//! Fixtures only speak JSON and the filesystem, so this crate can be a
//! dev-dependency of `sync-core` without depending on it.
//!
//! # Modules
//!
//! - [`rules`]: [`RuleBuilder`] for rule-definition and rule-store JSON
//! - [`server`]: [`ServerDir`], a temporary server root with package trees

pub mod rules;
pub mod server;

pub use rules::{RuleBuilder, definitions, root_record, folder_record};
pub use server::ServerDir;
