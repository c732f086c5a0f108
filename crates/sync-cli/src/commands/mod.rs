//! Command implementations for sync-cli

pub mod check;
pub mod config;
pub mod packages;

pub use check::run_check;
pub use config::run_config;
pub use packages::{run_list, run_query, run_show};
