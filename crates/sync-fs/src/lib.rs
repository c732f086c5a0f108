//! Filesystem layer for the package sync cache
//!
//! Provides normalized paths, content digests, atomic writes and the
//! ignore-aware directory walk used to build package manifests.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod walk;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{NormalizedPath, validate_relative_path};
pub use walk::{IgnoreSet, list_files};
