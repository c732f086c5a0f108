//! The package cache: entries, client views, building and persistence

mod builder;
mod model;
mod persistence;
mod view;

pub use builder::{BuildReport, CacheBuilder};
pub use model::{DELETE_SENTINEL, FileDigest, Folder, Package, SNAPSHOT_VERSION, SyncSnapshot};
pub use persistence::SnapshotStore;
pub use view::{ClientView, FolderView};
