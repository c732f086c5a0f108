//! Durable cache snapshots

use sync_fs::NormalizedPath;
use tracing::{debug, warn};

use super::{SNAPSHOT_VERSION, SyncSnapshot};
use crate::Result;

/// Loads and saves the [`SyncSnapshot`] file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: NormalizedPath,
}

impl SnapshotStore {
    pub fn new(path: impl Into<NormalizedPath>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Load the snapshot, writing an empty one when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if the
    /// bootstrap snapshot cannot be written.
    pub fn load_or_bootstrap(&self) -> Result<SyncSnapshot> {
        if !self.path.exists() {
            debug!("No cache snapshot at {}, bootstrapping an empty one", self.path);
            let snapshot = SyncSnapshot::default();
            self.save(&snapshot)?;
            return Ok(snapshot);
        }
        self.load()
    }

    /// Load the snapshot without touching the disk; a missing file reads
    /// as an empty snapshot.
    ///
    /// The snapshot is derived data: a corrupt file or one written in an
    /// older layout is discarded with a warning and every package is
    /// rebuilt on the next pass.
    pub fn load(&self) -> Result<SyncSnapshot> {
        if !self.path.exists() {
            debug!("No cache snapshot at {}", self.path);
            return Ok(SyncSnapshot::default());
        }

        let content = sync_fs::io::read_text(&self.path)?;
        match serde_json::from_str::<SyncSnapshot>(&content) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Ok(snapshot),
            Ok(snapshot) => {
                warn!(
                    "Cache snapshot {} has version {}, expected {SNAPSHOT_VERSION}; discarding it",
                    self.path, snapshot.version
                );
                Ok(SyncSnapshot::default())
            }
            Err(e) => {
                warn!("Cache snapshot {} is corrupt ({e}); discarding it", self.path);
                Ok(SyncSnapshot::default())
            }
        }
    }

    /// Write `snapshot` as pretty JSON via temp-file-then-rename.
    pub fn save(&self, snapshot: &SyncSnapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        sync_fs::io::write_text(&self.path, &content)?;
        debug!("Saved cache snapshot to {}", self.path);
        Ok(())
    }
}
