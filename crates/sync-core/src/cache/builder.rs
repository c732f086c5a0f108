//! Rebuilds package entries from the filesystem

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use sync_fs::checksum::file_digest;
use sync_fs::{IgnoreSet, NormalizedPath, list_files};
use tracing::{debug, error, info, warn};

use super::{ClientView, FileDigest, Folder, Package, SyncSnapshot};
use crate::rules::RuleDefinitions;
use crate::{CancelFlag, Error, Result};

/// Packages touched by one [`CacheBuilder::build`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Entries rebuilt and now initialized
    pub built: Vec<String>,
    /// Entries that could not be built and stay uninitialized
    pub failed: Vec<String>,
    /// Entries that were already initialized
    pub unchanged: usize,
}

/// Walks package folders and fills in cache entries.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    file_base_path: NormalizedPath,
}

impl CacheBuilder {
    /// * `file_base_path` - directory relative package base paths resolve
    ///   against
    pub fn new(file_base_path: impl Into<NormalizedPath>) -> Self {
        Self {
            file_base_path: file_base_path.into(),
        }
    }

    /// Absolute or `file_base_path`-relative directory of a package, or
    /// `None` when the rule names no base path.
    pub fn resolve_base(&self, base_path: &str) -> Option<NormalizedPath> {
        let trimmed = base_path.trim();
        if trimmed.is_empty() {
            return None;
        }
        let base = NormalizedPath::new(trimmed);
        if base.is_absolute() {
            Some(base)
        } else {
            Some(self.file_base_path.join(base.as_str()))
        }
    }

    /// Reconcile `snapshot` with the rule definitions.
    ///
    /// Entries for removed or disabled rules are dropped. Rules that are
    /// dirty, new to the snapshot, or recorded under a different
    /// fingerprint get a fresh uninitialized entry.
    pub fn prepare(&self, definitions: &RuleDefinitions, snapshot: &mut SyncSnapshot, dirty: &BTreeSet<String>) {
        snapshot.packages.retain(|name, _| {
            let keep = definitions.is_enabled(name);
            if !keep {
                debug!("SyncCache: {name} no longer configured, dropping cache entry");
            }
            keep
        });
        snapshot.md5.retain(|name, _| definitions.is_enabled(name));

        for (name, rule) in definitions.enabled() {
            let recorded = definitions.md5.get(name);
            let reason = if dirty.contains(name) {
                "rule changed"
            } else if !snapshot.packages.contains_key(name) {
                "new package"
            } else if snapshot.md5.get(name) != recorded {
                "fingerprint differs from cache"
            } else {
                continue;
            };
            debug!("SyncCache: remaking {name} ({reason})");
            snapshot.packages.insert(name.clone(), Package::from_rule(rule));
            match recorded {
                Some(md5) => snapshot.md5.insert(name.clone(), md5.clone()),
                None => snapshot.md5.remove(name),
            };
        }
    }

    /// Build every uninitialized entry in `snapshot`.
    ///
    /// A package that fails to build is logged and left uninitialized;
    /// the pass carries on with the rest.
    ///
    /// # Errors
    ///
    /// Only [`Error::Cancelled`], when `cancel` is raised mid-pass.
    pub fn build(&self, snapshot: &mut SyncSnapshot, cancel: &CancelFlag) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        for (name, package) in snapshot.packages.iter_mut() {
            cancel.check()?;
            if package.init {
                report.unchanged += 1;
                continue;
            }
            debug!("SyncCache: package {name} now in process");
            match self.build_package(name, package, cancel) {
                Ok(()) => {
                    debug!("SyncCache: package {name} init finish ({})", package.md5);
                    report.built.push(name.clone());
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    error!("SyncCache: package {name} could not be built: {e}");
                    report.failed.push(name.clone());
                }
            }
        }
        info!(
            "SyncCache: built {}, failed {}, unchanged {}",
            report.built.len(),
            report.failed.len(),
            report.unchanged
        );
        Ok(report)
    }

    fn build_package(&self, name: &str, package: &mut Package, cancel: &CancelFlag) -> Result<()> {
        let base = self.resolve_base(&package.base_path).ok_or_else(|| Error::InvalidRule {
            name: name.to_string(),
            reason: "no base path".to_string(),
        })?;
        debug!("SyncCache: package {name}'s path is {base}");

        for folder in package.folders.iter_mut() {
            folder.files = self.hash_folder(&base, folder, cancel)?;
        }
        package.files = self.hash_root_files(&base, package, cancel)?;

        package.md5 = ClientView::project(package).fingerprint()?;
        package.init = true;
        Ok(())
    }

    fn hash_folder(
        &self,
        base: &NormalizedPath,
        folder: &Folder,
        cancel: &CancelFlag,
    ) -> Result<BTreeMap<String, FileDigest>> {
        let dir = base.join(&folder.server_path);
        let mut files = BTreeMap::new();

        if dir.is_dir() {
            let ignore = IgnoreSet::new(&folder.ignore);
            for relative in list_files(&dir.to_native(), &ignore)? {
                cancel.check()?;
                let path = dir.join(relative.as_str());
                match file_digest(&path.to_native()) {
                    Ok(hash) => {
                        files.insert(relative.as_str().to_string(), FileDigest::Hash(hash));
                    }
                    Err(e) => error!("SyncCache: file {path} could not be read: {e}"),
                }
            }
        } else {
            fs::create_dir_all(dir.to_native()).map_err(|e| sync_fs::Error::io(dir.to_native(), e))?;
            warn!("SyncCache: path {dir} not exist, created it");
        }

        for path in &folder.delete {
            files.insert(manifest_key(path), FileDigest::Delete);
        }
        Ok(files)
    }

    fn hash_root_files(
        &self,
        base: &NormalizedPath,
        package: &Package,
        cancel: &CancelFlag,
    ) -> Result<BTreeMap<String, FileDigest>> {
        let mut files = BTreeMap::new();
        for declared in &package.declared_files {
            cancel.check()?;
            if package.delete.contains(declared) {
                continue;
            }
            let path = base.join(declared);
            if !path.is_file() {
                error!("SyncCache: file {path} not found");
                continue;
            }
            match file_digest(&path.to_native()) {
                Ok(hash) => {
                    files.insert(manifest_key(declared), FileDigest::Hash(hash));
                }
                Err(e) => error!("SyncCache: file {path} could not be read: {e}"),
            }
        }
        for path in &package.delete {
            files.insert(manifest_key(path), FileDigest::Delete);
        }
        Ok(files)
    }
}

/// Forward-slash key for a path a rule names.
fn manifest_key(path: &str) -> String {
    let normalized = NormalizedPath::new(path);
    normalized.as_str().trim_start_matches("./").to_string()
}
