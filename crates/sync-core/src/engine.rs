//! SyncCacheEngine implementation
//!
//! The engine runs the rebuild pipeline (rule provider, diff tracking,
//! cache building, persistence) and answers conditional package checks
//! for the serving layer.

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard};

use sync_fs::NormalizedPath;
use tracing::{debug, error, info, warn};

use crate::cache::{BuildReport, CacheBuilder, ClientView, Package, SnapshotStore, SyncSnapshot};
use crate::config::{RuleSource, ServerConfig};
use crate::rules::{JsonRuleStore, LocalRuleProvider, RuleDefinitions, RuleProvider, StoreRuleProvider};
use crate::tracker::check_config_update;
use crate::{CancelFlag, Error, Result};

/// Answer to a conditional package check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageResponse {
    /// The client's fingerprint matches; nothing to send
    NotModified,
    /// The client is out of date (or sent no fingerprint)
    Full(ClientView),
}

/// Orchestrates the sync cache.
///
/// Readers take a shared lock on the published snapshot. A rebuild works
/// on a private copy and swaps it in only after it has been persisted, so
/// readers never observe a half-built cache. Rebuilds are serialized.
pub struct SyncCacheEngine {
    provider: Box<dyn RuleProvider>,
    rules_path: NormalizedPath,
    snapshots: SnapshotStore,
    builder: CacheBuilder,
    state: RwLock<SyncSnapshot>,
    rebuild: Mutex<()>,
}

impl std::fmt::Debug for SyncCacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCacheEngine")
            .field("provider", &self.provider.name())
            .field("rules_path", &self.rules_path)
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}

impl SyncCacheEngine {
    /// Create an engine, loading (or bootstrapping) the persisted snapshot.
    ///
    /// # Arguments
    ///
    /// * `provider` - source that refreshes the rule definitions each pass
    /// * `rules_path` - the local rule-definition file
    /// * `snapshots` - where the cache snapshot lives
    /// * `builder` - resolves package base paths and walks folders
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot file cannot be read or created.
    pub fn new(
        provider: Box<dyn RuleProvider>,
        rules_path: impl Into<NormalizedPath>,
        snapshots: SnapshotStore,
        builder: CacheBuilder,
    ) -> Result<Self> {
        let snapshot = snapshots.load_or_bootstrap()?;
        Ok(Self::assemble(provider, rules_path.into(), snapshots, builder, snapshot))
    }

    /// Like [`SyncCacheEngine::new`], but never writes a bootstrap
    /// snapshot. For inspecting a server without changing its files.
    pub fn open(
        provider: Box<dyn RuleProvider>,
        rules_path: impl Into<NormalizedPath>,
        snapshots: SnapshotStore,
        builder: CacheBuilder,
    ) -> Result<Self> {
        let snapshot = snapshots.load()?;
        Ok(Self::assemble(provider, rules_path.into(), snapshots, builder, snapshot))
    }

    fn assemble(
        provider: Box<dyn RuleProvider>,
        rules_path: NormalizedPath,
        snapshots: SnapshotStore,
        builder: CacheBuilder,
        snapshot: SyncSnapshot,
    ) -> Self {
        debug!("Loaded cache snapshot with {} packages", snapshot.packages.len());
        Self {
            provider,
            rules_path,
            snapshots,
            builder,
            state: RwLock::new(snapshot),
            rebuild: Mutex::new(()),
        }
    }

    /// Create an engine from server configuration, resolving relative
    /// paths against `root`.
    pub fn from_config(config: &ServerConfig, root: &NormalizedPath) -> Result<Self> {
        let (provider, rules_path, snapshots, builder) = Self::configured(config, root);
        Self::new(provider, rules_path, snapshots, builder)
    }

    /// Read-only counterpart of [`SyncCacheEngine::from_config`].
    pub fn open_config(config: &ServerConfig, root: &NormalizedPath) -> Result<Self> {
        let (provider, rules_path, snapshots, builder) = Self::configured(config, root);
        Self::open(provider, rules_path, snapshots, builder)
    }

    fn configured(
        config: &ServerConfig,
        root: &NormalizedPath,
    ) -> (Box<dyn RuleProvider>, NormalizedPath, SnapshotStore, CacheBuilder) {
        let sync = &config.sync;
        let provider: Box<dyn RuleProvider> = match sync.source {
            RuleSource::Local => Box::new(LocalRuleProvider),
            RuleSource::Store => Box::new(StoreRuleProvider::new(JsonRuleStore::new(
                ServerConfig::resolve(root, &sync.store_file),
            ))),
        };
        (
            provider,
            ServerConfig::resolve(root, &sync.rules_file),
            SnapshotStore::new(ServerConfig::resolve(root, &sync.cache_file)),
            CacheBuilder::new(ServerConfig::resolve(root, &sync.file_base_path)),
        )
    }

    pub fn rules_path(&self) -> &NormalizedPath {
        &self.rules_path
    }

    pub fn snapshot_path(&self) -> &NormalizedPath {
        self.snapshots.path()
    }

    /// Run the full pipeline once.
    ///
    /// Refreshes the rule definitions from the provider, records rule
    /// fingerprints (writing the definitions back when they changed),
    /// rebuilds stale packages, persists the snapshot and publishes it.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid rule definitions, provider failures,
    /// snapshot write failures, and [`Error::Cancelled`]. On error the
    /// published cache is left untouched.
    pub fn check_sync_cache(&self, cancel: &CancelFlag) -> Result<BuildReport> {
        self.run_pass(cancel, false)
    }

    /// Like [`SyncCacheEngine::check_sync_cache`], but re-walks every
    /// package even when its rule is unchanged. File content edits are only
    /// picked up by a pass like this one or by a rule change.
    pub fn rebuild_all(&self, cancel: &CancelFlag) -> Result<BuildReport> {
        self.run_pass(cancel, true)
    }

    fn run_pass(&self, cancel: &CancelFlag, force: bool) -> Result<BuildReport> {
        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("SyncManager: checking sync files using {} rules", self.provider.name());

        let mut definitions = RuleDefinitions::load(&self.rules_path)?;
        let refreshed = self.provider.refresh(&mut definitions)?;
        let outcome = check_config_update(&mut definitions)?;
        if refreshed || outcome.changed {
            definitions.save(&self.rules_path)?;
            debug!("SyncManager: rule definitions rewritten");
        }

        let mut snapshot = self.read_state().clone();
        self.builder.prepare(&definitions, &mut snapshot, &outcome.dirty);
        if force {
            snapshot.packages.values_mut().for_each(|package| package.init = false);
        }
        let report = self.builder.build(&mut snapshot, cancel)?;

        cancel.check()?;
        self.snapshots.save(&snapshot)?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        debug!("SyncManager: sync file check finish");
        Ok(report)
    }

    /// Re-run the pipeline, reporting failure as `false` instead of an error.
    pub fn reload(&self) -> bool {
        self.reload_with(&CancelFlag::new())
    }

    pub fn reload_with(&self, cancel: &CancelFlag) -> bool {
        match self.check_sync_cache(cancel) {
            Ok(report) => {
                info!("Sync cache reloaded ({} packages rebuilt)", report.built.len());
                true
            }
            Err(e) => {
                error!("Sync cache reload failed: {e}");
                false
            }
        }
    }

    /// Conditional check for `name` against the client's fingerprint.
    ///
    /// # Errors
    ///
    /// - [`Error::PackageNotFound`] for an unknown package
    /// - [`Error::PackageNotReady`] for a package not built yet
    /// - [`Error::ConsistencyMismatch`] when the cached payload no longer
    ///   hashes to the stored fingerprint; a reload is needed
    pub fn check_package(&self, name: &str, local_fingerprint: Option<&str>) -> Result<PackageResponse> {
        let state = self.read_state();
        let package = ready_package(&state, name)?;

        let view = ClientView::project(package);
        let computed = view.fingerprint()?;
        if computed != package.md5 {
            error!("Package {name} failed validation: stored {}, computed {computed}", package.md5);
            return Err(Error::ConsistencyMismatch {
                name: name.to_string(),
                stored: package.md5.clone(),
                computed,
            });
        }

        if local_fingerprint.is_some_and(|local| local.eq_ignore_ascii_case(&package.md5)) {
            debug!("Same fingerprint {} for {name}, sending nothing", package.md5);
            return Ok(PackageResponse::NotModified);
        }
        debug!("Sending package view for {name}");
        Ok(PackageResponse::Full(view))
    }

    /// Names of every cached package.
    pub fn package_names(&self) -> Vec<String> {
        self.read_state().packages.keys().cloned().collect()
    }

    pub fn package(&self, name: &str) -> Option<Package> {
        self.read_state().packages.get(name).cloned()
    }

    /// The current client view of a built package.
    pub fn client_view(&self, name: &str) -> Result<ClientView> {
        let state = self.read_state();
        Ok(ClientView::project(ready_package(&state, name)?))
    }

    /// The resolved base directory of a package.
    pub fn base_path(&self, name: &str) -> Result<NormalizedPath> {
        let state = self.read_state();
        let package = state.packages.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.to_string(),
        })?;
        let base = self
            .builder
            .resolve_base(&package.base_path)
            .ok_or_else(|| Error::InvalidRule {
                name: name.to_string(),
                reason: "no base path".to_string(),
            })?;
        if !base.is_dir() {
            warn!("Base path {base} of package {name} is not a directory");
        }
        Ok(base)
    }

    /// A copy of the published snapshot.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.read_state().clone()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SyncSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ready_package<'a>(state: &'a SyncSnapshot, name: &str) -> Result<&'a Package> {
    let package = state.packages.get(name).ok_or_else(|| Error::PackageNotFound {
        name: name.to_string(),
    })?;
    if !package.init {
        return Err(Error::PackageNotReady {
            name: name.to_string(),
        });
    }
    Ok(package)
}
