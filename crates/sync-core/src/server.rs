//! The sync service object
//!
//! [`SyncServer`] owns everything a serving layer needs: the cache engine,
//! the reload task registry and the access controller. It is constructed
//! once, started, handed to request handlers, and shut down explicitly.

use std::sync::{Arc, Mutex, PoisonError};

use sync_access::AccessController;
use sync_fs::NormalizedPath;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::BuildReport;
use crate::config::ServerConfig;
use crate::engine::SyncCacheEngine;
use crate::tasks::{ReloadTasks, TaskStatus};
use crate::{CancelFlag, Error, Result};

#[derive(Debug)]
pub struct SyncServer {
    engine: Arc<SyncCacheEngine>,
    access: Arc<AccessController>,
    tasks: Arc<ReloadTasks>,
    cancel: CancelFlag,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncServer {
    /// Build the engine and access controller described by `config`.
    ///
    /// Relative paths in the configuration resolve against `root`.
    pub fn from_config(config: &ServerConfig, root: &NormalizedPath) -> Result<Self> {
        let engine = SyncCacheEngine::from_config(config, root)?;
        let access = AccessController::new(
            config.call_limit.count,
            config.call_window(),
            config.clear_interval(),
        );
        Ok(Self::new(engine, access))
    }

    pub fn new(engine: SyncCacheEngine, access: AccessController) -> Self {
        Self {
            engine: Arc::new(engine),
            access: Arc::new(access),
            tasks: Arc::new(ReloadTasks::new()),
            cancel: CancelFlag::new(),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Run the first rebuild pass.
    ///
    /// # Errors
    ///
    /// A startup failure (missing or corrupt rule definitions, unwritable
    /// snapshot) is returned to the caller, which is expected to exit.
    pub fn start(&self) -> Result<BuildReport> {
        let report = self.engine.check_sync_cache(&self.cancel)?;
        info!(
            "Sync server started with {} packages",
            self.engine.package_names().len()
        );
        Ok(report)
    }

    pub fn engine(&self) -> &SyncCacheEngine {
        &self.engine
    }

    pub fn access(&self) -> &AccessController {
        &self.access
    }

    pub fn tasks(&self) -> &ReloadTasks {
        &self.tasks
    }

    /// Start a background reload named `name` and return its poll token.
    ///
    /// The rebuild runs on tokio's blocking pool; the token is returned
    /// immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::TaskInFlight`] if a reload with this name is still running
    /// - [`Error::NoRuntime`] when called outside a tokio runtime
    /// - [`Error::Cancelled`] after [`SyncServer::shutdown`]
    pub fn spawn_reload(&self, name: &str) -> Result<Uuid> {
        self.cancel.check()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let token = self.tasks.register(name)?;

        let engine = Arc::clone(&self.engine);
        let tasks = Arc::clone(&self.tasks);
        let cancel = self.cancel.clone();
        let handle = runtime.spawn_blocking(move || {
            let succeeded = engine.reload_with(&cancel);
            tasks.complete(token, succeeded);
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(handle);
        debug!("Reload {name} spawned as {token}");
        Ok(token)
    }

    pub fn task_status(&self, token: Uuid) -> Result<TaskStatus> {
        self.tasks.status(token)
    }

    /// Wait for every spawned reload to finish.
    pub async fn join_reloads(&self) {
        let handles = std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Reload task ended abnormally: {e}");
            }
        }
    }

    /// Cancel in-flight reloads and wait for them to stop.
    ///
    /// A cancelled reload never publishes or persists a partial cache.
    pub async fn shutdown(&self) {
        info!("Sync server shutting down");
        self.cancel.cancel();
        self.join_reloads().await;
    }
}
