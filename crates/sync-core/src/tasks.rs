//! Pollable background task tokens

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// What a poll reports about a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskStatus {
    pub finished: bool,
    pub failed: bool,
}

#[derive(Debug)]
struct TaskEntry {
    name: String,
    status: TaskStatus,
}

/// Registry of named background tasks.
///
/// A task's token is a v5 uuid of its name in a namespace drawn fresh for
/// each registry, so the same name maps to the same token for the life of
/// the process. Only one task per name may be in flight.
#[derive(Debug)]
pub struct ReloadTasks {
    namespace: Uuid,
    tasks: Mutex<HashMap<Uuid, TaskEntry>>,
}

impl Default for ReloadTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadTasks {
    pub fn new() -> Self {
        Self {
            namespace: Uuid::new_v4(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn token_for(&self, name: &str) -> Uuid {
        Uuid::new_v5(&self.namespace, name.as_bytes())
    }

    /// Register a new run of `name` and return its token.
    ///
    /// # Errors
    ///
    /// [`Error::TaskInFlight`] with the running task's token when a task
    /// with the same name has not finished yet.
    pub fn register(&self, name: &str) -> Result<Uuid> {
        let token = self.token_for(name);
        let mut tasks = self.lock();
        if let Some(entry) = tasks.get(&token)
            && !entry.status.finished
        {
            return Err(Error::TaskInFlight {
                name: entry.name.clone(),
                token,
            });
        }
        tasks.insert(
            token,
            TaskEntry {
                name: name.to_string(),
                status: TaskStatus::default(),
            },
        );
        debug!("Registered task {name} as {token}");
        Ok(token)
    }

    /// Mark `token` finished.
    pub fn complete(&self, token: Uuid, succeeded: bool) {
        if let Some(entry) = self.lock().get_mut(&token) {
            entry.status = TaskStatus {
                finished: true,
                failed: !succeeded,
            };
            debug!("Task {} finished (failed: {})", entry.name, !succeeded);
        }
    }

    pub fn status(&self, token: Uuid) -> Result<TaskStatus> {
        self.lock()
            .get(&token)
            .map(|entry| entry.status)
            .ok_or(Error::TaskNotFound { token })
    }

    /// Whether any registered task is still running.
    pub fn any_in_flight(&self) -> bool {
        self.lock().values().any(|entry| !entry.status.finished)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_in_flight_is_rejected_with_existing_token() {
        let tasks = ReloadTasks::new();
        let token = tasks.register("sync").unwrap();

        match tasks.register("sync") {
            Err(Error::TaskInFlight { token: existing, .. }) => assert_eq!(existing, token),
            other => panic!("expected TaskInFlight, got {other:?}"),
        }
        assert!(tasks.register("other").is_ok());
    }

    #[test]
    fn finished_task_can_run_again() {
        let tasks = ReloadTasks::new();
        let token = tasks.register("sync").unwrap();
        tasks.complete(token, false);
        assert_eq!(
            tasks.status(token).unwrap(),
            TaskStatus {
                finished: true,
                failed: true
            }
        );

        let again = tasks.register("sync").unwrap();
        assert_eq!(again, token);
        assert_eq!(tasks.status(token).unwrap(), TaskStatus::default());
    }

    #[test]
    fn unknown_token_is_an_error() {
        let tasks = ReloadTasks::new();
        assert!(matches!(
            tasks.status(Uuid::new_v4()),
            Err(Error::TaskNotFound { .. })
        ));
    }

    #[test]
    fn registries_use_distinct_namespaces() {
        assert_ne!(ReloadTasks::new().token_for("sync"), ReloadTasks::new().token_for("sync"));
    }
}
