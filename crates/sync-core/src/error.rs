//! Error types for sync-core

use std::path::PathBuf;

use uuid::Uuid;

/// Result type for sync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rule-definition file does not exist
    #[error("Rule definitions not found at {path}")]
    RulesNotFound { path: PathBuf },

    /// A rule failed validation
    #[error("Invalid rule {name}: {reason}")]
    InvalidRule { name: String, reason: String },

    /// A folder uses a name the client payload reserves
    #[error("Package {package} declares reserved folder name '{folder}'")]
    ReservedFolderName { package: String, folder: String },

    /// No cache entry for the requested package
    #[error("Package not found: {name}")]
    PackageNotFound { name: String },

    /// The package exists but has not been built yet
    #[error("Package {name} is not ready")]
    PackageNotReady { name: String },

    /// The stored fingerprint no longer matches the cached payload
    #[error("Package {name} failed validation: stored fingerprint {stored}, computed {computed}")]
    ConsistencyMismatch {
        name: String,
        stored: String,
        computed: String,
    },

    /// A reload with the same name is already running
    #[error("Task {name} is already running as {token}")]
    TaskInFlight { name: String, token: Uuid },

    #[error("Unknown task token: {token}")]
    TaskNotFound { token: Uuid },

    /// The rebuild was cancelled before it could be published
    #[error("Rebuild cancelled")]
    Cancelled,

    /// Background reloads need a tokio runtime
    #[error("No tokio runtime available for background reload")]
    NoRuntime,

    /// The external rule store failed
    #[error("Rule store error: {message}")]
    Store { message: String },

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from sync-fs
    #[error(transparent)]
    Fs(#[from] sync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
