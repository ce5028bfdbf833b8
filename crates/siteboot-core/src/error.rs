use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("not initialized: run 'siteboot init'")]
    NotInitialized,

    #[error("dependency '{name}' unreachable at {addr} after {waited_secs}s")]
    DependencyUnreachable {
        name: String,
        addr: String,
        waited_secs: u64,
    },

    #[error("shared config incomplete after {waited_secs}s: missing keys [{}]", missing.join(", "))]
    ConfigIncomplete {
        missing: Vec<String>,
        waited_secs: u64,
    },

    #[error("shared config at {path} unreadable at deadline: {reason}")]
    ConfigMalformed { path: String, reason: String },

    #[error("failed to provision site '{site}': {reason}")]
    ProvisionFailed { site: String, reason: String },

    #[error("failed to reconcile site '{site}': {reason}")]
    ReconcileFailed { site: String, reason: String },

    #[error("platform CLI '{0}' not found on PATH")]
    CliMissing(String),

    #[error("failed to spawn platform CLI: {0}")]
    CliSpawnFailed(String),

    #[error("invalid site name '{0}': must be a lowercase hostname-like label")]
    InvalidSiteName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
