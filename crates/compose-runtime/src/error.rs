use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no container runtime found on PATH (tried docker, podman)")]
    NoRuntimeBinary,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn container runtime: {0}")]
    Spawn(String),

    #[error("'{command}' exited with code {code}\nstderr: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to parse runtime output: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
