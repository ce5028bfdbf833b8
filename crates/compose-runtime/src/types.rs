use serde::Deserialize;
use std::path::PathBuf;

// ─── ServiceHealth ────────────────────────────────────────────────────────

/// Health of a named compose service as reported by the runtime.
///
/// `Unknown` covers both "running without a healthcheck" and "service not
/// listed" — the runtime genuinely does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceHealth {
    Healthy,
    Unhealthy,
    Starting,
    Unknown,
}

impl ServiceHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceHealth::Healthy => "healthy",
            ServiceHealth::Unhealthy => "unhealthy",
            ServiceHealth::Starting => "starting",
            ServiceHealth::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── PsEntry ──────────────────────────────────────────────────────────────

/// One line of `compose ps --format json` output. Only the fields needed for
/// health mapping are kept; the rest of the document is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PsEntry {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Health", default)]
    pub health: String,
}

impl PsEntry {
    pub fn service_health(&self) -> ServiceHealth {
        match self.health.as_str() {
            "healthy" => ServiceHealth::Healthy,
            "unhealthy" => ServiceHealth::Unhealthy,
            "starting" => ServiceHealth::Starting,
            // No healthcheck configured: a running container is unknown,
            // anything else (exited, dead, restarting) is unhealthy.
            "" => {
                if self.state == "running" {
                    ServiceHealth::Unknown
                } else {
                    ServiceHealth::Unhealthy
                }
            }
            _ => ServiceHealth::Unknown,
        }
    }
}

// ─── ExecOutput ───────────────────────────────────────────────────────────

/// Captured result of `exec` inside a running service. The exit code is the
/// caller's success signal; stdout/stderr are log text only.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ─── RuntimeOptions ───────────────────────────────────────────────────────

/// Where and how to run compose commands.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Runtime binary override; when unset, `docker` then `podman` are
    /// looked up on PATH.
    pub binary: Option<String>,
    /// Compose project name (`-p`).
    pub project: Option<String>,
    /// Compose files (`-f`), in order.
    pub files: Vec<PathBuf>,
    /// Working directory for the runtime process.
    pub cwd: Option<PathBuf>,
    /// Extra environment for the runtime process.
    pub env: Vec<(String, String)>,
}

// ─── Tests ────────────────────────────────────────────────────────────────
