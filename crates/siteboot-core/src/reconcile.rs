//! Post-provision reconciliation: migrations plus worker restarts.

use crate::app_cli::PlatformCli;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};

// ---------------------------------------------------------------------------
// ServiceController
// ---------------------------------------------------------------------------

/// Narrow seam to the container runtime: restart a named service so it picks
/// up fresh site configuration. The CLI wires this to the compose runtime;
/// tests substitute a recorder.
pub trait ServiceController {
    fn restart(&self, service: &str) -> std::result::Result<(), String>;
}

/// For bootstraps that run without a reachable container runtime (e.g.
/// inside the application container itself, where workers are supervised
/// externally and restart on their own).
pub struct NoopController;

impl ServiceController for NoopController {
    fn restart(&self, service: &str) -> std::result::Result<(), String> {
        tracing::debug!(service, "no service controller, skipping restart");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Run outstanding migrations for the site, then restart dependent workers.
///
/// Safe to re-run on every bootstrap: migrations are idempotent on the
/// platform side, and a restart of an already-fresh worker is harmless.
/// Failure here does not undo provisioning; it surfaces as
/// [`BootstrapError::ReconcileFailed`].
pub fn reconcile(
    cfg: &BootstrapConfig,
    cli: &dyn PlatformCli,
    services: &dyn ServiceController,
) -> Result<()> {
    let site = cfg.site.name.as_str();

    tracing::info!(site, "running migrations");
    let output = cli.run(&["--site", site, "migrate"])?;
    if !output.success {
        return Err(BootstrapError::ReconcileFailed {
            site: site.to_string(),
            reason: format!("migrate failed: {}", output.hint()),
        });
    }

    for worker in &cfg.workers {
        tracing::info!(site, service = %worker, "restarting worker");
        services
            .restart(worker)
            .map_err(|reason| BootstrapError::ReconcileFailed {
                site: site.to_string(),
                reason: format!("restart of '{worker}' failed: {reason}"),
            })?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
