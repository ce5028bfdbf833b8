//! Idempotent site creation and addon installation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::app_cli::PlatformCli;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::{io, paths};

// ---------------------------------------------------------------------------
// ProvisionReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteCreation {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAddon {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub creation: SiteCreation,
    pub installed_addons: Vec<String>,
    pub failed_addons: Vec<FailedAddon>,
}

impl ProvisionReport {
    /// The site itself is usable either way; partial means at least one
    /// addon install failed and was skipped.
    pub fn is_partial(&self) -> bool {
        !self.failed_addons.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Addon discovery
// ---------------------------------------------------------------------------

/// Enumerate installable addons: the immediate subdirectories of `dir`,
/// minus hidden entries and `exclude`. Sorted lexicographically — directory
/// listing order is not stable across filesystems, and install order must be.
pub fn discover_addons(dir: &Path, exclude: &[String]) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut addons = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || exclude.iter().any(|e| e == &name) {
            continue;
        }
        addons.push(name);
    }
    addons.sort();
    Ok(addons)
}

// ---------------------------------------------------------------------------
// provision
// ---------------------------------------------------------------------------

fn new_site_args(cfg: &BootstrapConfig) -> Vec<String> {
    let site = &cfg.site;
    let mut args = vec!["new-site".to_string(), site.name.clone()];
    if !site.admin_password.is_empty() {
        args.push(format!("--admin-password={}", site.admin_password));
    }
    if !site.db_name.is_empty() {
        args.push(format!("--db-name={}", site.db_name));
    }
    if !site.db_password.is_empty() {
        args.push(format!("--db-password={}", site.db_password));
    }
    if !site.db_root_password.is_empty() {
        args.push(format!("--db-root-password={}", site.db_root_password));
    }
    args
}

/// Create the site if absent, then install every discovered addon.
///
/// Creation is guarded on the site directory: an existing site is never
/// touched, only logged and skipped. Addon installs run even for a
/// pre-existing site (installing an already-present addon is the platform
/// CLI's problem; its failure lands in `failed_addons` like any other).
pub fn provision(
    root: &Path,
    cfg: &BootstrapConfig,
    cli: &dyn PlatformCli,
) -> Result<ProvisionReport> {
    paths::validate_site_name(&cfg.site.name)?;
    let site = cfg.site.name.as_str();

    let creation = if paths::site_dir(root, site).is_dir() {
        tracing::info!(site, "site already exists, skipping creation");
        SiteCreation::AlreadyExists
    } else {
        tracing::info!(site, "creating site");
        let args = new_site_args(cfg);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = cli.run(&arg_refs)?;
        if !output.success {
            return Err(BootstrapError::ProvisionFailed {
                site: site.to_string(),
                reason: output.hint(),
            });
        }
        SiteCreation::Created
    };

    // First site in the deployment becomes the default; never overwritten.
    let marker = paths::default_site_path(root);
    if io::write_if_missing(&marker, site.as_bytes())? {
        tracing::info!(site, "recorded as default site");
    }

    let addons = discover_addons(&root.join(&cfg.addons.dir), &cfg.addons.exclude)?;
    tracing::info!(site, count = addons.len(), "installing addons");

    let mut installed = Vec::new();
    let mut failed = Vec::new();
    for addon in addons {
        match cli.run(&["--site", site, "install-app", &addon]) {
            Ok(output) if output.success => {
                tracing::info!(site, addon = %addon, "addon installed");
                installed.push(addon);
            }
            Ok(output) => {
                tracing::warn!(site, addon = %addon, "addon install failed, skipping");
                failed.push(FailedAddon {
                    name: addon,
                    reason: output.hint(),
                });
            }
            Err(e) => {
                tracing::warn!(site, addon = %addon, error = %e, "addon install errored, skipping");
                failed.push(FailedAddon {
                    name: addon,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(ProvisionReport {
        creation,
        installed_addons: installed,
        failed_addons: failed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
